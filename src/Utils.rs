//! different utility modules used throughout the project
/// logger set up from a textual log level
pub mod logger;
