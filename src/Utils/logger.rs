use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

/// Level filter for a textual log level; `None` means logging is switched off.
/// No level given means "info".
///
/// # Panics
/// Panics on an unknown level name.
pub fn parse_loglevel(loglevel: Option<&str>) -> Option<LevelFilter> {
    match loglevel {
        None => Some(LevelFilter::Info),
        Some("off") | Some("none") => None,
        Some("debug") => Some(LevelFilter::Debug),
        Some("info") => Some(LevelFilter::Info),
        Some("warn") => Some(LevelFilter::Warn),
        Some("error") => Some(LevelFilter::Error),
        Some(other) => panic!("loglevel must be debug, info, warn, error, off or none, got {}", other),
    }
}

/// Installs a terminal logger with the given level.
/// Returns false when logging is switched off or a logger is already installed.
pub fn init_logger(loglevel: Option<&str>) -> bool {
    let Some(level) = parse_loglevel(loglevel) else {
        return false;
    };
    CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])
    .is_ok()
}
