use std::fmt;

/// Structural misuse of the composite types
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// matrix product of (rows, cols) by (rows, cols) with cols != rows
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// only 1x3 and 3x1 matrices convert to a 3-D point
    NotAVector { shape: (usize, usize) },
    /// expression used where a Variable node is required
    NotAVariable(String),
    NotSquare { shape: (usize, usize) },
    /// determinant simplifies to the constant 0
    SingularMatrix,
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExprError::ShapeMismatch { left, right } => write!(
                f,
                "Trying to multiply matrices of invalid sizes: {}x{} by {}x{}",
                left.0, left.1, right.0, right.1
            ),
            ExprError::NotAVector { shape } => write!(
                f,
                "Trying to convert a {}x{} matrix to a 3D point",
                shape.0, shape.1
            ),
            ExprError::NotAVariable(expr) => write!(f, "Expected a Variable, got {}", expr),
            ExprError::NotSquare { shape } => {
                write!(f, "Matrix must be square, got {}x{}", shape.0, shape.1)
            }
            ExprError::SingularMatrix => write!(f, "Matrix is singular"),
        }
    }
}

impl std::error::Error for ExprError {}
