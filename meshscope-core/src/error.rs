//! Error types for meshscope

use thiserror::Error;

/// Main error type for meshscope operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A caller broke a documented precondition (programmer error).
    #[error("precondition failed: `{condition}` ({detail})\n  at {file} line {line}")]
    Precondition {
        condition: &'static str,
        detail: String,
        file: &'static str,
        line: u32,
    },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Whether this error reports a broken precondition
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Precondition { .. })
    }
}

/// Result type alias for meshscope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Return a [`Error::Precondition`] from the enclosing function unless `cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr) => {
        $crate::ensure!($cond, "condition was false")
    };
    ($cond:expr, $($fmt:tt)+) => {
        if !($cond) {
            return Err($crate::Error::Precondition {
                condition: stringify!($cond),
                detail: format!($($fmt)+),
                file: file!(),
                line: line!(),
            });
        }
    };
}

/// Return a [`Error::Precondition`] from the enclosing function unless `left == right`.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left != *right {
                    return Err($crate::Error::Precondition {
                        condition: concat!(stringify!($left), " == ", stringify!($right)),
                        detail: format!("{:?} != {:?}", left, right),
                        file: file!(),
                        line: line!(),
                    });
                }
            }
        }
    };
}
