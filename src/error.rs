//! Global error handling for extractfs
//!
//! Only configuration problems and failures while writing the artifact are
//! fatal. Everything that goes wrong with a single file is absorbed into the
//! extraction result as a warning or a skip reason and never reaches this type.

use std::io;
use thiserror::Error;

/// Global error type for extractfs operations
#[derive(Error, Debug)]
pub enum ExtractError {
    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The scan root is missing or not a directory
    #[error("'{0}' is not a valid directory")]
    InvalidRoot(String),

    /// An include, exclude or skip pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// Settings file could not be read or written
    #[error("Settings error: {0}")]
    Settings(String),

    /// JSON processing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writer errors
    #[error("Writer error: {0}")]
    Write(String),

    /// The caller asked the run to stop between two files
    #[error("Extraction cancelled")]
    Cancelled,
}

/// Specialized Result type for extractfs operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Creates an ExtractError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::ExtractError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}

/// Extension trait for adding context to errors
pub trait ResultExt<T, E> {
    /// Wrap the error as a writer error prefixed with `f()`
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E: std::error::Error + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        self.map_err(|e| {
            let context = f();
            ExtractError::Write(format!("{}: {}", context, e))
        })
    }
}

// Lets `main` and the tests return io::Result and still use `?` on engine calls
impl From<ExtractError> for io::Error {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}
