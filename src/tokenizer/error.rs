//! Error types for the tokenizer module

use thiserror::Error;

/// Result type for tokenizer operations
pub type TokenizerResult<T> = Result<T, TokenizerError>;

/// Errors that can occur while loading or running a tokenizer
#[derive(Error, Debug)]
pub enum TokenizerError {
    /// Error from tokenizer library
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    /// Model identifier could not be resolved to an encoding
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// Failed to acquire lock on a shared tokenizer
    #[error("Failed to acquire lock on tokenizer")]
    LockError,
}
