//! Common error types for SignGloss

use thiserror::Error;

/// Common result type for SignGloss operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across SignGloss crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
