//! Common error types for On-Air

use thiserror::Error;

/// Common result type for On-Air operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the shared library
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}
