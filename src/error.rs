//! Custom error types for the application.
//!
//! [`FurnaceError`] covers the paths where a failure should stop the caller:
//! configuration loading and operator-input validation. Runtime transaction
//! failures deliberately do not travel this way; they are normalized to
//! [`TransportError`](crate::transport::TransportError) values and rendered
//! as display text, so no fault can tear down the polling loop or the
//! process.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, FurnaceError>;

/// Application-level error.
#[derive(Error, Debug)]
pub enum FurnaceError {
    /// Configuration file or environment override failed to load or validate.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A transport transaction failed.
    #[error(transparent)]
    Transport(#[from] crate::transport::TransportError),

    /// Operator-supplied value rejected before any transmission attempt.
    #[error("nieprawidłowa wartość: '{0}'")]
    InvalidValue(String),
}
