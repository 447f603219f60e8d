//! Transport layer for one-shot serial exchanges.
//!
//! A transport performs a complete transaction against a physical line:
//! open, clear residual bytes, write the frame, wait for device turnaround,
//! read the reply (for queries), and close the line again on every exit path.
//! Transports are stateless across calls; exclusivity is the
//! [`gate`](crate::gate) layer's job, not the transport's.
//!
//! All failure paths normalize to [`TransportError`] values. Nothing here
//! panics or leaks a raw error type across the gate boundary.

pub mod mock;
#[cfg(feature = "instrument_serial")]
pub mod serial;

pub use mock::MockTransport;
#[cfg(feature = "instrument_serial")]
pub use serial::SerialTransport;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single transport transaction.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The line could not be opened: absent, busy, or permission denied.
    #[error("Błąd portu: {message}")]
    Open {
        /// Underlying open failure text.
        message: String,
    },

    /// Write or read failed, or the reply timed out, after a successful open.
    #[error("Błąd portu: {message}")]
    Io {
        /// Underlying I/O failure text.
        message: String,
    },
}

/// Outcome of a query transaction: the trimmed reply line, or a transport
/// error as a value.
pub type TransactionResult = Result<String, TransportError>;

/// One bounded request/response exchange with a device.
///
/// Implementations must never leave the line open on an error path and must
/// never return a raw panic or foreign error type; every failure becomes a
/// [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write `frame` on `line` and read the reply, bounded by `timeout`.
    async fn execute(&self, line: &str, frame: &[u8], timeout: Duration) -> TransactionResult;

    /// Write-only transaction for commands the device does not answer
    /// (setpoint and heater writes, beep).
    async fn send(&self, line: &str, frame: &[u8], timeout: Duration)
        -> Result<(), TransportError>;
}
