//! Serial transport for RS-232 furnace lines.
//!
//! Wraps the `serialport` crate and runs the blocking exchange on Tokio's
//! blocking executor. Every transaction opens the line, clears residual
//! buffered bytes, writes, waits a short settle delay for device turnaround,
//! reads to the line terminator (queries only), and closes the line again.
//! Dropping the port handle closes it, so no exit path can leave a line open.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;
use serialport::ClearBuffer;

use super::{TransactionResult, Transport, TransportError};

/// Reply line terminator.
const RESPONSE_DELIMITER: u8 = b'\n';

/// Internal per-read timeout; the overall deadline loop below is the real
/// bound on a transaction.
const PORT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// One-shot serial transport with fixed communication parameters.
#[derive(Clone, Debug)]
pub struct SerialTransport {
    /// Symbol rate for every line (the furnaces all run 9600).
    baud_rate: u32,
    /// Write-to-read settle delay for device turnaround.
    settle: Duration,
}

impl SerialTransport {
    /// Create a transport with the given baud rate and settle delay.
    pub fn new(baud_rate: u32, settle: Duration) -> Self {
        Self { baud_rate, settle }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn execute(&self, line: &str, frame: &[u8], timeout: Duration) -> TransactionResult {
        let line = line.to_string();
        let frame = frame.to_vec();
        let baud_rate = self.baud_rate;
        let settle = self.settle;

        let joined = tokio::task::spawn_blocking(move || {
            exchange(&line, baud_rate, &frame, settle, Some(timeout))
        })
        .await;

        match joined {
            Ok(result) => result.map(|reply| reply.unwrap_or_default()),
            Err(e) => Err(TransportError::Io {
                message: format!("serial I/O task panicked: {e}"),
            }),
        }
    }

    async fn send(
        &self,
        line: &str,
        frame: &[u8],
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        let line = line.to_string();
        let frame = frame.to_vec();
        let baud_rate = self.baud_rate;
        let settle = self.settle;

        let joined =
            tokio::task::spawn_blocking(move || exchange(&line, baud_rate, &frame, settle, None))
                .await;

        match joined {
            Ok(result) => result.map(|_| ()),
            Err(e) => Err(TransportError::Io {
                message: format!("serial I/O task panicked: {e}"),
            }),
        }
    }
}

/// Blocking open-write-settle-read-close exchange.
///
/// `read_timeout` of `None` means a write-only transaction: the port still
/// settles after the write so the device can latch the command before the
/// line closes.
fn exchange(
    line: &str,
    baud_rate: u32,
    frame: &[u8],
    settle: Duration,
    read_timeout: Option<Duration>,
) -> Result<Option<String>, TransportError> {
    let mut port = serialport::new(line, baud_rate)
        .timeout(PORT_READ_TIMEOUT)
        .open()
        .map_err(|e| TransportError::Open {
            message: e.to_string(),
        })?;

    // Residual bytes from an aborted previous exchange would corrupt this one.
    port.clear(ClearBuffer::All).map_err(io_failure)?;

    port.write_all(frame).map_err(io_failure)?;
    port.flush().map_err(io_failure)?;
    debug!(
        "[{line}] sent frame: {}",
        String::from_utf8_lossy(frame).trim()
    );

    std::thread::sleep(settle);

    let Some(timeout) = read_timeout else {
        return Ok(None);
    };

    let mut response = String::new();
    let mut buffer = [0u8; 1];
    let start = Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(TransportError::Io {
                message: format!("serial read timeout after {timeout:?}"),
            });
        }

        match port.read(&mut buffer) {
            Ok(1) => {
                let ch = buffer[0] as char;
                response.push(ch);
                if buffer[0] == RESPONSE_DELIMITER {
                    break;
                }
            }
            Ok(0) => {
                return Err(TransportError::Io {
                    message: "unexpected EOF from serial port".to_string(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                // Port timeout is shorter than the overall deadline.
                continue;
            }
            Err(e) => {
                return Err(TransportError::Io {
                    message: format!("serial read error: {e}"),
                });
            }
            Ok(n) => {
                return Err(TransportError::Io {
                    message: format!("single-byte read returned {n} bytes"),
                });
            }
        }
    }

    let response = response.trim().to_string();
    debug!("[{line}] received reply: {response}");
    Ok(Some(response))
}

fn io_failure(e: std::io::Error) -> TransportError {
    TransportError::Io {
        message: e.to_string(),
    }
}
