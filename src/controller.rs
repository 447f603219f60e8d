//! Per-device façade over the gate and transport layers.
//!
//! A [`FurnaceController`] owns one device's identity (line, display name),
//! its selected read mode, and its last rendered panel text. Every operation
//! routes through the injected [`LineRegistry`], so operator actions and
//! scheduler polls on the same line can never interleave raw bytes.
//!
//! Failure semantics: operations return renderable values. A transport error
//! becomes display text with an error status level; it is never raised to
//! the caller as a fault.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::display::Status;
use crate::error::{AppResult, FurnaceError};
use crate::gate::LineRegistry;
use crate::protocol::{Command, Quantity, Reading};
use crate::transport::{TransactionResult, Transport};

/// Which quantities a device's panel shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// Furnace well temperature only.
    #[default]
    Furnace,
    /// Reference thermometer only.
    Reference,
    /// Milliamp input only.
    Milliamps,
    /// All three, in the fixed panel order.
    All,
}

impl ReadMode {
    /// Quantities this mode reads, in display order.
    ///
    /// The order for [`ReadMode::All`] is fixed (furnace, reference,
    /// milliamps) so panels and tests are deterministic.
    pub fn quantities(&self) -> &'static [Quantity] {
        match self {
            ReadMode::Furnace => &[Quantity::Furnace],
            ReadMode::Reference => &[Quantity::Reference],
            ReadMode::Milliamps => &[Quantity::Milliamps],
            ReadMode::All => &[Quantity::Furnace, Quantity::Reference, Quantity::Milliamps],
        }
    }
}

/// Controller for a single furnace on an exclusive serial line.
pub struct FurnaceController {
    line: String,
    name: String,
    timeout: Duration,
    mode: Mutex<ReadMode>,
    last_text: Mutex<String>,
    registry: Arc<LineRegistry>,
    transport: Arc<dyn Transport>,
}

impl FurnaceController {
    /// Create a controller for `line`, routing through the shared registry
    /// and transport.
    pub fn new(
        line: impl Into<String>,
        name: impl Into<String>,
        mode: ReadMode,
        registry: Arc<LineRegistry>,
        transport: Arc<dyn Transport>,
        timeout: Duration,
    ) -> Self {
        Self {
            line: line.into(),
            name: name.into(),
            timeout,
            mode: Mutex::new(mode),
            last_text: Mutex::new(String::new()),
            registry,
            transport,
        }
    }

    /// Display name for panels and events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The line identifier this controller transacts on.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Currently selected read mode.
    pub async fn mode(&self) -> ReadMode {
        *self.mode.lock().await
    }

    /// Select the read mode used by subsequent polls.
    pub async fn set_mode(&self, mode: ReadMode) {
        *self.mode.lock().await = mode;
    }

    /// Last rendered panel text.
    pub async fn last_text(&self) -> String {
        self.last_text.lock().await.clone()
    }

    /// One gated query transaction.
    async fn transact(&self, command: &Command) -> TransactionResult {
        let frame = command.frame();
        self.registry
            .with_line(&self.line, || {
                self.transport.execute(&self.line, &frame, self.timeout)
            })
            .await
    }

    /// Write `command` followed by a confirmation beep, back to back under a
    /// single lock acquisition so no other transaction on this line can slip
    /// between them.
    async fn write_with_beep(&self, command: &Command) -> AppResult<()> {
        let lock = self.registry.lock_for(&self.line);
        let _guard = lock.lock().await;
        self.transport
            .send(&self.line, &command.frame(), self.timeout)
            .await?;
        self.transport
            .send(&self.line, &Command::Beep.frame(), self.timeout)
            .await?;
        Ok(())
    }

    /// Read one quantity and decode the reply.
    pub async fn read_one(&self, quantity: Quantity) -> Reading {
        match self.transact(&quantity.read_command()).await {
            Ok(raw) => Reading::decode(quantity, &raw),
            Err(e) => {
                debug!("[{}] read {:?} failed: {e}", self.line, quantity);
                Reading::from_error(quantity, &e)
            }
        }
    }

    /// Read the quantities of the currently selected mode, in fixed order,
    /// and refresh the cached panel text.
    ///
    /// Always returns one reading per quantity, whatever the individual
    /// transaction outcomes.
    pub async fn read_selected(&self) -> Vec<Reading> {
        let mode = self.mode().await;
        let mut readings = Vec::with_capacity(mode.quantities().len());
        for quantity in mode.quantities() {
            readings.push(self.read_one(*quantity).await);
        }

        let text = render_panel(&readings);
        *self.last_text.lock().await = text;
        readings
    }

    /// Read the programmed setpoint and refresh the cached panel text.
    pub async fn read_setpoint(&self) -> Reading {
        let reading = self.read_one(Quantity::Setpoint).await;
        *self.last_text.lock().await = reading.display();
        reading
    }

    /// Validate and program a new setpoint, confirming with a beep.
    ///
    /// Malformed input is rejected here and never reaches the transport.
    pub async fn set_temperature(&self, input: &str) -> Status {
        let value = match parse_setpoint(input) {
            Ok(value) => value,
            Err(e) => return Status::error(format!("{}: {e}", self.line)),
        };

        match self.write_with_beep(&Command::WriteSetpoint(value)).await {
            Ok(()) => Status::ok(format!("SET -> {value:.2} °C")),
            Err(e) => Status::error(e.to_string()),
        }
    }

    /// Switch the heating output on or off, confirming with a beep.
    pub async fn set_heater(&self, on: bool) -> Status {
        let command = if on { Command::HeaterOn } else { Command::HeaterOff };
        match self.write_with_beep(&command).await {
            Ok(()) => Status::ok(if on { "Grzanie ON" } else { "Grzanie OFF" }),
            Err(e) => Status::error(e.to_string()),
        }
    }
}

/// Join readings into one panel text, one line per quantity.
pub fn render_panel(readings: &[Reading]) -> String {
    readings
        .iter()
        .map(Reading::display)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse an operator-supplied setpoint, rejecting anything that is not a
/// finite number.
fn parse_setpoint(input: &str) -> AppResult<f64> {
    let trimmed = input.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FurnaceError::InvalidValue(trimmed.to_string())),
    }
}
