//! Wire protocol for Fluke calibration furnaces.
//!
//! The controllers speak a small SCPI-style ASCII dialect over RS-232: each
//! request is a fixed command string terminated by CR/LF, each reply is a
//! single text line. This module owns the pure mapping from [`Command`] to a
//! byte frame and the decoding of raw reply text into a [`Reading`].
//!
//! Decoding never infers units from the reply; the unit is attached from the
//! [`Quantity`] that issued the request.

use serde::{Deserialize, Serialize};

use crate::transport::TransportError;

/// A single request understood by the furnace controller.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Query the furnace well temperature.
    ReadFurnaceTemp,
    /// Query the reference thermometer.
    ReadReference,
    /// Query the milliamp measure input.
    ReadMilliamps,
    /// Query the active setpoint.
    ReadSetpoint,
    /// Program a new setpoint in °C.
    WriteSetpoint(f64),
    /// Enable heating output.
    HeaterOn,
    /// Disable heating output.
    HeaterOff,
    /// Audible confirmation signal.
    Beep,
}

impl Command {
    /// Encode the command as the exact byte frame sent on the wire.
    ///
    /// Frames are ASCII and CR/LF terminated. The setpoint write interpolates
    /// the value with two fractional digits, the precision the device accepts.
    pub fn frame(&self) -> Vec<u8> {
        match self {
            Command::ReadFurnaceTemp => b"SOUR:SENS:DATA?\r\n".to_vec(),
            Command::ReadReference => b"MEAS?\r\n".to_vec(),
            Command::ReadMilliamps => b"SENS2:DATA?\r\n".to_vec(),
            Command::ReadSetpoint => b"SOUR:SPO?\r\n".to_vec(),
            Command::WriteSetpoint(value) => format!("SOUR:SPO {value:.2}\r\n").into_bytes(),
            Command::HeaterOn => b"OUTP:STAT 1\r\n".to_vec(),
            Command::HeaterOff => b"OUTP:STAT 0\r\n".to_vec(),
            Command::Beep => b"SYST:BEEP:IMM\r\n".to_vec(),
        }
    }
}

/// A measurable value exposed by a furnace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    /// Furnace well temperature.
    Furnace,
    /// Reference thermometer temperature.
    Reference,
    /// Milliamp measure input.
    Milliamps,
    /// Programmed setpoint.
    Setpoint,
}

impl Quantity {
    /// Display label, as the operator console renders it.
    pub fn label(&self) -> &'static str {
        match self {
            Quantity::Furnace => "Piec",
            Quantity::Reference => "Ref",
            Quantity::Milliamps => "mA",
            Quantity::Setpoint => "Setpoint",
        }
    }

    /// Physical unit attached to numeric readings of this quantity.
    pub fn unit(&self) -> &'static str {
        match self {
            Quantity::Milliamps => "mA",
            _ => "°C",
        }
    }

    /// The read command that queries this quantity.
    pub fn read_command(&self) -> Command {
        match self {
            Quantity::Furnace => Command::ReadFurnaceTemp,
            Quantity::Reference => Command::ReadReference,
            Quantity::Milliamps => Command::ReadMilliamps,
            Quantity::Setpoint => Command::ReadSetpoint,
        }
    }
}

/// One decoded reply, numeric when the device answered with a number.
///
/// `value` is `None` when the reply did not parse or the transaction failed;
/// `raw` always preserves the original text for diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Which quantity was queried.
    pub quantity: Quantity,
    /// Parsed numeric value, if the reply was a finite number.
    pub value: Option<f64>,
    /// Raw reply text (trimmed) or the transport error message.
    pub raw: String,
    /// Unit derived from the issuing command, never from the reply.
    pub unit: String,
}

impl Reading {
    /// Decode a raw reply line into a reading.
    ///
    /// Stateless: decoding the same text twice yields the same reading.
    pub fn decode(quantity: Quantity, raw: &str) -> Self {
        let trimmed = raw.trim();
        let value = trimmed.parse::<f64>().ok().filter(|v| v.is_finite());
        Self {
            quantity,
            value,
            raw: trimmed.to_string(),
            unit: quantity.unit().to_string(),
        }
    }

    /// Build the reading for a failed transaction, preserving the error text.
    pub fn from_error(quantity: Quantity, error: &TransportError) -> Self {
        Self {
            quantity,
            value: None,
            raw: error.to_string(),
            unit: quantity.unit().to_string(),
        }
    }

    /// Render the reading as the operator console displays it.
    ///
    /// Numeric readings format to two decimals with their unit; anything else
    /// surfaces the raw text after the label.
    pub fn display(&self) -> String {
        match self.value {
            Some(value) => format!("{}: {value:.2} {}", self.quantity.label(), self.unit),
            None => format!("{}: {}", self.quantity.label(), self.raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_frames_are_fixed_ascii() {
        assert_eq!(Command::ReadFurnaceTemp.frame(), b"SOUR:SENS:DATA?\r\n");
        assert_eq!(Command::ReadReference.frame(), b"MEAS?\r\n");
        assert_eq!(Command::ReadMilliamps.frame(), b"SENS2:DATA?\r\n");
        assert_eq!(Command::ReadSetpoint.frame(), b"SOUR:SPO?\r\n");
        assert_eq!(Command::Beep.frame(), b"SYST:BEEP:IMM\r\n");
        assert_eq!(Command::HeaterOn.frame(), b"OUTP:STAT 1\r\n");
        assert_eq!(Command::HeaterOff.frame(), b"OUTP:STAT 0\r\n");
    }

    #[test]
    fn setpoint_frame_uses_two_decimals() {
        assert_eq!(
            Command::WriteSetpoint(37.5).frame(),
            b"SOUR:SPO 37.50\r\n".to_vec()
        );
        assert_eq!(
            Command::WriteSetpoint(-5.0).frame(),
            b"SOUR:SPO -5.00\r\n".to_vec()
        );
        assert_eq!(
            Command::WriteSetpoint(125.456).frame(),
            b"SOUR:SPO 125.46\r\n".to_vec()
        );
    }

    #[test]
    fn decode_parses_numeric_reply() {
        let reading = Reading::decode(Quantity::Furnace, "125.40\r\n");
        assert_eq!(reading.value, Some(125.40));
        assert_eq!(reading.raw, "125.40");
        assert_eq!(reading.unit, "°C");
        assert_eq!(reading.display(), "Piec: 125.40 °C");
    }

    #[test]
    fn decode_preserves_unparseable_reply() {
        let reading = Reading::decode(Quantity::Furnace, "ERR");
        assert_eq!(reading.value, None);
        assert_eq!(reading.raw, "ERR");
        assert_eq!(reading.display(), "Piec: ERR");
    }

    #[test]
    fn decode_rejects_non_finite_values() {
        let reading = Reading::decode(Quantity::Reference, "inf");
        assert_eq!(reading.value, None);
        assert_eq!(reading.raw, "inf");
    }

    #[test]
    fn decode_is_idempotent() {
        let first = Reading::decode(Quantity::Milliamps, "  4.00 ");
        let second = Reading::decode(Quantity::Milliamps, "  4.00 ");
        assert_eq!(first, second);
        assert_eq!(first.display(), "mA: 4.00 mA");
    }

    #[test]
    fn transport_error_becomes_displayable_reading() {
        let error = TransportError::Open {
            message: "could not open COM9".to_string(),
        };
        let reading = Reading::from_error(Quantity::Furnace, &error);
        assert_eq!(reading.value, None);
        assert_eq!(reading.display(), "Piec: Błąd portu: could not open COM9");
    }

    #[test]
    fn units_come_from_the_quantity_not_the_reply() {
        let reading = Reading::decode(Quantity::Milliamps, "12.1 °C");
        // Reply text does not parse as a number, unit stays the quantity's.
        assert_eq!(reading.value, None);
        assert_eq!(reading.unit, "mA");
    }
}
