//! Core library for the furnace_daq application.
//!
//! This library contains the transaction layer, protocol codec, and polling
//! scheduler for operating Fluke calibration furnaces over exclusive serial
//! lines. The display layer is an external consumer: it calls the
//! controllers and subscribes to the display bus, and owns all presentation.

pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod gate;
pub mod poller;
pub mod protocol;
pub mod transport;
