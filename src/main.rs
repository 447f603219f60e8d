//! Headless operator console for the furnace control core.
//!
//! Loads the furnace table and serial parameters, builds one controller per
//! configured line, optionally applies operator actions from the command
//! line, then runs the polling scheduler and prints display events until
//! Ctrl-C. This binary is the stand-in consumer for a widget front end; all
//! presentation decisions stay on this side of the display bus.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::warn;
use mimalloc::MiMalloc;
use tokio::sync::broadcast::error::RecvError;

use furnace_daq::config::Settings;
use furnace_daq::controller::FurnaceController;
use furnace_daq::display::{DisplayBus, DisplayEvent, StatusLevel};
use furnace_daq::poller::Poller;
use furnace_daq::transport::Transport;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "furnace_daq", version, about = "Multi-furnace temperature control console")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Read every furnace once, print the panels, and exit.
    #[arg(long)]
    oneshot: bool,

    /// Program a setpoint before readout starts, e.g. `--set COM1=37.5`.
    #[arg(long, value_name = "PORT=VALUE")]
    set: Vec<String>,

    /// Switch a heater before readout starts, e.g. `--heater COM1=on`.
    #[arg(long, value_name = "PORT=on|off")]
    heater: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings = Settings::load_from(&cli.config)?;
    let transport = build_transport(&settings)?;

    let registry = Arc::new(furnace_daq::gate::LineRegistry::new());
    let bus = DisplayBus::new(settings.application.broadcast_channel_capacity);
    let controllers: Vec<Arc<FurnaceController>> = settings
        .furnaces
        .iter()
        .map(|entry| {
            Arc::new(FurnaceController::new(
                entry.port.clone(),
                entry.name.clone(),
                entry.mode,
                registry.clone(),
                transport.clone(),
                settings.serial.read_timeout(),
            ))
        })
        .collect();

    apply_operator_actions(&cli, &controllers).await?;

    if cli.oneshot {
        for controller in &controllers {
            let readings = controller.read_selected().await;
            println!("== {} ({})", controller.name(), controller.line());
            for reading in readings {
                println!("{}", reading.display());
            }
        }
        return Ok(());
    }

    let mut events = bus.subscribe();
    let mut poller = Poller::new(controllers, bus.clone(), settings.application.poll_interval);
    poller.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => render(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("display stream lagged, {skipped} events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    poller.stop().await;
    Ok(())
}

#[cfg(feature = "instrument_serial")]
fn build_transport(settings: &Settings) -> anyhow::Result<Arc<dyn Transport>> {
    use furnace_daq::transport::SerialTransport;
    Ok(Arc::new(SerialTransport::new(
        settings.serial.baud_rate,
        settings.serial.settle_delay(),
    )))
}

#[cfg(not(feature = "instrument_serial"))]
fn build_transport(_settings: &Settings) -> anyhow::Result<Arc<dyn Transport>> {
    anyhow::bail!("Serial support not enabled. Rebuild with --features instrument_serial")
}

/// Apply `--set` and `--heater` actions, printing each status line.
async fn apply_operator_actions(
    cli: &Cli,
    controllers: &[Arc<FurnaceController>],
) -> anyhow::Result<()> {
    for spec in &cli.set {
        let (port, value) = spec
            .split_once('=')
            .with_context(|| format!("--set expects PORT=VALUE, got '{spec}'"))?;
        let controller = find_controller(controllers, port)?;
        print_status(controller.name(), &controller.set_temperature(value).await);
    }

    for spec in &cli.heater {
        let (port, state) = spec
            .split_once('=')
            .with_context(|| format!("--heater expects PORT=on|off, got '{spec}'"))?;
        let on = match state.trim().to_ascii_lowercase().as_str() {
            "on" | "1" => true,
            "off" | "0" => false,
            other => anyhow::bail!("--heater state must be on or off, got '{other}'"),
        };
        let controller = find_controller(controllers, port)?;
        print_status(controller.name(), &controller.set_heater(on).await);
    }

    Ok(())
}

fn find_controller<'a>(
    controllers: &'a [Arc<FurnaceController>],
    port: &str,
) -> anyhow::Result<&'a Arc<FurnaceController>> {
    controllers
        .iter()
        .find(|c| c.line() == port.trim())
        .with_context(|| format!("no furnace configured on '{port}'"))
}

fn print_status(device: &str, status: &furnace_daq::display::Status) {
    let tag = match status.level {
        StatusLevel::Ok => "OK",
        StatusLevel::Error => "ERR",
    };
    println!("[{tag}] {device}: {}", status.text);
}

fn render(event: &DisplayEvent) {
    match event {
        DisplayEvent::Panel { device, text, .. } => {
            println!("== {device}");
            for line in text.lines() {
                println!("  {line}");
            }
        }
        DisplayEvent::Status { device, status, .. } => print_status(device, status),
        DisplayEvent::Cycle { text, timestamp } => {
            let local = timestamp.with_timezone(&chrono::Local);
            println!("{} - {text}", local.format("%H:%M:%S"));
        }
    }
}
