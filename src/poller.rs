//! Concurrent polling scheduler.
//!
//! A cancellable background task reads every registered controller once per
//! cycle. Reads fan out concurrently (one task per device), each device's
//! panel publishes as soon as its readings settle, and the loop sleeps for
//! whatever remains of the interval so fast cycles do not drift and slow
//! cycles do not compound delay.
//!
//! Cancellation is observed at cycle boundaries only: a cycle in flight when
//! stop is requested finishes and publishes, then the loop exits. Start and
//! stop are idempotent, so rapid toggling from the interface cannot spawn a
//! second loop or wedge on a missing one.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::controller::FurnaceController;
use crate::display::DisplayBus;
use crate::protocol::Reading;

/// Notice published after each poll cycle, as the original console logs it.
pub const CYCLE_NOTICE: &str = "Pobrano dane ze wszystkich portów.";

/// Background polling scheduler over a fixed set of controllers.
///
/// At most one loop runs at a time. The owner toggles it with
/// [`start`](Poller::start) and [`stop`](Poller::stop).
pub struct Poller {
    controllers: Vec<Arc<FurnaceController>>,
    bus: DisplayBus,
    interval: Duration,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Poller {
    /// Create a stopped scheduler polling `controllers` every `interval`.
    pub fn new(
        controllers: Vec<Arc<FurnaceController>>,
        bus: DisplayBus,
        interval: Duration,
    ) -> Self {
        Self {
            controllers,
            bus,
            interval,
            task: None,
            shutdown_tx: None,
        }
    }

    /// Whether the polling loop is currently active.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the polling loop. No-op if it is already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(poll_loop(
            self.controllers.clone(),
            self.bus.clone(),
            self.interval,
            shutdown_rx,
        ));
        self.task = Some(task);
        self.shutdown_tx = Some(shutdown_tx);
        info!("continuous readout started ({:?} interval)", self.interval);
    }

    /// Request cancellation and join the loop. No-op if already stopped.
    ///
    /// A cycle in flight finishes and publishes before the loop exits; this
    /// method returns once it has.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Err(e) = task.await {
            warn!("poll loop join failed: {e}");
        }
        info!("continuous readout stopped");
    }
}

async fn poll_loop(
    controllers: Vec<Arc<FurnaceController>>,
    bus: DisplayBus,
    interval: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        let cycle_start = Instant::now();

        // One read task per device; each publishes its own panel as soon as
        // its readings settle, not batched at the end of the round.
        let reads: Vec<_> = controllers
            .iter()
            .cloned()
            .map(|controller| {
                let bus = bus.clone();
                tokio::spawn(async move {
                    let readings = controller.read_selected().await;
                    let text = readings
                        .iter()
                        .map(Reading::display)
                        .collect::<Vec<_>>()
                        .join("\n");
                    bus.publish_panel(controller.name(), text);
                })
            })
            .collect();

        // Wait for the round, bounded by the interval. Stragglers are
        // superseded by the next cycle boundary but keep running to
        // completion and still publish; dropping a JoinHandle does not
        // cancel its task.
        let settled = tokio::time::timeout(interval, join_all(reads)).await.is_ok();
        if !settled {
            warn!("poll cycle exceeded the {interval:?} interval; slow reads still publishing");
        }
        bus.publish_cycle(CYCLE_NOTICE);

        if shutdown_requested(&mut shutdown_rx) {
            break;
        }

        // A slow round starts the next cycle immediately; a fast one waits
        // out the remainder so cycle starts stay on the interval grid.
        let remaining = interval.saturating_sub(cycle_start.elapsed());
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = tokio::time::sleep(remaining) => {}
        }
    }
}

fn shutdown_requested(shutdown_rx: &mut oneshot::Receiver<()>) -> bool {
    match shutdown_rx.try_recv() {
        Ok(()) => true,
        Err(oneshot::error::TryRecvError::Closed) => true,
        Err(oneshot::error::TryRecvError::Empty) => false,
    }
}
