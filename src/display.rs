//! Display hand-off between the control core and the rendering side.
//!
//! Background tasks never mutate UI-owned state directly; they publish
//! [`DisplayEvent`] values over a broadcast channel and the rendering side
//! subscribes and marshals them onto whatever thread it owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Success/failure distinction for status lines (the original console colors
/// these green and red).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLevel {
    /// The operation completed.
    Ok,
    /// The operation failed; the text carries the diagnostic.
    Error,
}

/// Renderable outcome of an operator action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// Human-readable status text.
    pub text: String,
    /// Success or failure.
    pub level: StatusLevel,
}

impl Status {
    /// A successful status line.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: StatusLevel::Ok,
        }
    }

    /// A failed status line.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: StatusLevel::Error,
        }
    }
}

/// One update pushed toward the display layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DisplayEvent {
    /// Replace a device's panel text.
    Panel {
        /// Device display name.
        device: String,
        /// Full panel text (may be multi-line).
        text: String,
        /// When the update was produced.
        timestamp: DateTime<Utc>,
    },
    /// Update a device's status line.
    Status {
        /// Device display name.
        device: String,
        /// Status text and level.
        status: Status,
        /// When the update was produced.
        timestamp: DateTime<Utc>,
    },
    /// Process-wide notice, one per completed poll cycle.
    Cycle {
        /// Notice text.
        text: String,
        /// When the cycle settled.
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast fan-out of display events.
///
/// Cloning shares the underlying channel. Publishing with no subscribers is
/// not an error; a display layer may attach late or not at all.
#[derive(Clone)]
pub struct DisplayBus {
    tx: broadcast::Sender<DisplayEvent>,
}

impl DisplayBus {
    /// Create a bus retaining up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.tx.subscribe()
    }

    /// Publish an event, ignoring the no-subscriber case.
    pub fn publish(&self, event: DisplayEvent) {
        let _ = self.tx.send(event);
    }

    /// Publish a panel replacement for `device`.
    pub fn publish_panel(&self, device: impl Into<String>, text: impl Into<String>) {
        self.publish(DisplayEvent::Panel {
            device: device.into(),
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Publish a status-line update for `device`.
    pub fn publish_status(&self, device: impl Into<String>, status: Status) {
        self.publish(DisplayEvent::Status {
            device: device.into(),
            status,
            timestamp: Utc::now(),
        });
    }

    /// Publish a poll-cycle notice.
    pub fn publish_cycle(&self, text: impl Into<String>) {
        self.publish(DisplayEvent::Cycle {
            text: text.into(),
            timestamp: Utc::now(),
        });
    }
}
