//! Subscription types for sensor updates.

use crate::types::{Payload, WatchId};
use serde::{Deserialize, Serialize};

/// Callback invoked with every payload for a watch.
pub type WatchCallback = Box<dyn FnMut(&Payload) + Send + 'static>;

/// Events delivered to channel subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchEvent {
    /// A new sensor sample.
    Sample { payload: Payload },

    /// The subscription was dropped; no further events follow.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Receiver was dropped.
    Disconnected,
    /// Explicitly cleared with `clear_watch`.
    Unsubscribed,
    /// All watches were cleared by `stop_observing`.
    Stopped,
}

/// Handle to a channel subscription.
pub struct WatchHandle {
    pub id: WatchId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<WatchEvent>,
}

impl WatchHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<WatchEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<WatchEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<WatchEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Result of fanning out one payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Subscribers that received the payload.
    pub delivered: usize,
    /// Subscribers removed because they could not receive it.
    pub dropped: Vec<WatchId>,
}
