//! Bridge status notifications.
//!
//! The orchestrator emits a [`BridgeEvent`] on every status change. Delivery
//! is fire-and-forget: a slow or absent consumer must never hold up a
//! monitor.

use crate::types::BridgeEvent;
use std::fmt;
use tokio::sync::broadcast;

/// Receives status-change events from the orchestrator.
pub trait NotificationSink: fmt::Debug + Send + Sync {
    /// Publishes an event, best-effort.
    fn publish(&self, event: &BridgeEvent);
}

/// Fans events out to any number of broadcast subscribers.
///
/// Lagging subscribers lose the oldest events rather than applying
/// backpressure.
#[derive(Debug)]
pub struct BroadcastSink {
    tx: broadcast::Sender<BridgeEvent>,
}

impl BroadcastSink {
    /// Creates a sink retaining up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl NotificationSink for BroadcastSink {
    fn publish(&self, event: &BridgeEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(event.clone());
    }
}

/// Records published events for inspection.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    events: std::sync::Mutex<Vec<BridgeEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl NotificationSink for RecordingSink {
    fn publish(&self, event: &BridgeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
