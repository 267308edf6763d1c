//! Event sinks.
//!
//! All sinks are fire-and-forget: `emit` cannot fail and never blocks on a
//! slow consumer.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::event::{DiagnosticEvent, Reason, Severity};

/// Destination for diagnostic events.
pub trait EventSink: Send + Sync {
    /// Emit an event. Delivery failures are the sink's own concern.
    fn emit(&self, event: DiagnosticEvent);
}

/// In-memory sink that keeps every emitted event.
///
/// Used by tests and by dry runs that print what would have been reported.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingEventSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty recording sink wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of all recorded events, in emission order.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events with the given reason.
    pub fn count_reason(&self, reason: Reason) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.reason == reason)
            .count()
    }

    /// Total number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drain all recorded events.
    pub fn take(&self) -> Vec<DiagnosticEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: DiagnosticEvent) {
        self.events.lock().push(event);
    }
}

/// Sink that writes events into the tracing stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: DiagnosticEvent) {
        match event.severity {
            Severity::Warning => warn!(
                involved = %event.involved,
                reason = %event.reason,
                event_id = %event.event_id,
                "{}",
                event.message
            ),
            Severity::Normal => info!(
                involved = %event.involved,
                reason = %event.reason,
                event_id = %event.event_id,
                "{}",
                event.message
            ),
        }
    }
}

/// Subscription handle for a [`BroadcastEventSink`].
pub struct EventSubscription {
    receiver: broadcast::Receiver<DiagnosticEvent>,
}

impl EventSubscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> Result<DiagnosticEvent> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting.
    pub fn try_recv(&mut self) -> Result<DiagnosticEvent> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => Error::Empty,
            broadcast::error::TryRecvError::Closed => Error::ChannelClosed,
            broadcast::error::TryRecvError::Lagged(skipped) => Error::Lagged { skipped },
        })
    }
}

fn map_recv_error(err: broadcast::error::RecvError) -> Error {
    match err {
        broadcast::error::RecvError::Closed => Error::ChannelClosed,
        broadcast::error::RecvError::Lagged(skipped) => Error::Lagged { skipped },
    }
}

/// Sink that fans events out to any number of async subscribers.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<DiagnosticEvent>,
}

impl BroadcastEventSink {
    /// Create a broadcast sink buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all events emitted from now on.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: DiagnosticEvent) {
        let reason = event.reason;
        // send only fails when nobody is subscribed
        if self.sender.send(event).is_err() {
            debug!(reason = %reason, "Dropping event, no subscribers");
        }
    }
}

/// Sink that forwards every event to several inner sinks.
#[derive(Default)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    /// Create an empty fan-out sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a downstream sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: DiagnosticEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ObjectRef;

    fn event(reason: Reason) -> DiagnosticEvent {
        DiagnosticEvent::warning(
            ObjectRef::new("OpenSearchCluster", "search", "logs"),
            reason,
            "test",
        )
    }

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingEventSink::new();
        sink.emit(event(Reason::ApiError));
        sink.emit(event(Reason::ConfigDuplicateKey));

        let reasons: Vec<Reason> = sink.events().iter().map(|e| e.reason).collect();
        assert_eq!(reasons, vec![Reason::ApiError, Reason::ConfigDuplicateKey]);
        assert_eq!(sink.count_reason(Reason::ApiError), 1);
    }

    #[test]
    fn test_recording_sink_take_drains() {
        let sink = RecordingEventSink::new();
        sink.emit(event(Reason::PasswordError));
        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let sink = BroadcastEventSink::default();
        sink.emit(event(Reason::Pending));
        assert_eq!(sink.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscriber() {
        let sink = BroadcastEventSink::new(16);
        let mut sub = sink.subscribe();

        sink.emit(event(Reason::StatusUpdateError));

        let received = sub.recv().await;
        assert_eq!(
            received.map(|e| e.reason),
            Ok(Reason::StatusUpdateError)
        );
    }

    #[test]
    fn test_try_recv_empty() {
        let sink = BroadcastEventSink::new(4);
        let mut sub = sink.subscribe();
        assert_eq!(sub.try_recv().map(|e| e.reason), Err(Error::Empty));
    }

    #[test]
    fn test_fanout_forwards_to_all() {
        let a = RecordingEventSink::new_arc();
        let b = RecordingEventSink::new_arc();
        let fanout = FanoutEventSink::new()
            .with_sink(a.clone())
            .with_sink(b.clone());

        fanout.emit(event(Reason::RefMismatch));

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }
}
