//! Diagnostic events for cluster reconciliation.
//!
//! Reconciliation steps report noteworthy conditions (duplicate config keys,
//! failed status writes, API errors) as [`DiagnosticEvent`]s. Delivery is
//! fire-and-forget: an [`EventSink`] never reports failure back to the
//! emitter.
//!
//! # Example
//!
//! ```ignore
//! use cairn_events::{DiagnosticEvent, EventSink, ObjectRef, Reason, RecordingEventSink};
//!
//! let sink = RecordingEventSink::new();
//! let cluster = ObjectRef::new("OpenSearchCluster", "search", "logs");
//! sink.emit(DiagnosticEvent::warning(cluster, Reason::ConfigDuplicateKey, "dup"));
//! assert_eq!(sink.len(), 1);
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod event;
pub mod sink;

pub use error::{Error, Result};
pub use event::{DiagnosticEvent, EventId, ObjectRef, Reason, Severity};
pub use sink::{
    BroadcastEventSink, EventSink, EventSubscription, FanoutEventSink, RecordingEventSink,
    TracingEventSink,
};
