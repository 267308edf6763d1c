//! Error types for the events crate.

use thiserror::Error;

/// Result type alias for event operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors observed by event subscribers.
///
/// Emitters never see these; sinks swallow their own delivery failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The sending side of a subscription was dropped.
    #[error("event channel closed")]
    ChannelClosed,

    /// The subscriber fell behind and events were discarded.
    #[error("subscriber lagged, {skipped} events skipped")]
    Lagged { skipped: u64 },

    /// No event was ready on a non-blocking receive.
    #[error("no event available")]
    Empty,
}
