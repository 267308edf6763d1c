//! Result alias and logging combinators.

use crate::error::Error;

/// The standard Result type for cairn core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for results that should be logged rather than propagated.
///
/// Used where a failure only degrades behavior, e.g. an unreadable optional
/// config file falling back to defaults.
pub trait ResultExt<T> {
    /// Convert a Result to an Option, logging the error if present.
    fn into_option_logged(self) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn into_option_logged(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Operation failed");
                None
            }
        }
    }
}
