//! Error types for the reconciler crate.
//!
//! Every variant carries the component it concerns and the operation that
//! was attempted so the outer loop can attribute failures.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for status store backends.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Reconciler error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Persisting the cluster status failed. Never retried here.
    #[error("status update '{operation}' for component '{component}' of cluster '{cluster}' failed: {reason}")]
    StatusUpdate {
        cluster: String,
        component: String,
        operation: String,
        reason: String,
    },

    /// A node pool was addressed that the pass context was not built with.
    #[error("node pool '{component}' is not registered in this pass (operation: {operation})")]
    UnregisteredNodePool { component: String, operation: String },

    /// A component step failed.
    #[error("component '{component}' failed during {operation}: {reason}")]
    ComponentFailed {
        component: String,
        operation: String,
        reason: String,
    },

    /// Invalid reconciler configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a status update error.
    pub fn status_update(
        cluster: impl Into<String>,
        component: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::StatusUpdate {
            cluster: cluster.into(),
            component: component.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an unregistered node pool error.
    pub fn unregistered_node_pool(
        component: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::UnregisteredNodePool {
            component: component.into(),
            operation: operation.into(),
        }
    }

    /// Create a component failed error.
    pub fn component_failed(
        component: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ComponentFailed {
            component: component.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this is a status persistence failure.
    pub fn is_status_update(&self) -> bool {
        matches!(self, Self::StatusUpdate { .. })
    }

    /// Component the error is attributed to, if any.
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::StatusUpdate { component, .. }
            | Self::UnregisteredNodePool { component, .. }
            | Self::ComponentFailed { component, .. } => Some(component),
            Self::InvalidConfig { .. } => None,
        }
    }
}

/// Failures reported by a [`StatusStore`](crate::status::StatusStore) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The stored object changed underneath the write.
    #[error("conflict writing status of '{key}': {reason}")]
    Conflict { key: String, reason: String },

    /// The backend could not be read or written.
    #[error("status backend failure: {reason}")]
    Backend { reason: String },
}

impl StoreError {
    /// Create a conflict error.
    pub fn conflict(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_update_display() {
        let err = Error::status_update("search/logs", "data", "upsert_component", "conflict");
        let msg = err.to_string();
        assert!(msg.contains("search/logs"));
        assert!(msg.contains("data"));
        assert!(msg.contains("upsert_component"));
        assert!(err.is_status_update());
    }

    #[test]
    fn test_unregistered_pool_is_distinct_from_status_error() {
        let err = Error::unregistered_node_pool("ingest", "replace");
        assert!(!err.is_status_update());
        assert_eq!(err.component(), Some("ingest"));
        assert!(err.to_string().contains("replace"));
    }

    #[test]
    fn test_invalid_config_has_no_component() {
        assert_eq!(Error::invalid_config("no store").component(), None);
    }
}
