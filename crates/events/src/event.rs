//! Diagnostic event types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Ulid);

impl EventId {
    /// Create a new random event ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event severity, mirroring the two event types a cluster API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Normal,
    Warning,
}

impl Severity {
    /// Wire name of the severity.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reason attached to every diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    /// The managed cluster is not reachable or not ready yet.
    #[serde(rename = "OpensearchPending")]
    Pending,
    /// Generic failure while reconciling the managed cluster.
    #[serde(rename = "OpensearchError")]
    ClusterError,
    /// The managed cluster's admin API rejected a request.
    #[serde(rename = "OpensearchAPIError")]
    ApiError,
    /// A resource references a cluster other than the one it belongs to.
    #[serde(rename = "OpensearchRefMismatch")]
    RefMismatch,
    /// A resource was applied through the admin API.
    #[serde(rename = "OpensearchAPIUpdated")]
    ApiUpdated,
    /// Credentials could not be resolved.
    #[serde(rename = "PasswordError")]
    PasswordError,
    /// Writing the cluster status failed.
    #[serde(rename = "StatusUpdateError")]
    StatusUpdateError,
    /// A configuration key was contributed twice in one pass.
    #[serde(rename = "ConfigDuplicateKey")]
    ConfigDuplicateKey,
}

impl Reason {
    /// Wire name of the reason code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "OpensearchPending",
            Self::ClusterError => "OpensearchError",
            Self::ApiError => "OpensearchAPIError",
            Self::RefMismatch => "OpensearchRefMismatch",
            Self::ApiUpdated => "OpensearchAPIUpdated",
            Self::PasswordError => "PasswordError",
            Self::StatusUpdateError => "StatusUpdateError",
            Self::ConfigDuplicateKey => "ConfigDuplicateKey",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the object an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// A single diagnostic signal emitted during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub involved: ObjectRef,
    pub severity: Severity,
    pub reason: Reason,
    pub message: String,
}

impl DiagnosticEvent {
    /// Create a new event stamped with the current time.
    pub fn new(
        involved: ObjectRef,
        severity: Severity,
        reason: Reason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            involved,
            severity,
            reason,
            message: message.into(),
        }
    }

    /// Create a `Warning` event.
    pub fn warning(involved: ObjectRef, reason: Reason, message: impl Into<String>) -> Self {
        Self::new(involved, Severity::Warning, reason, message)
    }

    /// Create a `Normal` event.
    pub fn normal(involved: ObjectRef, reason: Reason, message: impl Into<String>) -> Self {
        Self::new(involved, Severity::Normal, reason, message)
    }

    /// Check whether this is a warning.
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> ObjectRef {
        ObjectRef::new("OpenSearchCluster", "search", "logs")
    }

    #[test]
    fn test_reason_wire_names() {
        assert_eq!(Reason::ApiError.as_str(), "OpensearchAPIError");
        assert_eq!(Reason::StatusUpdateError.to_string(), "StatusUpdateError");
        assert_eq!(Reason::ConfigDuplicateKey.as_str(), "ConfigDuplicateKey");
    }

    #[test]
    fn test_reason_serializes_to_wire_name() {
        let json = serde_json::to_string(&Reason::RefMismatch);
        assert_eq!(json.ok().as_deref(), Some("\"OpensearchRefMismatch\""));
    }

    #[test]
    fn test_warning_constructor() {
        let event = DiagnosticEvent::warning(cluster(), Reason::PasswordError, "no secret");
        assert!(event.is_warning());
        assert_eq!(event.message, "no secret");
        assert_eq!(event.involved.to_string(), "OpenSearchCluster/search/logs");
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = DiagnosticEvent::normal(cluster(), Reason::ApiUpdated, "a");
        let b = DiagnosticEvent::normal(cluster(), Reason::ApiUpdated, "a");
        assert_ne!(a.event_id, b.event_id);
    }
}
