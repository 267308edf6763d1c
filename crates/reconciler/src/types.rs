//! Core types for the reconciler.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use cairn_events::ObjectRef;
use serde::{Deserialize, Serialize};

/// Kind name used when referring to a cluster in diagnostics.
pub const CLUSTER_KIND: &str = "OpenSearchCluster";

/// Identity of a cluster resource in the state store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterKey {
    pub namespace: String,
    pub name: String,
}

impl ClusterKey {
    /// Create a new cluster key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object metadata of a declared cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Cluster-wide service settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSpec {
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub version: String,
    /// Extra service configuration shared by every node pool.
    #[serde(default)]
    pub additional_config: BTreeMap<String, String>,
}

/// An independently scaled group of nodes sharing one configuration profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    pub component: String,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Service configuration applied to this pool only.
    #[serde(default)]
    pub additional_config: BTreeMap<String, String>,
}

const fn default_replicas() -> u32 {
    1
}

impl NodePool {
    /// Create a node pool with one replica and no roles.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            replicas: default_replicas(),
            ..Self::default()
        }
    }
}

/// Companion dashboards service settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardsSpec {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub additional_config: BTreeMap<String, String>,
}

/// Declared cluster specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default)]
    pub general: GeneralSpec,
    #[serde(default)]
    pub node_pools: Vec<NodePool>,
    #[serde(default)]
    pub dashboards: DashboardsSpec,
}

/// A declared cluster resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub metadata: ClusterMeta,
    #[serde(default)]
    pub spec: ClusterSpec,
}

impl Cluster {
    /// Create a cluster with the given node pools.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        node_pools: Vec<NodePool>,
    ) -> Self {
        Self {
            metadata: ClusterMeta {
                name: name.into(),
                namespace: namespace.into(),
            },
            spec: ClusterSpec {
                node_pools,
                ..ClusterSpec::default()
            },
        }
    }

    /// Store key of this cluster.
    pub fn key(&self) -> ClusterKey {
        ClusterKey::new(&self.metadata.namespace, &self.metadata.name)
    }

    /// Reference used as the involved object of diagnostics.
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(CLUSTER_KIND, &self.metadata.namespace, &self.metadata.name)
    }

    /// Declared node pool component names, in declaration order.
    pub fn node_pool_names(&self) -> impl Iterator<Item = &str> {
        self.spec.node_pools.iter().map(|p| p.component.as_str())
    }
}

/// Fingerprint of one node pool's generated configuration.
///
/// An empty fingerprint means it has not been computed this pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolHash {
    pub component: String,
    pub config_hash: String,
}

impl NodePoolHash {
    /// Create a new fingerprint entry.
    pub fn new(component: impl Into<String>, config_hash: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            config_hash: config_hash.into(),
        }
    }

    /// Create an entry with no fingerprint yet.
    pub fn empty(component: impl Into<String>) -> Self {
        Self::new(component, String::new())
    }

    /// Whether a fingerprint has been recorded.
    pub fn is_computed(&self) -> bool {
        !self.config_hash.is_empty()
    }
}

/// Outcome record for one component of the cluster.
///
/// Whatever a step reports becomes the whole stored record for that
/// component; fields are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub component: String,
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

impl ComponentStatus {
    /// Create a status with no description.
    pub fn new(component: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: status.into(),
            ..Self::default()
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }
}

/// Persisted status of a cluster resource.
///
/// The only state that carries over from one pass to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub components_status: Vec<ComponentStatus>,
    #[serde(default)]
    pub node_pool_hashes: Vec<NodePoolHash>,
}

impl ClusterStatus {
    /// Look up the status of one component.
    pub fn component(&self, name: &str) -> Option<&ComponentStatus> {
        self.components_status.iter().find(|s| s.component == name)
    }
}

/// Requeue decision of a component step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub requeue: bool,
    pub requeue_after: Option<Duration>,
}

impl ReconcileResult {
    /// Nothing left to do.
    pub const fn done() -> Self {
        Self {
            requeue: false,
            requeue_after: None,
        }
    }

    /// Requeue as soon as possible.
    pub const fn requeue_now() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }

    /// Requeue after the given delay.
    pub const fn requeue_after(delay: Duration) -> Self {
        Self {
            requeue: true,
            requeue_after: Some(delay),
        }
    }

    /// Requeue requested without a delay.
    pub const fn is_immediate(&self) -> bool {
        self.requeue && self.requeue_after.is_none()
    }

    /// Combine two results: requeue if either does, soonest wins.
    ///
    /// An immediate requeue beats any delay.
    pub fn combine(self, other: Self) -> Self {
        if self.is_immediate() || other.is_immediate() {
            return Self::requeue_now();
        }
        let requeue_after = match (self.requeue_after, other.requeue_after) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            requeue: self.requeue || other.requeue,
            requeue_after,
        }
    }
}

/// What a component step hands back to the pass driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub result: ReconcileResult,
    pub status: Option<ComponentStatus>,
}

impl StepOutcome {
    /// Outcome with no status to record.
    pub fn done() -> Self {
        Self::default()
    }

    /// Outcome recording the given status.
    pub fn with_status(status: ComponentStatus) -> Self {
        Self {
            result: ReconcileResult::done(),
            status: Some(status),
        }
    }

    /// Replace the requeue decision.
    pub fn requeue_after(mut self, delay: Duration) -> Self {
        self.result = ReconcileResult::requeue_after(delay);
        self
    }
}

/// Source backing a declared volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VolumeSource {
    Secret { secret_name: String },
    ConfigMap { name: String },
    EmptyDir,
    PersistentVolumeClaim { claim_name: String },
}

/// A volume declaration contributed by a generation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
}

impl Volume {
    /// Create a new volume.
    pub fn new(name: impl Into<String>, source: VolumeSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// Where a volume is mounted inside the service container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

impl VolumeMount {
    /// Create a read-write mount.
    pub fn new(name: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mount_path: mount_path.into(),
            sub_path: None,
            read_only: false,
        }
    }

    /// Mount a single file out of the volume.
    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    /// Mark the mount read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}
