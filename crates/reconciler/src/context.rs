//! Per-pass reconciler context.
//!
//! A context is built once at the start of a pass, handed to each component
//! step in turn by exclusive borrow, and consumed at the end of the pass.
//! It has no internal locking and must never be shared between passes.

use std::collections::BTreeMap;
use std::sync::Arc;

use cairn_events::{DiagnosticEvent, EventSink, ObjectRef, Reason};
use tracing::warn;

use crate::config::{ConfigAggregator, ConfigScope};
use crate::error::Result;
use crate::ledger::{FingerprintDrift, FingerprintLedger, NodePoolDrift};
use crate::types::{Cluster, NodePoolHash, Volume, VolumeMount};

/// Shared state of one reconciliation pass.
pub struct ReconcilerContext {
    volumes: Vec<Volume>,
    volume_mounts: Vec<VolumeMount>,
    node_pool_hashes: FingerprintLedger,
    service_config: ConfigAggregator,
    dashboards_config: ConfigAggregator,
    sink: Arc<dyn EventSink>,
    involved: ObjectRef,
}

/// Everything a pass produced, once its context is consumed.
#[derive(Debug, Clone)]
pub struct PassArtifacts {
    pub volumes: Vec<Volume>,
    pub volume_mounts: Vec<VolumeMount>,
    pub service_config: BTreeMap<String, String>,
    pub dashboards_config: BTreeMap<String, String>,
    pub node_pool_hashes: Vec<NodePoolHash>,
    pub drift: Vec<NodePoolDrift>,
}

impl ReconcilerContext {
    /// Create a context registering one empty fingerprint per node pool.
    pub fn new<I, S>(sink: Arc<dyn EventSink>, involved: ObjectRef, node_pools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            volumes: Vec::new(),
            volume_mounts: Vec::new(),
            node_pool_hashes: FingerprintLedger::new(node_pools),
            service_config: ConfigAggregator::new(ConfigScope::Service),
            dashboards_config: ConfigAggregator::new(ConfigScope::Dashboards),
            sink,
            involved,
        }
    }

    /// Create a context for the node pools a cluster declares.
    pub fn for_cluster(sink: Arc<dyn EventSink>, cluster: &Cluster) -> Self {
        Self::new(sink, cluster.object_ref(), cluster.node_pool_names())
    }

    /// Attach the fingerprints persisted by the previous pass.
    #[must_use]
    pub fn with_baseline(mut self, baseline: Vec<NodePoolHash>) -> Self {
        self.node_pool_hashes = self.node_pool_hashes.with_baseline(baseline);
        self
    }

    /// Contribute a service configuration entry. Last writer wins.
    pub fn add_service_config(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.service_config.insert(key.clone(), value).is_some() {
            self.report_duplicate(ConfigScope::Service, &key);
        }
    }

    /// Contribute a dashboards configuration entry. Last writer wins.
    pub fn add_dashboards_config(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.dashboards_config.insert(key.clone(), value).is_some() {
            self.report_duplicate(ConfigScope::Dashboards, &key);
        }
    }

    fn report_duplicate(&self, scope: ConfigScope, key: &str) {
        warn!(
            involved = %self.involved,
            scope = %scope,
            key,
            "Config key already exists, will be overwritten"
        );
        self.sink.emit(DiagnosticEvent::warning(
            self.involved.clone(),
            Reason::ConfigDuplicateKey,
            format!("Config key '{key}' already exists in {scope} config. Will be overwritten"),
        ));
    }

    /// Append a volume declaration.
    pub fn add_volume(&mut self, volume: Volume) {
        self.volumes.push(volume);
    }

    /// Append a volume mount declaration.
    pub fn add_volume_mount(&mut self, mount: VolumeMount) {
        self.volume_mounts.push(mount);
    }

    /// Fingerprint entry of a node pool, see [`FingerprintLedger::lookup`].
    pub fn fetch_node_pool_hash(&self, component: &str) -> Option<&NodePoolHash> {
        self.node_pool_hashes.lookup(component)
    }

    /// Record a node pool's fingerprint, see [`FingerprintLedger::replace`].
    ///
    /// # Errors
    ///
    /// Fails if the pool was not declared when the context was created.
    pub fn replace_node_pool_hash(&mut self, entry: NodePoolHash) -> Result<()> {
        self.node_pool_hashes.replace(entry)
    }

    /// Drift of a node pool against the previous pass.
    ///
    /// # Errors
    ///
    /// Fails if the pool was not declared when the context was created.
    pub fn node_pool_drift(&self, component: &str) -> Result<FingerprintDrift> {
        self.node_pool_hashes.drift(component)
    }

    /// The fingerprint ledger.
    pub fn ledger(&self) -> &FingerprintLedger {
        &self.node_pool_hashes
    }

    /// Aggregated service configuration.
    pub fn service_config(&self) -> &BTreeMap<String, String> {
        self.service_config.entries()
    }

    /// Aggregated dashboards configuration.
    pub fn dashboards_config(&self) -> &BTreeMap<String, String> {
        self.dashboards_config.entries()
    }

    /// Volumes contributed so far.
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Volume mounts contributed so far.
    pub fn volume_mounts(&self) -> &[VolumeMount] {
        &self.volume_mounts
    }

    /// The object diagnostics are reported against.
    pub fn involved(&self) -> &ObjectRef {
        &self.involved
    }

    /// Emit a diagnostic event about the owning cluster.
    pub fn emit(&self, event: DiagnosticEvent) {
        self.sink.emit(event);
    }

    /// Consume the context at the end of the pass.
    pub fn finish(self) -> PassArtifacts {
        PassArtifacts {
            drift: self.node_pool_hashes.drift_report(),
            node_pool_hashes: self.node_pool_hashes.snapshot(),
            volumes: self.volumes,
            volume_mounts: self.volume_mounts,
            service_config: self.service_config.into_entries(),
            dashboards_config: self.dashboards_config.into_entries(),
        }
    }
}
