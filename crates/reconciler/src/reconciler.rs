//! Reconciliation pass driver.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use cairn_events::{EventSink, TracingEventSink};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::{PassArtifacts, ReconcilerContext};
use crate::error::{Error, Result};
use crate::ledger::NodePoolDrift;
use crate::options::ReconcilerOptions;
use crate::status::{update_component_status, upsert, StatusStore};
use crate::types::{
    Cluster, ClusterKey, ClusterStatus, ReconcileResult, StepOutcome, Volume, VolumeMount,
};

/// One independent step of a reconciliation pass.
///
/// Steps run sequentially, each with exclusive access to the pass context.
#[async_trait]
pub trait ComponentReconciler: Send + Sync {
    /// Name used to attribute logs and errors.
    fn component(&self) -> &str;

    /// Reconcile this component.
    async fn reconcile(
        &self,
        ctx: &mut ReconcilerContext,
        options: &ReconcilerOptions,
    ) -> Result<StepOutcome>;
}

/// What one pass produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub cluster: ClusterKey,
    /// Cluster status after merging every step's outcome.
    pub status: ClusterStatus,
    pub drift: Vec<NodePoolDrift>,
    pub service_config: BTreeMap<String, String>,
    pub dashboards_config: BTreeMap<String, String>,
    pub volumes: Vec<Volume>,
    pub volume_mounts: Vec<VolumeMount>,
    pub result: ReconcileResult,
    /// Whether the status was written to the store.
    pub status_persisted: bool,
}

impl PassReport {
    /// Node pools whose configuration changed since the previous pass.
    pub fn restart_required(&self) -> Vec<&str> {
        self.drift
            .iter()
            .filter(|d| d.drift.requires_restart())
            .map(|d| d.component.as_str())
            .collect()
    }
}

/// Drives one reconciliation pass over a cluster.
pub struct Reconciler {
    /// Where statuses and fingerprints persist between passes.
    store: Arc<dyn StatusStore>,
    /// Diagnostic event sink.
    sink: Arc<dyn EventSink>,
    /// Configuration.
    options: ReconcilerOptions,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        store: Arc<dyn StatusStore>,
        sink: Arc<dyn EventSink>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            store,
            sink,
            options,
        }
    }

    /// Run one pass: build a fresh context, run every step in order, merge
    /// their statuses and measure fingerprint drift.
    ///
    /// The in-memory merge happens whether or not status writes are enabled,
    /// so a dry run reports exactly what a real pass would persist.
    ///
    /// # Errors
    ///
    /// The first step error aborts the pass and is returned as is. Status
    /// store failures surface as [`Error::StatusUpdate`] and are not retried.
    pub async fn run_pass(
        &self,
        cluster: &Cluster,
        steps: &[Arc<dyn ComponentReconciler>],
    ) -> Result<PassReport> {
        let key = cluster.key();
        let persist = self.options.should_update_status();

        let mut status = self
            .store
            .get_status(&key)
            .await
            .map_err(|e| Error::status_update(key.to_string(), "*", "get_status", e.to_string()))?
            .unwrap_or_default();

        info!(
            cluster = %key,
            node_pools = cluster.spec.node_pools.len(),
            steps = steps.len(),
            persist,
            "Starting reconciliation pass"
        );

        let mut ctx = ReconcilerContext::for_cluster(Arc::clone(&self.sink), cluster)
            .with_baseline(status.node_pool_hashes.clone());
        let mut result = ReconcileResult::done();

        for step in steps {
            debug!(cluster = %key, component = step.component(), "Running component step");

            let outcome = step
                .reconcile(&mut ctx, &self.options)
                .await
                .inspect_err(|e| {
                    warn!(cluster = %key, component = step.component(), error = %e, "Component step failed");
                })?;

            result = result.combine(outcome.result);

            if let Some(component_status) = outcome.status {
                if persist {
                    update_component_status(
                        self.store.as_ref(),
                        self.sink.as_ref(),
                        cluster,
                        Some(&component_status),
                    )
                    .await?;
                }
                upsert(&mut status.components_status, component_status);
            }
        }

        let PassArtifacts {
            volumes,
            volume_mounts,
            service_config,
            dashboards_config,
            node_pool_hashes,
            drift,
        } = ctx.finish();

        status.node_pool_hashes = node_pool_hashes;
        if persist {
            self.persist_fingerprints(&key, &status).await?;
        }

        let report = PassReport {
            cluster: key,
            status,
            drift,
            service_config,
            dashboards_config,
            volumes,
            volume_mounts,
            result,
            status_persisted: persist,
        };

        let restarts = report.restart_required();
        if restarts.is_empty() {
            info!(cluster = %report.cluster, "Reconciliation pass complete, no configuration drift");
        } else {
            info!(
                cluster = %report.cluster,
                restart = ?restarts,
                "Reconciliation pass complete, node pool configuration changed"
            );
        }

        Ok(report)
    }

    async fn persist_fingerprints(&self, key: &ClusterKey, status: &ClusterStatus) -> Result<()> {
        let hashes = &status.node_pool_hashes;
        let apply = |current: &mut ClusterStatus| {
            current.node_pool_hashes.clone_from(hashes);
        };
        self.store
            .update_status(key, &apply)
            .await
            .map(|_| ())
            .map_err(|e| {
                Error::status_update(
                    key.to_string(),
                    "*",
                    "persist_fingerprints",
                    e.to_string(),
                )
            })
    }

    /// Get the configuration.
    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    store: Option<Arc<dyn StatusStore>>,
    sink: Option<Arc<dyn EventSink>>,
    options: ReconcilerOptions,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            store: None,
            sink: None,
            options: ReconcilerOptions::default(),
        }
    }

    /// Set the status store.
    pub fn with_store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the diagnostic sink. Defaults to [`TracingEventSink`].
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the options.
    pub fn with_options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable/disable status writes.
    pub fn update_status(mut self, enabled: bool) -> Self {
        self.options.update_status = Some(enabled);
        self
    }

    /// Override the admin API transport.
    pub fn transport(mut self, client: reqwest::Client) -> Self {
        self.options.transport = Some(client);
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Fails if no status store was provided.
    pub fn build(self) -> Result<Reconciler> {
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("Status store is required"))?;

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingEventSink) as Arc<dyn EventSink>);

        Ok(Reconciler::new(store, sink, self.options))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
