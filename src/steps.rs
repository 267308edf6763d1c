//! Built-in generation steps run by `cairn pass`.
//!
//! The general step runs first so every node pool fingerprint covers the
//! shared service configuration. Each node pool then merges its own
//! overrides on top, fingerprints the result and reports how it drifted.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cairn_events::{DiagnosticEvent, Reason};
use cairn_reconciler::fingerprint;
use cairn_reconciler::{
    Cluster, ComponentReconciler, ComponentStatus, DashboardsSpec, Error, FingerprintDrift,
    NodePool, NodePoolHash, ReconcilerContext, ReconcilerOptions, Result, StepOutcome, Volume,
    VolumeMount, VolumeSource,
};
use tracing::debug;

/// Volume carrying the generated service configuration.
pub const CONFIG_VOLUME: &str = "opensearch-config";
/// Where the generated configuration lands inside the service container.
pub const CONFIG_MOUNT_DIR: &str = "/usr/share/opensearch/config";
/// Component name the dashboards step reports under.
pub const DASHBOARDS_COMPONENT: &str = "dashboards";
/// How long to wait before checking a pool that needs a rolling restart.
pub const RESTART_REQUEUE: Duration = Duration::from_secs(30);

/// Contributes cluster-wide service settings and the config volume.
pub struct GeneralConfigStep {
    cluster_name: String,
    service_name: String,
    additional_config: BTreeMap<String, String>,
}

impl GeneralConfigStep {
    pub fn new(cluster: &Cluster) -> Self {
        Self {
            cluster_name: cluster.metadata.name.clone(),
            service_name: service_name(cluster),
            additional_config: cluster.spec.general.additional_config.clone(),
        }
    }
}

#[async_trait]
impl ComponentReconciler for GeneralConfigStep {
    fn component(&self) -> &str {
        "general"
    }

    async fn reconcile(
        &self,
        ctx: &mut ReconcilerContext,
        _options: &ReconcilerOptions,
    ) -> Result<StepOutcome> {
        ctx.add_service_config("cluster.name", &self.cluster_name);
        ctx.add_service_config("network.host", "0.0.0.0");
        ctx.add_service_config(
            "discovery.seed_hosts",
            format!("{}-discovery", self.service_name),
        );
        for (key, value) in &self.additional_config {
            ctx.add_service_config(key, value);
        }

        ctx.add_volume(Volume::new(
            CONFIG_VOLUME,
            VolumeSource::ConfigMap {
                name: format!("{}-config", self.cluster_name),
            },
        ));
        ctx.add_volume_mount(
            VolumeMount::new(CONFIG_VOLUME, format!("{CONFIG_MOUNT_DIR}/opensearch.yml"))
                .with_sub_path("opensearch.yml")
                .read_only(),
        );

        Ok(StepOutcome::done())
    }
}

/// Fingerprints one node pool's effective configuration and service version.
pub struct NodePoolStep {
    pool: NodePool,
    version: String,
}

impl NodePoolStep {
    pub fn new(pool: NodePool, version: impl Into<String>) -> Self {
        Self {
            pool,
            version: version.into(),
        }
    }

    /// Shared service config with the pool's overrides applied.
    fn effective_config(&self, ctx: &ReconcilerContext) -> BTreeMap<String, String> {
        let mut config = ctx.service_config().clone();
        config.extend(self.pool.additional_config.clone());
        config.insert("node.roles".to_string(), self.pool.roles.join(","));
        config
    }
}

#[async_trait]
impl ComponentReconciler for NodePoolStep {
    fn component(&self) -> &str {
        &self.pool.component
    }

    async fn reconcile(
        &self,
        ctx: &mut ReconcilerContext,
        _options: &ReconcilerOptions,
    ) -> Result<StepOutcome> {
        let name = self.pool.component.as_str();

        let existing = ctx
            .fetch_node_pool_hash(name)
            .ok_or_else(|| Error::unregistered_node_pool(name, "lookup"))?;
        if existing.is_computed() {
            debug!(component = name, "Fingerprint already computed this pass");
        }

        // replicas stay out: scaling a pool does not need a restart
        let hash = fingerprint::compute_with(&self.effective_config(ctx), &[&self.version]);
        ctx.replace_node_pool_hash(NodePoolHash::new(name, hash))?;

        let drift = ctx.node_pool_drift(name)?;
        let description = match &drift {
            FingerprintDrift::NotComputed => "Configuration not generated",
            FingerprintDrift::New { .. } => "Configuration generated",
            FingerprintDrift::Unchanged => "Configuration unchanged",
            FingerprintDrift::Changed { .. } => "Configuration changed, rolling restart required",
        };

        if drift.requires_restart() {
            ctx.emit(DiagnosticEvent::normal(
                ctx.involved().clone(),
                Reason::Pending,
                format!("Node pool {name} configuration changed, restart pending"),
            ));
            return Ok(StepOutcome::with_status(
                ComponentStatus::new(name, "RestartPending").with_description(description),
            )
            .requeue_after(RESTART_REQUEUE));
        }

        Ok(StepOutcome::with_status(
            ComponentStatus::new(name, "Ready").with_description(description),
        ))
    }
}

/// Generates dashboards settings when dashboards are enabled.
pub struct DashboardsStep {
    service_name: String,
    spec: DashboardsSpec,
}

impl DashboardsStep {
    pub fn new(cluster: &Cluster) -> Self {
        Self {
            service_name: service_name(cluster),
            spec: cluster.spec.dashboards.clone(),
        }
    }
}

#[async_trait]
impl ComponentReconciler for DashboardsStep {
    fn component(&self) -> &str {
        DASHBOARDS_COMPONENT
    }

    async fn reconcile(
        &self,
        ctx: &mut ReconcilerContext,
        options: &ReconcilerOptions,
    ) -> Result<StepOutcome> {
        if !self.spec.enable {
            return Ok(StepOutcome::done());
        }

        ctx.add_dashboards_config("server.name", format!("{}-dashboards", self.service_name));
        ctx.add_dashboards_config("server.host", "0.0.0.0");
        ctx.add_dashboards_config(
            "opensearch.hosts",
            format!("https://{}:9200", self.service_name),
        );
        for (key, value) in &self.spec.additional_config {
            ctx.add_dashboards_config(key, value);
        }

        debug!(
            component = DASHBOARDS_COMPONENT,
            custom_transport = options.transport().is_some(),
            "Dashboards configuration generated"
        );

        Ok(StepOutcome::with_status(
            ComponentStatus::new(DASHBOARDS_COMPONENT, "Ready")
                .with_description(format!("{} replicas", self.spec.replicas)),
        ))
    }
}

/// The steps `cairn pass` runs for a cluster, in order.
pub fn builtin_steps(cluster: &Cluster) -> Vec<Arc<dyn ComponentReconciler>> {
    let general: Arc<dyn ComponentReconciler> = Arc::new(GeneralConfigStep::new(cluster));
    let version = &cluster.spec.general.version;
    let pools = cluster.spec.node_pools.iter().cloned().map(|pool| {
        Arc::new(NodePoolStep::new(pool, version.as_str())) as Arc<dyn ComponentReconciler>
    });
    let dashboards: Arc<dyn ComponentReconciler> = Arc::new(DashboardsStep::new(cluster));

    std::iter::once(general)
        .chain(pools)
        .chain(std::iter::once(dashboards))
        .collect()
}

fn service_name(cluster: &Cluster) -> String {
    if cluster.spec.general.service_name.is_empty() {
        cluster.metadata.name.clone()
    } else {
        cluster.spec.general.service_name.clone()
    }
}
