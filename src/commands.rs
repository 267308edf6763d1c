//! CLI command handlers.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use cairn_events::{DiagnosticEvent, EventSink, FanoutEventSink, RecordingEventSink, TracingEventSink};
use cairn_reconciler::{
    Cluster, ClusterKey, ClusterStatus, PassReport, ReconcilerBuilder, ReconcilerOptions,
    StatusStore,
};
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::cli::Commands;
use crate::config::CairnConfig;
use crate::steps::builtin_steps;
use crate::store::FileStatusStore;

/// Namespaces are DNS-1123 labels.
static DNS_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").ok());

/// Cluster names are DNS-1123 subdomains.
static DNS_SUBDOMAIN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").ok()
});

const DNS_LABEL_MAX_LEN: usize = 63;
const DNS_SUBDOMAIN_MAX_LEN: usize = 253;

/// Output of `cairn pass`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassOutput {
    pub report: PassReport,
    /// Diagnostics emitted during the pass.
    pub events: Vec<DiagnosticEvent>,
}

/// Output of `cairn status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub cluster: ClusterKey,
    /// `None` until a pass has persisted something.
    pub status: Option<ClusterStatus>,
}

/// Execute a CLI command.
///
/// This is the main command dispatcher that routes to the appropriate handler.
///
/// # Errors
///
/// Returns error if the command fails.
pub async fn execute_command(command: Commands, config: &CairnConfig) -> Result<()> {
    match command {
        Commands::Pass {
            cluster,
            state_dir,
            dry_run,
        } => cmd_pass(&cluster, state_dir, dry_run, config).await,

        Commands::Status { cluster, state_dir } => cmd_status(&cluster, state_dir, config).await,
    }
}

async fn cmd_pass(
    cluster_path: &Path,
    state_dir: Option<PathBuf>,
    dry_run: bool,
    config: &CairnConfig,
) -> Result<()> {
    let state_dir = state_dir.unwrap_or_else(|| config.state_dir.clone());
    let output = run_pass(cluster_path, &state_dir, dry_run, config).await?;
    print_json(&output)
}

async fn cmd_status(
    cluster_path: &Path,
    state_dir: Option<PathBuf>,
    config: &CairnConfig,
) -> Result<()> {
    let state_dir = state_dir.unwrap_or_else(|| config.state_dir.clone());
    let output = read_status(cluster_path, &state_dir).await?;
    print_json(&output)
}

/// Run one pass over the cluster declared in `cluster_path`.
///
/// # Errors
///
/// Returns error if the cluster cannot be loaded, a step fails, or the
/// status store cannot be read or written.
pub async fn run_pass(
    cluster_path: &Path,
    state_dir: &Path,
    dry_run: bool,
    config: &CairnConfig,
) -> Result<PassOutput> {
    let cluster = load_cluster(cluster_path)?;
    let recording = RecordingEventSink::new_arc();
    let sink = FanoutEventSink::new()
        .with_sink(Arc::new(TracingEventSink))
        .with_sink(recording.clone() as Arc<dyn EventSink>);

    let options = reconciler_options(config, dry_run)?;
    let reconciler = ReconcilerBuilder::new()
        .with_store(Arc::new(FileStatusStore::new(state_dir)))
        .with_sink(Arc::new(sink))
        .with_options(options)
        .build()?;

    info!(
        cluster = %cluster.key(),
        state_dir = %state_dir.display(),
        dry_run,
        "Running reconciliation pass"
    );

    let report = reconciler
        .run_pass(&cluster, &builtin_steps(&cluster))
        .await
        .with_context(|| format!("Reconciliation pass failed for {}", cluster.key()))?;

    Ok(PassOutput {
        report,
        events: recording.take(),
    })
}

/// Read the persisted status of the cluster declared in `cluster_path`.
///
/// # Errors
///
/// Returns error if the cluster cannot be loaded or the status file is unreadable.
pub async fn read_status(cluster_path: &Path, state_dir: &Path) -> Result<StatusOutput> {
    let cluster = load_cluster(cluster_path)?;
    let key = cluster.key();
    let status = FileStatusStore::new(state_dir)
        .get_status(&key)
        .await
        .with_context(|| format!("Failed to read status of {key}"))?;

    Ok(StatusOutput {
        cluster: key,
        status,
    })
}

/// Load and check a cluster definition.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed, names the cluster
/// outside DNS-1123 rules, or declares a node pool without a name.
pub fn load_cluster(path: &Path) -> Result<Cluster> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| cairn_core::Error::file_read_failed(path, e.to_string()))?;
    let cluster: Cluster = serde_yaml::from_str(&contents)
        .map_err(cairn_core::Error::from)
        .with_context(|| format!("Invalid cluster definition in {}", path.display()))?;

    validate_cluster(&cluster)
        .with_context(|| format!("Invalid cluster definition in {}", path.display()))?;

    Ok(cluster)
}

/// Check the names a cluster is stored and reported under.
fn validate_cluster(cluster: &Cluster) -> cairn_core::Result<()> {
    let meta = &cluster.metadata;
    if !matches_dns(Option::as_ref(&DNS_LABEL), &meta.namespace, DNS_LABEL_MAX_LEN) {
        return Err(cairn_core::Error::invalid_config(
            "metadata.namespace",
            format!("'{}' is not a DNS-1123 label", meta.namespace),
        ));
    }
    if !matches_dns(Option::as_ref(&DNS_SUBDOMAIN), &meta.name, DNS_SUBDOMAIN_MAX_LEN) {
        return Err(cairn_core::Error::invalid_config(
            "metadata.name",
            format!("'{}' is not a DNS-1123 subdomain", meta.name),
        ));
    }

    if cluster.spec.node_pools.iter().any(|pool| pool.component.trim().is_empty()) {
        return Err(cairn_core::Error::invalid_config(
            "spec.nodePools.component",
            "must not be empty",
        ));
    }

    Ok(())
}

fn matches_dns(pattern: Option<&Regex>, value: &str, max_len: usize) -> bool {
    value.len() <= max_len && pattern.is_some_and(|re| re.is_match(value))
}

fn reconciler_options(config: &CairnConfig, dry_run: bool) -> Result<ReconcilerOptions> {
    let options = ReconcilerOptions::new().with_update_status(config.update_status && !dry_run);

    match config.transport_timeout() {
        Some(timeout) => {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build admin API transport")?;
            Ok(options.with_transport(client))
        }
        None => Ok(options),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use cairn_reconciler::FingerprintDrift;

    const CLUSTER_YAML: &str = r"
metadata:
  name: logs
  namespace: search
spec:
  general:
    additionalConfig:
      plugins.security.disabled: 'true'
  nodePools:
    - component: master
      replicas: 3
      roles: [cluster_manager]
    - component: data
      replicas: 2
      roles: [data]
      additionalConfig:
        indices.memory.index_buffer_size: '10%'
";

    fn write_cluster(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("cluster.yaml");
        std::fs::write(&path, yaml).expect("Failed to write cluster file");
        path
    }

    fn drift_of<'a>(output: &'a PassOutput, component: &str) -> Option<&'a FingerprintDrift> {
        output
            .report
            .drift
            .iter()
            .find(|d| d.component == component)
            .map(|d| &d.drift)
    }

    #[test]
    fn test_load_cluster() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_cluster(dir.path(), CLUSTER_YAML);

        let cluster = load_cluster(&path).expect("cluster should load");

        assert_eq!(cluster.key(), ClusterKey::new("search", "logs"));
        assert_eq!(cluster.node_pool_names().collect::<Vec<_>>(), vec!["master", "data"]);
    }

    #[test]
    fn test_load_cluster_rejects_unnamed_pool() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_cluster(
            dir.path(),
            "metadata:\n  name: logs\nspec:\n  nodePools:\n    - component: ''\n",
        );

        assert!(load_cluster(&path).is_err());
    }

    #[test]
    fn test_load_cluster_rejects_names_outside_dns_rules() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        for (namespace, name) in [
            ("team_a", "logs"),
            ("team", "a_logs"),
            ("search", "../logs"),
            ("search/x", "logs"),
            ("search", ".."),
            ("Search", "logs"),
            ("", "logs"),
        ] {
            let yaml = format!(
                "metadata:\n  name: '{name}'\n  namespace: '{namespace}'\nspec:\n  nodePools:\n    - component: master\n"
            );
            let path = write_cluster(dir.path(), &yaml);
            assert!(
                load_cluster(&path).is_err(),
                "{namespace}/{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_load_cluster_accepts_dotted_name() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_cluster(
            dir.path(),
            "metadata:\n  name: logs.eu-1\n  namespace: search-prod\n",
        );

        let cluster = load_cluster(&path).expect("cluster should load");

        assert_eq!(cluster.key(), ClusterKey::new("search-prod", "logs.eu-1"));
    }

    #[tokio::test]
    async fn test_second_pass_detects_changed_pool() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let state_dir = dir.path().join("state");
        let config = CairnConfig::default();
        let path = write_cluster(dir.path(), CLUSTER_YAML);

        let first = run_pass(&path, &state_dir, false, &config)
            .await
            .expect("first pass should succeed");
        assert!(matches!(
            drift_of(&first, "data"),
            Some(FingerprintDrift::New { .. })
        ));

        let changed = CLUSTER_YAML.replace("'10%'", "'20%'");
        let path = write_cluster(dir.path(), &changed);
        let second = run_pass(&path, &state_dir, false, &config)
            .await
            .expect("second pass should succeed");

        assert_eq!(drift_of(&second, "master"), Some(&FingerprintDrift::Unchanged));
        assert_eq!(second.report.restart_required(), vec!["data"]);
        assert!(second
            .events
            .iter()
            .any(|e| e.reason == cairn_events::Reason::Pending));

        let status = read_status(&path, &state_dir)
            .await
            .expect("status should read")
            .status
            .unwrap_or_default();
        assert_eq!(
            status
                .components_status
                .iter()
                .map(|c| c.component.as_str())
                .collect::<Vec<_>>(),
            vec!["master", "data"]
        );
        assert_eq!(
            status.component("data").map(|c| c.status.as_str()),
            Some("RestartPending")
        );
    }

    #[tokio::test]
    async fn test_scaling_pool_is_not_a_config_change() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let state_dir = dir.path().join("state");
        let config = CairnConfig::default();
        let path = write_cluster(dir.path(), CLUSTER_YAML);
        run_pass(&path, &state_dir, false, &config)
            .await
            .expect("first pass should succeed");

        let scaled = CLUSTER_YAML.replace("replicas: 2", "replicas: 4");
        let path = write_cluster(dir.path(), &scaled);
        let second = run_pass(&path, &state_dir, false, &config)
            .await
            .expect("second pass should succeed");

        assert_eq!(drift_of(&second, "data"), Some(&FingerprintDrift::Unchanged));
        assert!(second.report.restart_required().is_empty());
        assert_eq!(
            second
                .report
                .status
                .component("data")
                .map(|c| c.status.as_str()),
            Some("Ready")
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let state_dir = dir.path().join("state");
        let path = write_cluster(dir.path(), CLUSTER_YAML);

        let output = run_pass(&path, &state_dir, true, &CairnConfig::default())
            .await
            .expect("dry run should succeed");

        assert!(!output.report.status_persisted);
        assert_eq!(output.report.status.components_status.len(), 2);
        assert!(!state_dir.exists());
    }

    #[test]
    fn test_options_follow_config_and_flag() {
        let config = CairnConfig {
            transport_timeout_secs: Some(5),
            ..CairnConfig::default()
        };

        let options = reconciler_options(&config, true).expect("options should build");

        assert!(!options.should_update_status());
        assert!(options.transport().is_some());
    }
}
