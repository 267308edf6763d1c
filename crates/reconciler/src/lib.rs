//! Per-pass aggregation and drift detection for search-cluster reconciliation.
//!
//! A controller converging a declared search cluster (several node pools plus
//! an optional dashboards service) runs many independent component steps per
//! pass. This crate holds the state those steps share during one pass:
//!
//! - **Fingerprint ledger**: one configuration fingerprint per node pool,
//!   compared against the previous pass to decide whether a disruptive
//!   rolling restart is needed
//! - **Config aggregators**: key/value bags for the service and dashboards
//!   configuration, last writer wins, overwrites reported
//! - **Status merger**: upserts a component outcome into the ordered status
//!   list without reordering or duplicating entries
//! - **Pass context**: owns all of the above for exactly one pass
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cairn_events::TracingEventSink;
//! use cairn_reconciler::{InMemoryStatusStore, Reconciler, ReconcilerOptions};
//!
//! # async fn run(cluster: cairn_reconciler::Cluster, steps: Vec<Arc<dyn cairn_reconciler::ComponentReconciler>>) -> cairn_reconciler::Result<()> {
//! let reconciler = Reconciler::new(
//!     Arc::new(InMemoryStatusStore::new()),
//!     Arc::new(TracingEventSink),
//!     ReconcilerOptions::new().with_update_status(false),
//! );
//! let report = reconciler.run_pass(&cluster, &steps).await?;
//! for component in report.restart_required() {
//!     println!("{component} needs a rolling restart");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod config;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod ledger;
pub mod options;
pub mod reconciler;
pub mod status;
pub mod types;

// Re-export main types
pub use config::{ConfigAggregator, ConfigScope};
pub use context::{PassArtifacts, ReconcilerContext};
pub use error::{Error, Result, StoreError, StoreResult};
pub use ledger::{FingerprintDrift, FingerprintLedger, NodePoolDrift};
pub use options::ReconcilerOptions;
pub use reconciler::{ComponentReconciler, PassReport, Reconciler, ReconcilerBuilder};
pub use status::{
    update_component_status, upsert, InMemoryStatusStore, StatusMutation, StatusStore,
    UpsertOutcome,
};
pub use types::{
    Cluster, ClusterKey, ClusterMeta, ClusterSpec, ClusterStatus, ComponentStatus,
    DashboardsSpec, GeneralSpec, NodePool, NodePoolHash, ReconcileResult, StepOutcome, Volume,
    VolumeMount, VolumeSource,
};
