//! Status merging and the status store contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cairn_events::{DiagnosticEvent, EventSink, Reason};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{Error, Result, StoreResult};
use crate::types::{Cluster, ClusterKey, ClusterStatus, ComponentStatus};

/// What [`upsert`] did with the status it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The component was new and was appended.
    Inserted,
    /// An existing entry at this index was replaced.
    Replaced(usize),
}

/// Upsert a component status into an ordered status list.
///
/// An entry with the same component name is replaced in place; otherwise the
/// status is appended. The order of all other entries is preserved.
pub fn upsert(statuses: &mut Vec<ComponentStatus>, status: ComponentStatus) -> UpsertOutcome {
    match statuses
        .iter()
        .position(|s| s.component == status.component)
    {
        Some(idx) => {
            if let Some(slot) = statuses.get_mut(idx) {
                *slot = status;
            }
            UpsertOutcome::Replaced(idx)
        }
        None => {
            statuses.push(status);
            UpsertOutcome::Inserted
        }
    }
}

/// Mutation applied to a cluster status inside a store update.
///
/// A store may apply it more than once (e.g. after an optimistic-concurrency
/// retry), so it must be repeatable.
pub type StatusMutation<'a> = &'a (dyn Fn(&mut ClusterStatus) + Send + Sync);

/// Persistent home of cluster statuses.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Read the persisted status of a cluster.
    async fn get_status(&self, key: &ClusterKey) -> StoreResult<Option<ClusterStatus>>;

    /// Atomically read, mutate and write back the status of a cluster.
    ///
    /// Returns the status as written.
    async fn update_status(
        &self,
        key: &ClusterKey,
        mutate: StatusMutation<'_>,
    ) -> StoreResult<ClusterStatus>;
}

/// In-memory status store for testing and dry runs.
#[derive(Default)]
pub struct InMemoryStatusStore {
    statuses: RwLock<HashMap<ClusterKey, ClusterStatus>>,
}

impl InMemoryStatusStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed the persisted status of a cluster.
    pub async fn seed(&self, key: ClusterKey, status: ClusterStatus) {
        self.statuses.write().await.insert(key, status);
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn get_status(&self, key: &ClusterKey) -> StoreResult<Option<ClusterStatus>> {
        Ok(self.statuses.read().await.get(key).cloned())
    }

    async fn update_status(
        &self,
        key: &ClusterKey,
        mutate: StatusMutation<'_>,
    ) -> StoreResult<ClusterStatus> {
        let mut statuses = self.statuses.write().await;
        let status = statuses.entry(key.clone()).or_default();
        mutate(status);
        Ok(status.clone())
    }
}

/// Persist one component's outcome into the cluster status.
///
/// `None` means the step had nothing to report and is a no-op.
///
/// # Errors
///
/// Returns [`Error::StatusUpdate`] when the store rejects the write. A
/// `StatusUpdateError` warning is emitted as well. Nothing is retried.
pub async fn update_component_status(
    store: &dyn StatusStore,
    sink: &dyn EventSink,
    cluster: &Cluster,
    status: Option<&ComponentStatus>,
) -> Result<()> {
    let Some(status) = status else {
        return Ok(());
    };
    let key = cluster.key();
    let apply = |current: &mut ClusterStatus| {
        upsert(&mut current.components_status, status.clone());
    };

    match store.update_status(&key, &apply).await {
        Ok(_) => {
            debug!(cluster = %key, component = %status.component, "Component status persisted");
            Ok(())
        }
        Err(e) => {
            warn!(
                cluster = %key,
                component = %status.component,
                error = %e,
                "Failed to update component status"
            );
            sink.emit(DiagnosticEvent::warning(
                cluster.object_ref(),
                Reason::StatusUpdateError,
                format!(
                    "Failed to update status of component '{}': {e}",
                    status.component
                ),
            ));
            Err(Error::status_update(
                key.to_string(),
                &status.component,
                "update_component_status",
                e.to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use cairn_events::RecordingEventSink;
    use proptest::prelude::*;

    fn s(component: &str, status: &str) -> ComponentStatus {
        ComponentStatus::new(component, status)
    }

    fn abc() -> Vec<ComponentStatus> {
        vec![s("A", "Green"), s("B", "Green"), s("C", "Green")]
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut list = abc();
        let outcome = upsert(&mut list, s("B", "Yellow"));

        assert_eq!(outcome, UpsertOutcome::Replaced(1));
        assert_eq!(list, vec![s("A", "Green"), s("B", "Yellow"), s("C", "Green")]);
    }

    #[test]
    fn test_upsert_appends_new_component() {
        let mut list = abc();
        let outcome = upsert(&mut list, s("D", "Green"));

        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert_eq!(
            list.iter().map(|c| c.component.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C", "D"]
        );
    }

    #[test]
    fn test_upsert_replaces_whole_record() {
        let mut list = vec![s("A", "Red")
            .with_description("disk full")
            .with_condition("DiskPressure")];
        upsert(&mut list, s("A", "Green"));
        assert_eq!(list, vec![s("A", "Green")]);
    }

    #[test]
    fn test_upsert_into_empty_list() {
        let mut list = Vec::new();
        upsert(&mut list, s("A", "Green"));
        assert_eq!(list, vec![s("A", "Green")]);
    }

    proptest! {
        /// Applying the same upsert twice equals applying it once.
        #[test]
        fn prop_upsert_idempotent(
            names in proptest::collection::vec("[a-d]", 0..6),
            target in "[a-f]",
            value in "[A-Z][a-z]{0,5}",
        ) {
            let mut base = Vec::new();
            for name in &names {
                upsert(&mut base, s(name, "Green"));
            }
            let mut once = base.clone();
            upsert(&mut once, s(&target, &value));
            let mut twice = once.clone();
            upsert(&mut twice, s(&target, &value));

            prop_assert_eq!(once, twice);
        }

        /// Component names stay unique and first-seen order is kept.
        #[test]
        fn prop_upsert_keeps_unique_first_seen_order(
            names in proptest::collection::vec("[a-e]", 0..20),
        ) {
            let mut list = Vec::new();
            let mut first_seen: Vec<String> = Vec::new();
            for name in &names {
                upsert(&mut list, s(name, "Green"));
                if !first_seen.contains(name) {
                    first_seen.push(name.clone());
                }
            }
            let order: Vec<String> = list.iter().map(|c| c.component.clone()).collect();
            prop_assert_eq!(order, first_seen);
        }
    }

    struct RejectingStore;

    #[async_trait]
    impl StatusStore for RejectingStore {
        async fn get_status(&self, _key: &ClusterKey) -> StoreResult<Option<ClusterStatus>> {
            Ok(None)
        }

        async fn update_status(
            &self,
            key: &ClusterKey,
            _mutate: StatusMutation<'_>,
        ) -> StoreResult<ClusterStatus> {
            Err(StoreError::conflict(key.to_string(), "resource version changed"))
        }
    }

    fn cluster() -> Cluster {
        Cluster::new("search", "logs", Vec::new())
    }

    #[tokio::test]
    async fn test_update_component_status_none_is_noop() {
        let store = InMemoryStatusStore::new();
        let sink = RecordingEventSink::new();

        let result = update_component_status(&store, &sink, &cluster(), None).await;

        assert!(result.is_ok());
        assert_eq!(store.get_status(&cluster().key()).await, Ok(None));
    }

    #[tokio::test]
    async fn test_update_component_status_upserts() {
        let store = InMemoryStatusStore::new();
        let sink = RecordingEventSink::new();
        let c = cluster();

        let _ = update_component_status(&store, &sink, &c, Some(&s("master", "Green"))).await;
        let _ = update_component_status(&store, &sink, &c, Some(&s("data", "Green"))).await;
        let _ = update_component_status(&store, &sink, &c, Some(&s("master", "Yellow"))).await;

        let stored = store.get_status(&c.key()).await.ok().flatten();
        assert_eq!(
            stored.map(|st| st.components_status),
            Some(vec![s("master", "Yellow"), s("data", "Green")])
        );
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_update_component_status_failure_is_reported() {
        let sink = RecordingEventSink::new();

        let result =
            update_component_status(&RejectingStore, &sink, &cluster(), Some(&s("data", "Green")))
                .await;

        let err = result.err();
        assert!(err.as_ref().is_some_and(Error::is_status_update));
        assert_eq!(err.as_ref().and_then(Error::component), Some("data"));
        assert_eq!(sink.count_reason(Reason::StatusUpdateError), 1);
    }
}
