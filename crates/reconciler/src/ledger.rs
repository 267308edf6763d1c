//! Per-node-pool configuration fingerprints for one pass.
//!
//! The ledger is built from the declared node-pool list, so it always holds
//! exactly one entry per declared pool. Steps read an entry to see whether a
//! fingerprint was already computed this pass, and replace it once they have
//! generated the pool's configuration. The fingerprints persisted by the
//! previous pass form the baseline that drift is measured against.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::NodePoolHash;

/// How a node pool's fingerprint compares to the previous pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FingerprintDrift {
    /// No step computed a fingerprint for the pool this pass.
    NotComputed,
    /// No fingerprint was persisted for the pool before.
    New { current: String },
    /// Same fingerprint as the previous pass.
    Unchanged,
    /// The generated configuration changed.
    Changed { previous: String, current: String },
}

impl FingerprintDrift {
    /// Whether the pool's workload must be rolled to pick up new config.
    pub fn requires_restart(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Drift of one named node pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolDrift {
    pub component: String,
    pub drift: FingerprintDrift,
}

/// Fingerprint set for the node pools of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintLedger {
    hashes: Vec<NodePoolHash>,
    baseline: Vec<NodePoolHash>,
}

impl FingerprintLedger {
    /// Create a ledger with one empty fingerprint per declared pool.
    ///
    /// Repeated names collapse into the first occurrence so keys stay unique.
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hashes = components
            .into_iter()
            .map(Into::into)
            .unique()
            .map(NodePoolHash::empty)
            .collect();
        Self {
            hashes,
            baseline: Vec::new(),
        }
    }

    /// Attach the fingerprints persisted by the previous pass.
    pub fn with_baseline(mut self, baseline: Vec<NodePoolHash>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Find the entry for a node pool.
    ///
    /// `None` means the pool is not part of this pass; an entry whose
    /// fingerprint is empty means it has not been computed yet.
    pub fn lookup(&self, component: &str) -> Option<&NodePoolHash> {
        self.hashes.iter().find(|h| h.component == component)
    }

    /// Replace the entry for `entry.component`, leaving the others untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredNodePool`] when the pool was not declared
    /// at construction; the ledger is left unchanged.
    pub fn replace(&mut self, entry: NodePoolHash) -> Result<()> {
        match self
            .hashes
            .iter_mut()
            .find(|h| h.component == entry.component)
        {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(Error::unregistered_node_pool(entry.component, "replace")),
        }
    }

    /// Fingerprint persisted for a pool by the previous pass, if any.
    pub fn previous(&self, component: &str) -> Option<&str> {
        self.baseline
            .iter()
            .find(|h| h.component == component && h.is_computed())
            .map(|h| h.config_hash.as_str())
    }

    /// Compare a pool's current fingerprint with the previous pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredNodePool`] for a pool outside this pass.
    pub fn drift(&self, component: &str) -> Result<FingerprintDrift> {
        let current = self
            .lookup(component)
            .ok_or_else(|| Error::unregistered_node_pool(component, "drift"))?;
        Ok(self.drift_of(current))
    }

    fn drift_of(&self, current: &NodePoolHash) -> FingerprintDrift {
        if !current.is_computed() {
            return FingerprintDrift::NotComputed;
        }
        match self.previous(&current.component) {
            None => FingerprintDrift::New {
                current: current.config_hash.clone(),
            },
            Some(previous) if previous == current.config_hash => FingerprintDrift::Unchanged,
            Some(previous) => FingerprintDrift::Changed {
                previous: previous.to_string(),
                current: current.config_hash.clone(),
            },
        }
    }

    /// Drift of every pool, in declaration order.
    pub fn drift_report(&self) -> Vec<NodePoolDrift> {
        self.hashes
            .iter()
            .map(|h| NodePoolDrift {
                component: h.component.clone(),
                drift: self.drift_of(h),
            })
            .collect()
    }

    /// Fingerprints to persist for the next pass.
    ///
    /// Pools not computed this pass keep their previous fingerprint; pools
    /// with neither are left out.
    pub fn snapshot(&self) -> Vec<NodePoolHash> {
        self.hashes
            .iter()
            .filter_map(|h| {
                if h.is_computed() {
                    Some(h.clone())
                } else {
                    self.previous(&h.component)
                        .map(|prev| NodePoolHash::new(&h.component, prev))
                }
            })
            .collect()
    }

    /// All entries, in declaration order.
    pub fn entries(&self) -> &[NodePoolHash] {
        &self.hashes
    }

    /// Number of registered pools.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether no pools are registered.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ledger_xy() -> FingerprintLedger {
        FingerprintLedger::new(["X", "Y"])
    }

    #[test]
    fn test_new_registers_empty_fingerprints() {
        let ledger = ledger_xy();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.entries().iter().all(|h| !h.is_computed()));
    }

    #[test]
    fn test_new_collapses_duplicate_names() {
        let ledger = FingerprintLedger::new(["master", "data", "master"]);
        let names: Vec<&str> = ledger.entries().iter().map(|h| h.component.as_str()).collect();
        assert_eq!(names, vec!["master", "data"]);
    }

    #[test]
    fn test_lookup_distinguishes_missing_from_not_computed() {
        let ledger = ledger_xy();
        assert_eq!(ledger.lookup("X"), Some(&NodePoolHash::empty("X")));
        assert_eq!(ledger.lookup("Z"), None);
    }

    #[test]
    fn test_replace_substitutes_only_matching_entry() {
        let mut ledger = ledger_xy();

        assert!(ledger.replace(NodePoolHash::new("X", "h1")).is_ok());
        assert_eq!(
            ledger.entries(),
            &[NodePoolHash::new("X", "h1"), NodePoolHash::empty("Y")]
        );

        assert!(ledger.replace(NodePoolHash::new("X", "h2")).is_ok());
        assert_eq!(
            ledger.entries(),
            &[NodePoolHash::new("X", "h2"), NodePoolHash::empty("Y")]
        );
    }

    #[test]
    fn test_replace_unregistered_is_an_error_and_changes_nothing() {
        let mut ledger = ledger_xy();
        let before = ledger.clone();

        let result = ledger.replace(NodePoolHash::new("Z", "h1"));

        assert_eq!(result, Err(Error::unregistered_node_pool("Z", "replace")));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_drift_states() {
        let mut ledger = FingerprintLedger::new(["master", "data", "ingest", "ml"]).with_baseline(
            vec![
                NodePoolHash::new("master", "h1"),
                NodePoolHash::new("data", "h2"),
                NodePoolHash::new("ml", "h9"),
            ],
        );
        let _ = ledger.replace(NodePoolHash::new("master", "h1"));
        let _ = ledger.replace(NodePoolHash::new("data", "h3"));
        let _ = ledger.replace(NodePoolHash::new("ingest", "h4"));

        assert_eq!(ledger.drift("master"), Ok(FingerprintDrift::Unchanged));
        assert_eq!(
            ledger.drift("data"),
            Ok(FingerprintDrift::Changed {
                previous: "h2".into(),
                current: "h3".into()
            })
        );
        assert_eq!(
            ledger.drift("ingest"),
            Ok(FingerprintDrift::New {
                current: "h4".into()
            })
        );
        assert_eq!(ledger.drift("ml"), Ok(FingerprintDrift::NotComputed));
        assert!(ledger.drift("coordinating").is_err());
    }

    #[test]
    fn test_empty_baseline_entry_counts_as_absent() {
        let mut ledger =
            FingerprintLedger::new(["data"]).with_baseline(vec![NodePoolHash::empty("data")]);
        let _ = ledger.replace(NodePoolHash::new("data", "h1"));
        assert_eq!(
            ledger.drift("data"),
            Ok(FingerprintDrift::New {
                current: "h1".into()
            })
        );
    }

    #[test]
    fn test_snapshot_keeps_previous_for_uncomputed_pools() {
        let mut ledger = FingerprintLedger::new(["master", "data", "ingest"])
            .with_baseline(vec![NodePoolHash::new("data", "h2")]);
        let _ = ledger.replace(NodePoolHash::new("master", "h1"));

        assert_eq!(
            ledger.snapshot(),
            vec![NodePoolHash::new("master", "h1"), NodePoolHash::new("data", "h2")]
        );
    }

    #[test]
    fn test_snapshot_drops_pools_removed_from_declaration() {
        let ledger = FingerprintLedger::new(["master"])
            .with_baseline(vec![NodePoolHash::new("retired", "h0")]);
        assert!(ledger.snapshot().is_empty());
    }

    proptest! {
        /// Replacing one pool never disturbs the order or content of the others.
        #[test]
        fn prop_replace_preserves_other_entries(
            names in proptest::collection::hash_set("[a-z]{1,6}", 1..8),
            pick in any::<prop::sample::Index>(),
            hash in "[0-9a-f]{8}",
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let target = pick.get(&names).clone();
            let mut ledger = FingerprintLedger::new(names.clone());

            prop_assert!(ledger.replace(NodePoolHash::new(&target, &hash)).is_ok());

            let order: Vec<&str> = ledger.entries().iter().map(|h| h.component.as_str()).collect();
            prop_assert_eq!(order, names.iter().map(String::as_str).collect::<Vec<_>>());
            for entry in ledger.entries() {
                if entry.component == target {
                    prop_assert_eq!(&entry.config_hash, &hash);
                } else {
                    prop_assert!(!entry.is_computed());
                }
            }
        }
    }
}
