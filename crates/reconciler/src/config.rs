//! Key/value accumulators for generated configuration.
//!
//! Several steps of a pass contribute configuration for the same service and
//! may legitimately emit overlapping defaults. The aggregator keeps the last
//! value written for each key and tells the caller when it overwrote one.

use std::collections::BTreeMap;
use std::fmt;

/// Which service a configuration bag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigScope {
    /// The search service itself.
    Service,
    /// The companion dashboards service.
    Dashboards,
}

impl ConfigScope {
    /// Human-readable label used in diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Service => "opensearch",
            Self::Dashboards => "dashboards",
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Last-writer-wins configuration bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAggregator {
    scope: ConfigScope,
    entries: BTreeMap<String, String>,
}

impl ConfigAggregator {
    /// Create an empty aggregator.
    pub fn new(scope: ConfigScope) -> Self {
        Self {
            scope,
            entries: BTreeMap::new(),
        }
    }

    /// Insert a value, returning the value it overwrote.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Current value of a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// All entries, sorted by key.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// The scope this aggregator collects for.
    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys were contributed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the aggregator, yielding its entries.
    pub fn into_entries(self) -> BTreeMap<String, String> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_reports_overwrite() {
        let mut agg = ConfigAggregator::new(ConfigScope::Service);
        assert_eq!(agg.insert("k", "v1"), None);
        assert_eq!(agg.insert("k", "v2"), Some("v1".to_string()));
        assert_eq!(agg.get("k"), Some("v2"));
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_scopes_are_labelled() {
        assert_eq!(ConfigScope::Service.to_string(), "opensearch");
        assert_eq!(
            ConfigAggregator::new(ConfigScope::Dashboards).scope(),
            ConfigScope::Dashboards
        );
    }

    #[test]
    fn test_entries_are_sorted() {
        let mut agg = ConfigAggregator::new(ConfigScope::Service);
        agg.insert("b", "2");
        agg.insert("a", "1");
        let keys: Vec<&String> = agg.entries().keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
