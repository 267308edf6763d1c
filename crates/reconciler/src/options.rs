//! Construction-time options of a [`Reconciler`](crate::Reconciler).

/// Optional settings that parameterize the collaborators of a pass.
///
/// Neither setting changes what the pass computes in memory: with status
/// writes disabled the aggregation and merge logic still runs exactly as it
/// would otherwise, it just is not flushed to the store.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerOptions {
    /// Preconfigured HTTP client that component steps use to reach the
    /// managed cluster's admin API.
    ///
    /// Default: `None`, steps build their own client.
    pub transport: Option<reqwest::Client>,

    /// Whether component statuses and fingerprints are written to the
    /// status store.
    ///
    /// Default: `None`, which means enabled.
    pub update_status: Option<bool>,
}

impl ReconcilerOptions {
    /// Options with every setting at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the admin API transport.
    #[must_use]
    pub fn with_transport(mut self, client: reqwest::Client) -> Self {
        self.transport = Some(client);
        self
    }

    /// Enable or disable status writes.
    #[must_use]
    pub fn with_update_status(mut self, enabled: bool) -> Self {
        self.update_status = Some(enabled);
        self
    }

    /// Whether status writes are enabled.
    pub fn should_update_status(&self) -> bool {
        self.update_status.unwrap_or(true)
    }

    /// The transport override, if any.
    pub fn transport(&self) -> Option<&reqwest::Client> {
        self.transport.as_ref()
    }
}
