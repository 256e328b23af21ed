//! Replication configuration.

/// How (and whether) server instances share session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationConfig {
    /// Connect to the broker at `url`. When `false` the instance runs
    /// standalone.
    pub enabled: bool,

    /// Broker address.
    pub url: String,

    /// Buffered messages per subscription before the reader falls behind.
    pub subscription_buffer: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://127.0.0.1:6379".to_string(),
            subscription_buffer: 1024,
        }
    }
}

impl ReplicationConfig {
    /// An enabled config pointing at `url`.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            url: url.into(),
            ..Self::default()
        }
    }
}
