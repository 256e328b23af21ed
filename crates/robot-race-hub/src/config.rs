//! Hub configuration.

use std::time::Duration;

/// Settings shared by every session a hub manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Frames buffered per connection. A connection whose buffer is full
    /// when a snapshot arrives is detached.
    pub outbound_capacity: usize,

    /// Time between countdown ticks.
    pub countdown_interval: Duration,

    /// How long a snapshot stays in the replication cache.
    pub snapshot_ttl: Duration,

    /// Random delay (0..max) before a countdown's first tick.
    pub tick_jitter: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            countdown_interval: Duration::from_secs(1),
            snapshot_ttl: Duration::from_secs(24 * 60 * 60),
            tick_jitter: Duration::ZERO,
        }
    }
}

impl HubConfig {
    /// Clamps values the hub can't work with.
    pub fn validated(mut self) -> Self {
        if self.outbound_capacity == 0 {
            tracing::warn!("outbound_capacity of 0 would detach every connection, using 1");
            self.outbound_capacity = 1;
        }
        self
    }
}
