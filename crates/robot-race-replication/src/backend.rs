//! Runtime-selected backend.

use std::time::Duration;

use tracing::{info, warn};

#[cfg(feature = "redis")]
use crate::RedisReplication;
use crate::{
    DisabledReplication, MemoryReplication, Replication, ReplicationConfig, ReplicationError,
    Subscription,
};

/// Whichever backend this instance ended up with.
///
/// The hub is generic over [`Replication`]; servers use this enum so the
/// choice can be made from configuration at startup.
#[derive(Debug, Clone)]
pub enum ReplicationBackend {
    Disabled(DisabledReplication),
    Memory(MemoryReplication),
    #[cfg(feature = "redis")]
    Redis(RedisReplication),
}

impl ReplicationBackend {
    /// Builds the backend described by `config`.
    ///
    /// Never fails: an unreachable broker is logged and the instance runs
    /// standalone with [`DisabledReplication`].
    pub async fn connect(config: &ReplicationConfig) -> Self {
        if !config.enabled {
            info!("replication disabled, running standalone");
            return Self::Disabled(DisabledReplication);
        }

        #[cfg(feature = "redis")]
        match RedisReplication::connect(&config.url, config.subscription_buffer).await {
            Ok(redis) => {
                info!(url = %config.url, "replication enabled");
                return Self::Redis(redis);
            }
            Err(e) => {
                warn!(error = %e, "replication broker unreachable, running standalone");
            }
        }

        #[cfg(not(feature = "redis"))]
        warn!(url = %config.url, "built without redis support, running standalone");

        Self::Disabled(DisabledReplication)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled(_) => "disabled",
            Self::Memory(_) => "memory",
            #[cfg(feature = "redis")]
            Self::Redis(_) => "redis",
        }
    }
}

impl Default for ReplicationBackend {
    fn default() -> Self {
        Self::Disabled(DisabledReplication)
    }
}

impl From<MemoryReplication> for ReplicationBackend {
    fn from(memory: MemoryReplication) -> Self {
        Self::Memory(memory)
    }
}

impl Replication for ReplicationBackend {
    fn is_enabled(&self) -> bool {
        match self {
            Self::Disabled(r) => r.is_enabled(),
            Self::Memory(r) => r.is_enabled(),
            #[cfg(feature = "redis")]
            Self::Redis(r) => r.is_enabled(),
        }
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), ReplicationError> {
        match self {
            Self::Disabled(r) => r.publish(channel, payload).await,
            Self::Memory(r) => r.publish(channel, payload).await,
            #[cfg(feature = "redis")]
            Self::Redis(r) => r.publish(channel, payload).await,
        }
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, ReplicationError> {
        match self {
            Self::Disabled(r) => r.subscribe(pattern).await,
            Self::Memory(r) => r.subscribe(pattern).await,
            #[cfg(feature = "redis")]
            Self::Redis(r) => r.subscribe(pattern).await,
        }
    }

    async fn set_snapshot(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), ReplicationError> {
        match self {
            Self::Disabled(r) => r.set_snapshot(key, value, ttl).await,
            Self::Memory(r) => r.set_snapshot(key, value, ttl).await,
            #[cfg(feature = "redis")]
            Self::Redis(r) => r.set_snapshot(key, value, ttl).await,
        }
    }

    async fn get_snapshot(&self, key: &str) -> Result<Option<Vec<u8>>, ReplicationError> {
        match self {
            Self::Disabled(r) => r.get_snapshot(key).await,
            Self::Memory(r) => r.get_snapshot(key).await,
            #[cfg(feature = "redis")]
            Self::Redis(r) => r.get_snapshot(key).await,
        }
    }

    async fn delete_snapshot(&self, key: &str) -> Result<(), ReplicationError> {
        match self {
            Self::Disabled(r) => r.delete_snapshot(key).await,
            Self::Memory(r) => r.delete_snapshot(key).await,
            #[cfg(feature = "redis")]
            Self::Redis(r) => r.delete_snapshot(key).await,
        }
    }
}
