//! Cross-instance replication for Robot Race.
//!
//! Lets several stateless server instances serve the same sessions: every
//! snapshot one instance broadcasts is published on a per-session channel
//! for the others, and cached under a per-session key so an instance that
//! has never seen a session can rehydrate it on first request.
//!
//! # Backends
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  Replication (trait)                         │
//! │  DisabledReplication │ MemoryReplication │ RedisReplication  │
//! │  single instance     │ one process       │ shared broker     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`ReplicationBackend`] picks one at startup from a
//! [`ReplicationConfig`]. A broker that can't be reached is not fatal: the
//! backend falls back to Disabled and the instance runs standalone.

mod backend;
mod config;
mod disabled;
mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis_backend;

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use backend::ReplicationBackend;
pub use config::ReplicationConfig;
pub use disabled::DisabledReplication;
pub use error::ReplicationError;
pub use memory::MemoryReplication;
#[cfg(feature = "redis")]
pub use redis_backend::RedisReplication;

/// The replication capability set.
///
/// Methods return `Send` futures so a hub generic over the backend can
/// call them from spawned tasks.
pub trait Replication: Send + Sync + 'static {
    /// `false` only for the disabled backend.
    fn is_enabled(&self) -> bool;

    /// Sends `payload` to every subscriber whose pattern matches `channel`,
    /// in every process.
    fn publish(
        &self,
        channel: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), ReplicationError>> + Send;

    /// Subscribes to every channel matching `pattern`. A trailing `*`
    /// matches any suffix.
    fn subscribe(
        &self,
        pattern: &str,
    ) -> impl Future<Output = Result<Subscription, ReplicationError>> + Send;

    /// Stores `value` under `key`, expiring after `ttl`.
    fn set_snapshot(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> impl Future<Output = Result<(), ReplicationError>> + Send;

    /// Reads `key`. `Ok(None)` if it was never stored or has expired.
    fn get_snapshot(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, ReplicationError>> + Send;

    /// Removes `key` if present.
    fn delete_snapshot(&self, key: &str)
    -> impl Future<Output = Result<(), ReplicationError>> + Send;
}

/// One message received on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedMessage {
    /// The concrete channel it was published on (never the pattern).
    pub channel: String,
    pub payload: Vec<u8>,
}

/// A live pattern subscription.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<ReplicatedMessage>,
    /// Forwarding task for backends that pump from a broker connection.
    forwarder: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::Receiver<ReplicatedMessage>) -> Self {
        Self {
            rx,
            forwarder: None,
        }
    }

    pub(crate) fn with_forwarder(
        rx: mpsc::Receiver<ReplicatedMessage>,
        forwarder: JoinHandle<()>,
    ) -> Self {
        Self {
            rx,
            forwarder: Some(forwarder),
        }
    }

    /// A subscription that never yields anything.
    pub(crate) fn closed() -> Self {
        let (_, rx) = mpsc::channel(1);
        Self::new(rx)
    }

    /// Waits for the next message. `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<ReplicatedMessage> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

/// Broker-style channel matching: exact, or prefix when the pattern ends
/// in `*`.
pub(crate) fn pattern_matches(pattern: &str, channel: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => channel.starts_with(prefix),
        None => pattern == channel,
    }
}
