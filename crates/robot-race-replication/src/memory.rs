//! In-process broker.
//!
//! Clones share one broker, so several hubs in the same process can be
//! wired together exactly as separate instances would be through a real
//! broker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    ReplicatedMessage, Replication, ReplicationError, Subscription, pattern_matches,
};

/// Default per-subscription buffer.
const DEFAULT_BUFFER: usize = 1024;

struct Subscriber {
    pattern: String,
    tx: mpsc::Sender<ReplicatedMessage>,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

#[derive(Default)]
struct Broker {
    subscribers: Vec<Subscriber>,
    store: HashMap<String, Entry>,
}

/// Enabled replication without an external broker.
#[derive(Clone)]
pub struct MemoryReplication {
    broker: Arc<Mutex<Broker>>,
    buffer: usize,
}

impl MemoryReplication {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// A broker whose subscriptions each buffer up to `buffer` messages.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            broker: Arc::new(Mutex::new(Broker::default())),
            buffer: buffer.max(1),
        }
    }

    /// Live subscriptions. Ended ones are pruned on the next publish.
    pub async fn subscriber_count(&self) -> usize {
        self.broker.lock().await.subscribers.len()
    }
}

impl Default for MemoryReplication {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryReplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryReplication")
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl Replication for MemoryReplication {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), ReplicationError> {
        let mut broker = self.broker.lock().await;
        broker.subscribers.retain(|sub| {
            if !pattern_matches(&sub.pattern, channel) {
                return !sub.tx.is_closed();
            }
            let message = ReplicatedMessage {
                channel: channel.to_string(),
                payload: payload.to_vec(),
            };
            match sub.tx.try_send(message) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%channel, pattern = %sub.pattern, "subscriber lagging, message dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(pattern = %sub.pattern, "pruning ended subscription");
                    false
                }
            }
        });
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, ReplicationError> {
        if pattern.is_empty() || pattern.trim_end_matches('*').contains('*') {
            return Err(ReplicationError::Subscription(format!(
                "unsupported pattern {pattern:?}: only a trailing '*' is allowed"
            )));
        }
        let (tx, rx) = mpsc::channel(self.buffer);
        self.broker.lock().await.subscribers.push(Subscriber {
            pattern: pattern.to_string(),
            tx,
        });
        Ok(Subscription::new(rx))
    }

    async fn set_snapshot(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), ReplicationError> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.broker.lock().await.store.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get_snapshot(&self, key: &str) -> Result<Option<Vec<u8>>, ReplicationError> {
        let mut broker = self.broker.lock().await;
        let expired = match broker.store.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
        };
        if expired {
            broker.store.remove(key);
        }
        Ok(None)
    }

    async fn delete_snapshot(&self, key: &str) -> Result<(), ReplicationError> {
        self.broker.lock().await.store.remove(key);
        Ok(())
    }
}
