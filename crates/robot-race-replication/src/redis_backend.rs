//! Redis-backed replication.
//!
//! Commands go over one multiplexed connection (cheap to clone per call).
//! Each subscription opens its own pub/sub connection and a task that
//! forwards its messages into the [`Subscription`] channel.

use std::time::Duration;

use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{ReplicatedMessage, Replication, ReplicationError, Subscription};

/// Enabled replication through a Redis server.
#[derive(Clone)]
pub struct RedisReplication {
    client: redis::Client,
    conn: MultiplexedConnection,
    buffer: usize,
}

impl RedisReplication {
    /// Connects to `url` and verifies the server answers a `PING`.
    ///
    /// # Errors
    /// [`ReplicationError::Unavailable`] if the URL is invalid or the
    /// server can't be reached.
    pub async fn connect(url: &str, buffer: usize) -> Result<Self, ReplicationError> {
        let unavailable = |e: redis::RedisError| ReplicationError::Unavailable(format!("{url}: {e}"));

        let client = redis::Client::open(url).map_err(unavailable)?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        info!(%url, "connected to redis");
        Ok(Self {
            client,
            conn,
            buffer: buffer.max(1),
        })
    }
}

impl std::fmt::Debug for RedisReplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisReplication")
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl Replication for RedisReplication {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), ReplicationError> {
        let mut conn = self.conn.clone();
        let _: () = conn.publish(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, ReplicationError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe(pattern).await?;

        let (tx, rx) = mpsc::channel(self.buffer);
        let pattern = pattern.to_string();
        let forwarder = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let message = ReplicatedMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload: msg.get_payload_bytes().to_vec(),
                };
                if tx.send(message).await.is_err() {
                    debug!(%pattern, "subscription dropped, stopping forwarder");
                    return;
                }
            }
            warn!(%pattern, "redis subscription stream ended");
        });

        Ok(Subscription::with_forwarder(rx, forwarder))
    }

    async fn set_snapshot(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), ReplicationError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn get_snapshot(&self, key: &str) -> Result<Option<Vec<u8>>, ReplicationError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete_snapshot(&self, key: &str) -> Result<(), ReplicationError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
