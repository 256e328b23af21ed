//! The standalone backend.

use std::time::Duration;

use crate::{Replication, ReplicationError, Subscription};

/// Replication turned off. Publishing and storing do nothing, reads find
/// nothing, and subscriptions end immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledReplication;

impl Replication for DisabledReplication {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn publish(&self, _channel: &str, _payload: &[u8]) -> Result<(), ReplicationError> {
        Ok(())
    }

    async fn subscribe(&self, _pattern: &str) -> Result<Subscription, ReplicationError> {
        Ok(Subscription::closed())
    }

    async fn set_snapshot(
        &self,
        _key: &str,
        _value: &[u8],
        _ttl: Duration,
    ) -> Result<(), ReplicationError> {
        Ok(())
    }

    async fn get_snapshot(&self, _key: &str) -> Result<Option<Vec<u8>>, ReplicationError> {
        Ok(None)
    }

    async fn delete_snapshot(&self, _key: &str) -> Result<(), ReplicationError> {
        Ok(())
    }
}
