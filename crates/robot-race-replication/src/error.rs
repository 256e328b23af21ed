//! Error types for the replication layer.

/// Errors from a replication backend.
///
/// The hub treats every one of these as best-effort: it logs them and
/// carries on with the local operation.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    /// The broker rejected a command or the connection to it failed.
    #[cfg(feature = "redis")]
    #[error("broker error: {0}")]
    Broker(#[from] redis::RedisError),

    /// The broker could not be reached at startup.
    #[error("replication unavailable: {0}")]
    Unavailable(String),

    /// A subscription could not be set up.
    #[error("subscription failed: {0}")]
    Subscription(String),
}
