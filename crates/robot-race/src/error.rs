//! Unified error type for the Robot Race server.

use robot_race_hub::HubError;
use robot_race_protocol::ProtocolError;
use robot_race_replication::ReplicationError;
use robot_race_session::SessionError;
use robot_race_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RaceError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session rule was violated (full, already started).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The hub rejected a request (unknown session or participant).
    #[error(transparent)]
    Hub(#[from] HubError),

    /// The replication backend failed.
    #[error(transparent)]
    Replication(#[from] ReplicationError),
}
