//! Error types for the hub.

use robot_race_protocol::{ParticipantId, SessionId};
use robot_race_session::SessionError;

/// Errors that can occur during hub operations.
///
/// Replication failures never show up here: the hub logs them and
/// carries on with the local operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// No such session locally, and none could be rehydrated.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The participant never joined this session.
    #[error("participant {participant_id} not in session {session_id}")]
    ParticipantNotFound {
        session_id: SessionId,
        participant_id: ParticipantId,
    },

    /// The session refused the operation (full, or already running).
    #[error(transparent)]
    Session(#[from] SessionError),
}
