//! Error types for the session layer.

use robot_race_protocol::SessionId;

/// Errors a session's own operations can report.
///
/// Both are recoverable: the caller tells the would-be participant and
/// carries on. Everything else a session does is either a state change or
/// a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A join was attempted after the race left Setup.
    #[error("session {0} is already in progress")]
    SessionInProgress(SessionId),

    /// A join was attempted while every participant slot is taken.
    #[error("session {session_id} is full ({max} participants)")]
    SessionFull { session_id: SessionId, max: usize },
}
