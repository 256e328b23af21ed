//! The hub's side of an attached connection.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use robot_race_protocol::{ParticipantId, SessionId};
use tokio::sync::mpsc;

/// One encoded server message, shared by every connection it goes to.
pub type Frame = Arc<[u8]>;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-attachment identifier. Unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An attachment returned by [`Hub::attach`](crate::Hub::attach).
///
/// Yields every snapshot broadcast for its session, starting with the one
/// current at attach time. The stream ends once the hub detaches the
/// connection, whether by request or because it fell behind.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    session_id: SessionId,
    participant_id: ParticipantId,
    outbound: mpsc::Receiver<Frame>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        session_id: SessionId,
        participant_id: ParticipantId,
        outbound: mpsc::Receiver<Frame>,
    ) -> Self {
        Self {
            id,
            session_id,
            participant_id,
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    /// Waits for the next frame. `None` once detached and drained.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.outbound.recv().await
    }

    /// Takes a frame if one is already buffered.
    pub fn try_next_frame(&mut self) -> Option<Frame> {
        self.outbound.try_recv().ok()
    }
}
