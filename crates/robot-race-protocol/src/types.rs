//! Core protocol types for Robot Race's wire format.
//!
//! Everything in this module travels "on the wire": it is serialized to
//! JSON, sent over a WebSocket (or through the replication broker), and
//! deserialized on the other side.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a session (one race and its scoreboard).
///
/// Newtype over a v4 UUID so a `ParticipantId` can never be passed where a
/// `SessionId` is expected. `#[serde(transparent)]` keeps the JSON form a
/// plain string: `"5f0c…"`, not `{"0": "5f0c…"}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Displays as the bare hyphenated UUID. Replication channel names and
/// cache keys are built from this form, so it must stay stable.
impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|e| {
            ProtocolError::InvalidMessage(format!("bad session id `{s}`: {e}"))
        })
    }
}

/// A unique identifier for a participant, generated when they join.
///
/// Independent of any connection: a participant can attach, drop, and
/// re-attach without changing identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|e| {
            ProtocolError::InvalidMessage(format!("bad participant id `{s}`: {e}"))
        })
    }
}

// ---------------------------------------------------------------------------
// Inbound (client → server)
// ---------------------------------------------------------------------------

/// The raw shape of every inbound message: `{"type": ..., "payload": ...}`.
///
/// We decode into this loose frame first and only then interpret `type`.
/// That way an unknown type, or a payload of `{}` on a message that takes
/// none, is a recoverable [`ProtocolError`] instead of a serde mismatch
/// buried in an enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// The message type, e.g. `"score_point"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Type-specific payload. Optional: actions carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// An in-race action, always attributed to the sending connection's
/// participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerAction {
    /// Move the sender's robot one step.
    ScorePoint,
    /// Begin the pre-race countdown. Privileged participants only.
    StartCountdown,
    /// Reset a finished race for another round. Privileged participants only.
    PlayAgain,
}

impl PlayerAction {
    /// The wire `type` string for this action.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScorePoint => "score_point",
            Self::StartCountdown => "start_countdown",
            Self::PlayAgain => "play_again",
        }
    }

    /// Whether only the privileged participant may perform this action.
    pub fn requires_privilege(&self) -> bool {
        matches!(self, Self::StartCountdown | Self::PlayAgain)
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Optional per-session overrides a creator may send. Any field left out
/// falls back to the server's configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown: Option<u32>,
}

/// Payload of `create_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Display name of the creator, who becomes the first participant.
    pub name: String,
    #[serde(default)]
    pub config: SessionOverrides,
}

/// Payload of `join_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSessionRequest {
    pub session_id: SessionId,
    pub name: String,
}

/// Payload of `resume_session`: re-attach as an existing participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeSessionRequest {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
}

/// A fully interpreted inbound message.
///
/// The first three variants are only valid as a connection's opening
/// handshake; `Action` is only valid after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    CreateSession(CreateSessionRequest),
    JoinSession(JoinSessionRequest),
    ResumeSession(ResumeSessionRequest),
    Action(PlayerAction),
}

impl ClientMessage {
    /// Interprets a raw frame.
    ///
    /// # Errors
    /// - [`ProtocolError::InvalidMessage`] for an unknown `type` or a
    ///   missing payload on a message that needs one.
    /// - [`ProtocolError::Decode`] if the payload has the wrong shape.
    pub fn from_frame(frame: InboundFrame) -> Result<Self, ProtocolError> {
        let InboundFrame { kind, payload } = frame;
        match kind.as_str() {
            "score_point" => Ok(Self::Action(PlayerAction::ScorePoint)),
            "start_countdown" => Ok(Self::Action(PlayerAction::StartCountdown)),
            "play_again" => Ok(Self::Action(PlayerAction::PlayAgain)),
            "create_session" => payload_as(&kind, payload).map(Self::CreateSession),
            "join_session" => payload_as(&kind, payload).map(Self::JoinSession),
            "resume_session" => payload_as(&kind, payload).map(Self::ResumeSession),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown message type `{other}`"
            ))),
        }
    }
}

fn payload_as<T: DeserializeOwned>(
    kind: &str,
    payload: Option<serde_json::Value>,
) -> Result<T, ProtocolError> {
    let payload = payload.ok_or_else(|| {
        ProtocolError::InvalidMessage(format!("`{kind}` requires a payload"))
    })?;
    serde_json::from_value(payload).map_err(ProtocolError::Decode)
}

// ---------------------------------------------------------------------------
// Outbound (server → client)
// ---------------------------------------------------------------------------

/// Messages the server sends to clients.
///
/// Generic over the snapshot type so this crate stays below the session
/// layer; the hub instantiates it with `SessionSnapshot`.
///
/// `#[serde(tag = "type", content = "payload")]` produces the adjacently
/// tagged shape the browser expects:
/// `{"type": "game_update", "payload": {"session": {...}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage<S> {
    /// Full state of the session. Sent on every state-affecting mutation
    /// and once when a connection attaches.
    GameUpdate { session: S },

    /// Handshake accepted; tells the client who it is.
    Joined {
        session_id: SessionId,
        participant_id: ParticipantId,
        privileged: bool,
    },

    /// Handshake rejected or request failed.
    Error { message: String },
}

// =========================================================================
// Tests
// =========================================================================
