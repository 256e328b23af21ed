//! Error types for the protocol layer.
//!
//! Each crate in Robot Race defines its own error enum. A `ProtocolError`
//! always means the problem is in turning bytes into messages (or back),
//! never in game rules or networking.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// payload whose shape doesn't match its `type`.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but is not one we understand: an unknown
    /// `type`, a missing payload, or an identifier that isn't a UUID.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
