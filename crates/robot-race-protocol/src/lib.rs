//! Wire protocol for Robot Race.
//!
//! This crate defines the "language" that clients, servers, and peer
//! server instances speak:
//!
//! - **Types** ([`SessionId`], [`ParticipantId`], [`ClientMessage`],
//!   [`ServerMessage`]): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (messages) → Hub (sessions, fan-out)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientMessage, CreateSessionRequest, InboundFrame, JoinSessionRequest, ParticipantId,
    PlayerAction, ResumeSessionRequest, ServerMessage, SessionId, SessionOverrides,
};
