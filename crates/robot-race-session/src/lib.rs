//! Race session state for Robot Race.
//!
//! A session is one race room: the participants who joined it, their
//! scores, and the round state machine that takes them from setup through
//! a countdown into play and on to a result.
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub Layer (above)  ← owns sessions behind locks, broadcasts snapshots
//!     ↕
//! Session Layer (this crate)  ← rules of the race, pure and synchronous
//!     ↕
//! Protocol Layer (below)  ← provides SessionId, ParticipantId
//! ```
//!
//! Nothing here does I/O or spawns tasks. The hub decides when to tick
//! the countdown and who gets told about each change.

mod config;
mod error;
mod participant;
mod session;

pub use config::{SessionConfig, SessionState};
pub use error::SessionError;
pub use participant::{LeaderboardEntry, Participant};
pub use session::{Session, SessionSnapshot};
