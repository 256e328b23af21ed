//! # Robot Race
//!
//! Server for a multiplayer robot race: players join a session over a
//! WebSocket, a privileged player starts a countdown, everyone races to
//! the target score, and every change is pushed to every participant as a
//! full session snapshot.
//!
//! Several instances can serve the same sessions when replication is
//! enabled; see [`robot_race_replication`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use robot_race::{RaceServer, ServerConfig};
//!
//! # async fn start() -> Result<(), robot_race::RaceError> {
//! let server = RaceServer::builder()
//!     .config(ServerConfig::from_env())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::RaceError;
pub use server::{RaceServer, RaceServerBuilder};

/// Re-exports for embedding the server or writing clients against it.
pub mod prelude {
    pub use crate::{RaceError, RaceServer, RaceServerBuilder, ServerConfig};
    pub use robot_race_hub::{Hub, HubConfig, HubError};
    pub use robot_race_protocol::{
        ClientMessage, Codec, InboundFrame, JsonCodec, ParticipantId, PlayerAction,
        ServerMessage, SessionId, SessionOverrides,
    };
    pub use robot_race_replication::{MemoryReplication, ReplicationBackend, ReplicationConfig};
    pub use robot_race_session::{Participant, SessionConfig, SessionSnapshot, SessionState};
}
