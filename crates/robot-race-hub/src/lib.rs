//! Session hub for Robot Race.
//!
//! The hub owns every session on this instance and every connection
//! watching one. Client actions go through it; each state change is
//! turned into a full snapshot and fanned out.
//!
//! # Key types
//!
//! - [`Hub`]: session registry, broadcast fan-out, countdown tickers,
//!   replication subscriber
//! - [`Connection`]: a participant's attachment; yields encoded snapshots
//! - [`HubConfig`]: buffer sizes, countdown interval, cache TTL
//!
//! # Broadcast path
//!
//! ```text
//! action ──→ Session (locked) ──→ snapshot ──→ local connections (try_send)
//!                                     │
//!                                     ├──→ cache  game_state:<id>
//!                                     └──→ publish game:<id> ──→ other instances
//! ```
//!
//! A connection whose buffer is full when a snapshot arrives is detached
//! on the spot; a slow reader never delays anyone else.
//!
//! Local fan-out happens first. Cache writes and publishes for a session
//! then go out one at a time, newest snapshot only, so the cache never
//! ends up older than what local connections were sent. Once a session is
//! removed nothing more is written for it, and this instance will not
//! rehydrate it from a stale cache entry.

mod config;
mod connection;
mod countdown;
mod error;
mod hub;

pub use config::HubConfig;
pub use connection::{Connection, ConnectionId, Frame};
pub use error::HubError;
pub use hub::{Hub, cache_key, channel_for};
