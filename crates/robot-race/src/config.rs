//! Server configuration.

use std::str::FromStr;
use std::time::Duration;

use robot_race_hub::HubConfig;
use robot_race_replication::ReplicationConfig;
use robot_race_session::SessionConfig;

/// Everything a [`RaceServer`](crate::RaceServer) needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// How long a new connection has to send its handshake message.
    pub handshake_timeout: Duration,

    /// Idle time after which the server pings a connection.
    pub keepalive_interval: Duration,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,

    /// Defaults for new sessions. Creators may override some fields.
    pub session: SessionConfig,

    pub hub: HubConfig,

    pub replication: ReplicationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(54),
            idle_timeout: Duration::from_secs(60),
            session: SessionConfig::default(),
            hub: HubConfig::default(),
            replication: ReplicationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `ROBOT_RACE_*` environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `ROBOT_RACE_ADDR` | `bind_addr` |
    /// | `ROBOT_RACE_REDIS_URL` | `replication.url`, and enables replication |
    /// | `ROBOT_RACE_TARGET_SCORE` | `session.target_score` |
    /// | `ROBOT_RACE_MAX_PARTICIPANTS` | `session.max_participants` |
    /// | `ROBOT_RACE_COUNTDOWN` | `session.countdown` |
    ///
    /// A value that doesn't parse is logged and the default kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("ROBOT_RACE_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(url) = lookup("ROBOT_RACE_REDIS_URL") {
            config.replication = ReplicationConfig {
                subscription_buffer: config.replication.subscription_buffer,
                ..ReplicationConfig::with_url(url)
            };
        }
        parse_into(&lookup, "ROBOT_RACE_TARGET_SCORE", &mut config.session.target_score);
        parse_into(
            &lookup,
            "ROBOT_RACE_MAX_PARTICIPANTS",
            &mut config.session.max_participants,
        );
        parse_into(&lookup, "ROBOT_RACE_COUNTDOWN", &mut config.session.countdown);

        config.session = config.session.validated();
        config
    }

    /// Sets the address to bind to.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }
}

fn parse_into<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable setting"),
    }
}
