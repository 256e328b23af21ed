//! `RaceServer` builder and accept loop.
//!
//! This is the entry point for running a Robot Race server. It ties
//! together all the layers: transport → protocol → hub → session, with
//! replication on the side.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use robot_race_hub::{Hub, HubConfig};
use robot_race_protocol::JsonCodec;
use robot_race_replication::{ReplicationBackend, ReplicationConfig};
use robot_race_session::SessionConfig;
use robot_race_transport::{PendingConnection, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{RaceError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) hub: Arc<Hub>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Robot Race server.
///
/// # Example
///
/// ```rust,no_run
/// use robot_race::RaceServer;
///
/// # async fn start() -> Result<(), robot_race::RaceError> {
/// let server = RaceServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RaceServerBuilder {
    config: ServerConfig,
}

impl RaceServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration, e.g. with [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the defaults for new sessions.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the hub configuration.
    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.config.hub = config;
        self
    }

    /// Sets the replication configuration.
    pub fn replication(mut self, config: ReplicationConfig) -> Self {
        self.config.replication = config;
        self
    }

    /// Connects replication, creates the hub, and binds the listener.
    ///
    /// An unreachable broker is not an error: the server starts standalone.
    pub async fn build(self) -> Result<RaceServer, RaceError> {
        let replication = ReplicationBackend::connect(&self.config.replication).await;
        let backend = replication.kind();
        let hub = Hub::new(self.config.hub.clone(), replication);
        hub.start_replication().await;
        self.build_with_hub(hub, backend).await
    }

    /// Like [`build`](Self::build), but serves an existing hub. Lets
    /// several servers in one process share a broker or a hub.
    pub async fn build_with(self, hub: Arc<Hub>) -> Result<RaceServer, RaceError> {
        let backend = hub.replication().kind();
        hub.start_replication().await;
        self.build_with_hub(hub, backend).await
    }

    async fn build_with_hub(self, hub: Arc<Hub>, backend: &str) -> Result<RaceServer, RaceError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_upgrade_timeout(self.config.handshake_timeout);

        tracing::info!(
            addr = %self.config.bind_addr,
            replication = backend,
            instance_id = %hub.instance_id(),
            "server built"
        );

        let state = Arc::new(ServerState {
            hub,
            codec: JsonCodec,
            config: self.config,
        });
        Ok(RaceServer { transport, state })
    }
}

/// A bound Robot Race server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RaceServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl RaceServer {
    /// Creates a new builder.
    pub fn builder() -> RaceServerBuilder {
        RaceServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RaceError> {
        Ok(self.transport.local_addr()?)
    }

    /// The hub behind this server.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.state.hub
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RaceError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Each accepted connection gets its own task, which runs the
    /// WebSocket upgrade and then the handler; a client stalling in the
    /// upgrade never delays the next accept. Connections already running
    /// are left to finish on their own.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), RaceError> {
        tracing::info!("Robot Race server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let peer_addr = pending.peer_addr();
                            let conn = match pending.upgrade().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(%peer_addr, error = %e, "upgrade failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }
    }
}
