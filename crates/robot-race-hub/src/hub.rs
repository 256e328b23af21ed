//! The session hub: registry, fan-out, and replication glue.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use robot_race_protocol::{
    Codec, JsonCodec, ParticipantId, PlayerAction, ServerMessage, SessionId,
};
use robot_race_replication::{ReplicatedMessage, Replication, ReplicationBackend};
use robot_race_session::{Participant, Session, SessionConfig, SessionSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::countdown;
use crate::{Connection, ConnectionId, Frame, HubConfig, HubError};

/// Pattern covering every session's replication channel.
const CHANNEL_PATTERN: &str = "game:*";

/// Replication channel for one session.
pub fn channel_for(session_id: SessionId) -> String {
    format!("game:{session_id}")
}

/// Snapshot cache key for one session.
pub fn cache_key(session_id: SessionId) -> String {
    format!("game_state:{session_id}")
}

/// What travels on a replication channel: a server message tagged with
/// the hub that published it.
#[derive(Debug, Serialize, Deserialize)]
struct ReplicationFrame<S> {
    origin: Uuid,
    message: ServerMessage<S>,
}

/// One session and the connections watching it.
///
/// Lock order is `connections`, then `session`, then `outbox`; `flush` is
/// only ever taken with none of those held, and `outbox` may be taken
/// under it. Holding `connections` across snapshot, encode, enqueue, and
/// the outbox hand-off makes every broadcast for the session land in every
/// buffer, and in the outbox, in the same order.
pub(crate) struct SessionSlot {
    pub(crate) session: Mutex<Session>,
    connections: Mutex<HashMap<ConnectionId, mpsc::Sender<Frame>>>,
    outbox: Mutex<Outbox>,
    /// Held while a snapshot is written to the cache and published.
    flush: Mutex<()>,
}

/// Snapshots waiting to leave for the broker.
#[derive(Default)]
struct Outbox {
    /// Newest snapshot not yet cached and published. A newer broadcast
    /// replaces it, so the broker never sees a session go backwards.
    pending: Option<SessionSnapshot>,
    /// Set by `remove_session`; nothing is cached or published after it.
    removed: bool,
}

impl SessionSlot {
    fn new(session: Session) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(session),
            connections: Mutex::new(HashMap::new()),
            outbox: Mutex::new(Outbox::default()),
            flush: Mutex::new(()),
        })
    }
}

#[derive(Default)]
struct Registry {
    slots: HashMap<SessionId, Arc<SessionSlot>>,
    /// Sessions removed here. Never rehydrated again, even if a stale
    /// copy is still cached.
    removed: HashSet<SessionId>,
}

/// Process-wide registry of sessions and their attached connections.
///
/// Create one per server with [`Hub::new`] and share the returned `Arc`
/// with every connection handler. Each session has its own locks, so
/// operations on different sessions never wait on each other beyond the
/// brief registry lookup.
pub struct Hub<R: Replication = ReplicationBackend> {
    /// Identifies this hub's publishes so it can skip its own echoes.
    instance_id: Uuid,
    config: HubConfig,
    replication: R,
    codec: JsonCodec,
    sessions: RwLock<Registry>,
    /// Running countdown tickers, at most one per session.
    pub(crate) countdowns: Mutex<HashMap<SessionId, JoinHandle<()>>>,
    subscriber: Mutex<Option<JoinHandle<()>>>,
}

impl<R: Replication> Hub<R> {
    pub fn new(config: HubConfig, replication: R) -> Arc<Self> {
        let instance_id = Uuid::new_v4();
        info!(
            %instance_id,
            replication = replication.is_enabled(),
            "hub created"
        );
        Arc::new(Self {
            instance_id,
            config: config.validated(),
            replication,
            codec: JsonCodec,
            sessions: RwLock::new(Registry::default()),
            countdowns: Mutex::new(HashMap::new()),
            subscriber: Mutex::new(None),
        })
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn replication(&self) -> &R {
        &self.replication
    }

    /// Starts relaying snapshots published by other instances to local
    /// connections. No-op with replication disabled or if already running.
    ///
    /// Returns `false` if the subscription could not be set up; the hub
    /// then keeps working as a standalone instance.
    pub async fn start_replication(self: &Arc<Self>) -> bool {
        if !self.replication.is_enabled() {
            debug!("replication disabled, no subscriber started");
            return true;
        }

        let mut subscriber = self.subscriber.lock().await;
        if subscriber.as_ref().is_some_and(|task| !task.is_finished()) {
            return true;
        }

        let mut subscription = match self.replication.subscribe(CHANNEL_PATTERN).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "replication subscribe failed, running standalone");
                return false;
            }
        };

        let hub = Arc::downgrade(self);
        *subscriber = Some(tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                let Some(hub) = hub.upgrade() else { break };
                hub.handle_replicated(&message).await;
            }
            debug!("replication subscriber stopped");
        }));
        info!(pattern = CHANNEL_PATTERN, "replication subscriber started");
        true
    }

    // -- Registry ----------------------------------------------------------

    /// Creates a session in Setup and caches its first snapshot.
    pub async fn create_session(&self, config: SessionConfig) -> SessionId {
        let session = Session::new(config);
        let session_id = session.id();
        let snapshot = session.snapshot();

        let slot = SessionSlot::new(session);
        // Taken before the slot is visible, so a broadcast racing in
        // behind us is written after this first snapshot.
        let flush = slot.flush.lock().await;
        self.sessions
            .write()
            .await
            .slots
            .insert(session_id, Arc::clone(&slot));
        info!(
            %session_id,
            target_score = snapshot.config.target_score,
            max_participants = snapshot.config.max_participants,
            "session created"
        );

        self.store_snapshot(&snapshot).await;
        drop(flush);
        session_id
    }

    /// Current snapshot of a session, rehydrating it from the replication
    /// cache if this instance has never seen it.
    pub async fn get_session(&self, session_id: SessionId) -> Result<SessionSnapshot, HubError> {
        let slot = self.slot(session_id).await?;
        let snapshot = slot.session.lock().await.snapshot();
        Ok(snapshot)
    }

    /// Tears a session down: drops its cache entry, stops its countdown,
    /// and detaches every connection. Returns `false` if it wasn't
    /// registered here.
    ///
    /// Removal is final on this instance: broadcasts still in flight are
    /// not cached or published, and the session is not rehydrated again.
    pub async fn remove_session(&self, session_id: SessionId) -> bool {
        let Some(slot) = self.local_slot(session_id).await else {
            return false;
        };

        {
            // Waits out a write already in progress.
            let _flush = slot.flush.lock().await;
            {
                let mut outbox = slot.outbox.lock().await;
                if outbox.removed {
                    return false;
                }
                outbox.removed = true;
                outbox.pending = None;
            }
            if let Err(e) = self.replication.delete_snapshot(&cache_key(session_id)).await {
                warn!(%session_id, error = %e, "failed to delete cached snapshot");
            }
        }

        {
            let mut registry = self.sessions.write().await;
            registry.slots.remove(&session_id);
            registry.removed.insert(session_id);
        }

        if let Some(task) = self.countdowns.lock().await.remove(&session_id) {
            task.abort();
        }
        let detached = {
            let mut connections = slot.connections.lock().await;
            let count = connections.len();
            connections.clear();
            count
        };

        info!(%session_id, detached, "session removed");
        true
    }

    /// Sessions registered on this instance.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.slots.len()
    }

    /// Connections attached to a session on this instance.
    pub async fn connection_count(&self, session_id: SessionId) -> usize {
        match self.local_slot(session_id).await {
            Some(slot) => slot.connections.lock().await.len(),
            None => 0,
        }
    }

    // -- Participants and connections --------------------------------------

    /// Joins a participant and broadcasts the new roster.
    pub async fn join_session(
        &self,
        session_id: SessionId,
        name: impl Into<String>,
    ) -> Result<Participant, HubError> {
        let slot = self.slot(session_id).await?;
        let participant = slot.session.lock().await.join(name)?.clone();
        self.broadcast_slot(session_id, &slot).await;
        Ok(participant)
    }

    /// Registers a connection for `participant_id` and queues the current
    /// snapshot on it.
    pub async fn attach(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
    ) -> Result<Connection, HubError> {
        let slot = self.slot(session_id).await?;
        let mut connections = slot.connections.lock().await;

        let snapshot = {
            let session = slot.session.lock().await;
            if session.participant(participant_id).is_none() {
                return Err(HubError::ParticipantNotFound {
                    session_id,
                    participant_id,
                });
            }
            session.snapshot()
        };

        let (tx, rx) = mpsc::channel(self.config.outbound_capacity);
        if let Some(frame) = self.encode_update(&snapshot) {
            // Fresh channel with capacity >= 1: cannot be full.
            let _ = tx.try_send(frame);
        }

        let conn_id = ConnectionId::next();
        connections.insert(conn_id, tx);
        info!(
            %session_id,
            %participant_id,
            %conn_id,
            connections = connections.len(),
            "connection attached"
        );
        Ok(Connection::new(conn_id, session_id, participant_id, rx))
    }

    /// Removes a connection from its session's fan-out set, closing its
    /// buffer. Returns `false` if it was already gone.
    pub async fn detach(&self, session_id: SessionId, conn_id: ConnectionId) -> bool {
        let Some(slot) = self.local_slot(session_id).await else {
            return false;
        };
        let removed = slot.connections.lock().await.remove(&conn_id).is_some();
        if removed {
            info!(%session_id, %conn_id, "connection detached");
        }
        removed
    }

    // -- Race operations ---------------------------------------------------

    /// Starts the countdown. Broadcasts, then spawns the ticker if the
    /// session actually left Setup. Returns whether it did.
    pub async fn start_countdown(self: &Arc<Self>, session_id: SessionId) -> Result<bool, HubError> {
        let slot = self.slot(session_id).await?;
        let started = slot.session.lock().await.start_countdown();
        self.broadcast_slot(session_id, &slot).await;
        if started {
            countdown::spawn(self, session_id).await;
        }
        Ok(started)
    }

    /// Scores a point. Broadcasts only if the score changed.
    pub async fn score_point(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
    ) -> Result<bool, HubError> {
        let slot = self.slot(session_id).await?;
        let changed = slot.session.lock().await.score_point(participant_id);
        if changed {
            self.broadcast_slot(session_id, &slot).await;
        }
        Ok(changed)
    }

    /// Resets a finished round. Always broadcasts.
    pub async fn reset_session(&self, session_id: SessionId) -> Result<bool, HubError> {
        let slot = self.slot(session_id).await?;
        let reset = slot.session.lock().await.reset();
        self.broadcast_slot(session_id, &slot).await;
        Ok(reset)
    }

    /// Applies a client action on behalf of `participant_id`.
    ///
    /// Actions that need privilege are silently ignored for everyone but
    /// the session's first participant.
    pub async fn handle_action(
        self: &Arc<Self>,
        session_id: SessionId,
        participant_id: ParticipantId,
        action: PlayerAction,
    ) -> Result<(), HubError> {
        if action.requires_privilege() {
            let slot = self.slot(session_id).await?;
            if !slot.session.lock().await.is_privileged(participant_id) {
                debug!(%session_id, %participant_id, %action, "unprivileged action ignored");
                return Ok(());
            }
        }

        match action {
            PlayerAction::ScorePoint => {
                self.score_point(session_id, participant_id).await?;
            }
            PlayerAction::StartCountdown => {
                self.start_countdown(session_id).await?;
            }
            PlayerAction::PlayAgain => {
                self.reset_session(session_id).await?;
            }
        }
        Ok(())
    }

    // -- Broadcast ---------------------------------------------------------

    /// Sends the session's current snapshot to every local connection,
    /// then refreshes the cache and publishes it for other instances.
    /// No-op for a session not registered here.
    ///
    /// Local delivery comes first and never waits on the broker. Cache
    /// writes and publishes for one session happen one at a time, in the
    /// order of the local delivery; a snapshot overtaken by a newer one
    /// before its turn is skipped rather than written late.
    pub async fn broadcast_snapshot(&self, session_id: SessionId) {
        if let Some(slot) = self.local_slot(session_id).await {
            self.broadcast_slot(session_id, &slot).await;
        }
    }

    pub(crate) async fn broadcast_slot(&self, session_id: SessionId, slot: &SessionSlot) {
        {
            let mut connections = slot.connections.lock().await;
            let snapshot = slot.session.lock().await.snapshot();
            let Some(frame) = self.encode_update(&snapshot) else {
                return;
            };
            fan_out(session_id, &mut connections, &frame);

            let mut outbox = slot.outbox.lock().await;
            if outbox.removed {
                return;
            }
            outbox.pending = Some(snapshot);
        }

        self.flush_slot(session_id, slot).await;
    }

    /// Writes the slot's newest pending snapshot to the cache and
    /// publishes it. Nothing to do if another broadcast already took it.
    async fn flush_slot(&self, session_id: SessionId, slot: &SessionSlot) {
        let _flush = slot.flush.lock().await;
        let pending = {
            let mut outbox = slot.outbox.lock().await;
            if outbox.removed { None } else { outbox.pending.take() }
        };
        let Some(snapshot) = pending else {
            trace!(%session_id, "snapshot already flushed by a later broadcast");
            return;
        };

        self.store_snapshot(&snapshot).await;

        let frame = ReplicationFrame {
            origin: self.instance_id,
            message: ServerMessage::GameUpdate { session: &snapshot },
        };
        match self.codec.encode(&frame) {
            Ok(payload) => {
                if let Err(e) = self.replication.publish(&channel_for(session_id), &payload).await {
                    warn!(%session_id, error = %e, "snapshot publish failed");
                }
            }
            Err(e) => error!(%session_id, error = %e, "failed to encode replication frame"),
        }
    }

    /// Applies a snapshot published by another instance: overwrite the
    /// local copy and fan it out here, without publishing it again.
    async fn handle_replicated(&self, message: &ReplicatedMessage) {
        let frame: ReplicationFrame<SessionSnapshot> = match self.codec.decode(&message.payload) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(channel = %message.channel, error = %e, "undecodable replication frame");
                return;
            }
        };
        if frame.origin == self.instance_id {
            trace!(channel = %message.channel, "own publish echoed back, skipping");
            return;
        }
        let ServerMessage::GameUpdate { session: snapshot } = frame.message else {
            return;
        };

        let session_id = snapshot.id;
        let Some(slot) = self.local_slot(session_id).await else {
            return;
        };

        let mut connections = slot.connections.lock().await;
        let Some(encoded) = self.encode_update(&snapshot) else {
            return;
        };
        *slot.session.lock().await = Session::from_snapshot(snapshot);
        fan_out(session_id, &mut connections, &encoded);
        debug!(%session_id, origin = %frame.origin, "applied replicated snapshot");
    }

    // -- Internals ---------------------------------------------------------

    pub(crate) async fn local_slot(&self, session_id: SessionId) -> Option<Arc<SessionSlot>> {
        self.sessions.read().await.slots.get(&session_id).cloned()
    }

    /// Local slot, or one rehydrated from the replication cache.
    async fn slot(&self, session_id: SessionId) -> Result<Arc<SessionSlot>, HubError> {
        {
            let registry = self.sessions.read().await;
            if let Some(slot) = registry.slots.get(&session_id) {
                return Ok(Arc::clone(slot));
            }
            if registry.removed.contains(&session_id) {
                return Err(HubError::SessionNotFound(session_id));
            }
        }

        let snapshot = self
            .load_snapshot(session_id)
            .await
            .ok_or(HubError::SessionNotFound(session_id))?;

        let mut registry = self.sessions.write().await;
        // Removed while we were reading the cache.
        if registry.removed.contains(&session_id) {
            return Err(HubError::SessionNotFound(session_id));
        }
        // Someone else may have installed it while we were reading the cache.
        let slot = registry
            .slots
            .entry(session_id)
            .or_insert_with(|| {
                info!(%session_id, "session rehydrated from replication cache");
                SessionSlot::new(Session::from_snapshot(snapshot))
            })
            .clone();
        Ok(slot)
    }

    async fn load_snapshot(&self, session_id: SessionId) -> Option<SessionSnapshot> {
        let bytes = match self.replication.get_snapshot(&cache_key(session_id)).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!(%session_id, error = %e, "snapshot cache read failed");
                return None;
            }
        };
        match self.codec.decode(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(%session_id, error = %e, "cached snapshot is corrupt, ignoring");
                None
            }
        }
    }

    async fn store_snapshot(&self, snapshot: &SessionSnapshot) {
        let session_id = snapshot.id;
        let bytes = match self.codec.encode(snapshot) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(%session_id, error = %e, "failed to encode snapshot for cache");
                return;
            }
        };
        if let Err(e) = self
            .replication
            .set_snapshot(&cache_key(session_id), &bytes, self.config.snapshot_ttl)
            .await
        {
            warn!(%session_id, error = %e, "snapshot cache write failed");
        }
    }

    fn encode_update(&self, snapshot: &SessionSnapshot) -> Option<Frame> {
        match self.codec.encode(&ServerMessage::GameUpdate { session: snapshot }) {
            Ok(bytes) => Some(Frame::from(bytes)),
            Err(e) => {
                error!(session_id = %snapshot.id, error = %e, "failed to encode game update");
                None
            }
        }
    }
}

impl<R: Replication> Drop for Hub<R> {
    fn drop(&mut self) {
        if let Some(task) = self.subscriber.get_mut().take() {
            task.abort();
        }
        for (_, task) in self.countdowns.get_mut().drain() {
            task.abort();
        }
    }
}

/// Non-blocking enqueue on every connection. A connection that can't take
/// the frame right now is detached; it never holds up the others.
fn fan_out(
    session_id: SessionId,
    connections: &mut HashMap<ConnectionId, mpsc::Sender<Frame>>,
    frame: &Frame,
) {
    connections.retain(|conn_id, tx| match tx.try_send(Frame::clone(frame)) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(%session_id, %conn_id, "outbound buffer full, detaching slow connection");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(%session_id, %conn_id, "connection gone, detaching");
            false
        }
    });
}
