//! Integration tests for the hub: fan-out, backpressure, countdowns,
//! privilege gating, and cross-instance replication.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use robot_race_hub::{Connection, Hub, HubConfig, HubError, cache_key};
use robot_race_protocol::{ParticipantId, PlayerAction, SessionId};
use robot_race_replication::{
    DisabledReplication, MemoryReplication, Replication, ReplicationError, Subscription,
};
use robot_race_session::{SessionConfig, SessionError, SessionSnapshot, SessionState};
use serde_json::Value;
use tokio::sync::Notify;

// =========================================================================
// Helpers
// =========================================================================

fn standalone() -> Arc<Hub<DisabledReplication>> {
    Hub::new(HubConfig::default(), DisabledReplication)
}

fn race_config(target_score: u32, max_participants: usize, countdown: u32) -> SessionConfig {
    SessionConfig {
        target_score,
        max_participants,
        countdown,
        ..SessionConfig::default()
    }
}

fn decode(frame: &[u8]) -> Value {
    serde_json::from_slice(frame).expect("frames are JSON")
}

/// Everything buffered on a connection right now.
fn drain(conn: &mut Connection) -> Vec<Value> {
    std::iter::from_fn(|| conn.try_next_frame())
        .map(|frame| decode(&frame))
        .collect()
}

/// Reads frames until one satisfies `pred`, failing after a second.
async fn wait_for(conn: &mut Connection, pred: impl Fn(&Value) -> bool) -> Value {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let frame = conn.next_frame().await.expect("connection closed");
            let value = decode(&frame);
            if pred(&value) {
                return value;
            }
        }
    })
    .await
    .expect("expected frame never arrived")
}

/// Shared memory broker whose snapshot writes can be held back one at a
/// time, to line up a slow cache write against other hub operations.
#[derive(Clone, Default)]
struct GatedCache {
    inner: MemoryReplication,
    gate: Arc<Gate>,
}

#[derive(Default)]
struct Gate {
    armed: AtomicBool,
    held: Notify,
    release: Notify,
}

impl GatedCache {
    /// The next snapshot write waits until [`release`](Self::release).
    fn hold_next_write(&self) {
        self.gate.armed.store(true, Ordering::SeqCst);
    }

    async fn write_held(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.gate.held.notified())
            .await
            .expect("no snapshot write was held");
    }

    fn release(&self) {
        self.gate.release.notify_one();
    }

    async fn cached(&self, session_id: SessionId) -> Option<SessionSnapshot> {
        let bytes = self.inner.get_snapshot(&cache_key(session_id)).await.unwrap()?;
        Some(serde_json::from_slice(&bytes).expect("cached snapshot is JSON"))
    }
}

impl Replication for GatedCache {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), ReplicationError> {
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, ReplicationError> {
        self.inner.subscribe(pattern).await
    }

    async fn set_snapshot(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), ReplicationError> {
        if self.gate.armed.swap(false, Ordering::SeqCst) {
            self.gate.held.notify_one();
            self.gate.release.notified().await;
        }
        self.inner.set_snapshot(key, value, ttl).await
    }

    async fn get_snapshot(&self, key: &str) -> Result<Option<Vec<u8>>, ReplicationError> {
        self.inner.get_snapshot(key).await
    }

    async fn delete_snapshot(&self, key: &str) -> Result<(), ReplicationError> {
        self.inner.delete_snapshot(key).await
    }
}

/// A session with `names` joined, counted down, and Playing.
async fn playing_session<R: Replication>(
    hub: &Arc<Hub<R>>,
    target_score: u32,
    names: &[&str],
) -> (SessionId, Vec<ParticipantId>) {
    let session_id = hub
        .create_session(race_config(target_score, 10, 1))
        .await;
    let mut ids = Vec::new();
    for name in names {
        ids.push(hub.join_session(session_id, *name).await.unwrap().id());
    }
    assert!(hub.start_countdown(session_id).await.unwrap());
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(
        hub.get_session(session_id).await.unwrap().state,
        SessionState::Playing
    );
    (session_id, ids)
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_create_session_registers_in_setup() {
    let hub = standalone();

    let id = hub.create_session(SessionConfig::default()).await;

    let snapshot = hub.get_session(id).await.unwrap();
    assert_eq!(snapshot.id, id);
    assert_eq!(snapshot.state, SessionState::Setup);
    assert_eq!(snapshot.target_score, 25);
    assert_eq!(hub.session_count().await, 1);
}

#[tokio::test]
async fn test_get_session_unknown_returns_not_found() {
    let hub = standalone();
    let id = SessionId::new();

    assert_eq!(hub.get_session(id).await, Err(HubError::SessionNotFound(id)));
}

#[tokio::test]
async fn test_join_session_first_is_privileged() {
    let hub = standalone();
    let id = hub.create_session(SessionConfig::default()).await;

    let ada = hub.join_session(id, "Ada").await.unwrap();
    let bob = hub.join_session(id, "Bob").await.unwrap();

    assert!(ada.is_privileged());
    assert!(!bob.is_privileged());
}

#[tokio::test]
async fn test_join_session_full_propagates_session_error() {
    let hub = standalone();
    let id = hub.create_session(race_config(3, 2, 3)).await;
    hub.join_session(id, "A").await.unwrap();
    hub.join_session(id, "B").await.unwrap();

    let err = hub.join_session(id, "C").await.unwrap_err();

    assert_eq!(
        err,
        HubError::Session(SessionError::SessionFull {
            session_id: id,
            max: 2
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_exceed_capacity() {
    let hub = standalone();
    let id = hub.create_session(race_config(3, 3, 3)).await;

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move { hub.join_session(id, format!("p{i}")).await })
        })
        .collect();

    let mut joined = Vec::new();
    let mut full = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(participant) => joined.push(participant),
            Err(HubError::Session(SessionError::SessionFull { .. })) => full += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(joined.len(), 3);
    assert_eq!(full, 17);
    assert_eq!(joined.iter().filter(|p| p.is_privileged()).count(), 1);
    assert_eq!(hub.get_session(id).await.unwrap().participants.len(), 3);
}

// =========================================================================
// Attach / detach
// =========================================================================

#[tokio::test]
async fn test_attach_queues_current_snapshot_immediately() {
    let hub = standalone();
    let id = hub.create_session(SessionConfig::default()).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();

    let mut conn = hub.attach(id, ada.id()).await.unwrap();

    let frames = drain(&mut conn);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "game_update");
    assert_eq!(frames[0]["payload"]["session"]["participants"][0]["name"], "Ada");
    assert_eq!(hub.connection_count(id).await, 1);
}

#[tokio::test]
async fn test_attach_unknown_participant_is_rejected() {
    let hub = standalone();
    let id = hub.create_session(SessionConfig::default()).await;
    let stranger = ParticipantId::new();

    let err = hub.attach(id, stranger).await.unwrap_err();

    assert_eq!(
        err,
        HubError::ParticipantNotFound {
            session_id: id,
            participant_id: stranger
        }
    );
    assert_eq!(hub.connection_count(id).await, 0);
}

#[tokio::test]
async fn test_detach_closes_buffer_and_is_idempotent() {
    let hub = standalone();
    let id = hub.create_session(SessionConfig::default()).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let mut conn = hub.attach(id, ada.id()).await.unwrap();

    assert!(hub.detach(id, conn.id()).await);
    assert!(!hub.detach(id, conn.id()).await);

    assert!(conn.next_frame().await.is_some(), "initial snapshot still drains");
    assert!(conn.next_frame().await.is_none(), "then the stream ends");
}

// =========================================================================
// Broadcast and backpressure
// =========================================================================

#[tokio::test]
async fn test_broadcast_reaches_every_connection_in_order() {
    let hub = standalone();
    let id = hub.create_session(SessionConfig::default()).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let mut first = hub.attach(id, ada.id()).await.unwrap();
    let mut second = hub.attach(id, ada.id()).await.unwrap();

    hub.join_session(id, "Bob").await.unwrap();
    hub.join_session(id, "Cy").await.unwrap();

    for conn in [&mut first, &mut second] {
        let counts: Vec<usize> = drain(conn)
            .iter()
            .map(|f| f["payload"]["session"]["participants"].as_array().unwrap().len())
            .collect();
        assert_eq!(counts, [1, 2, 3]);
    }
}

#[tokio::test]
async fn test_slow_connection_is_detached_others_unaffected() {
    let hub = Hub::new(
        HubConfig {
            outbound_capacity: 2,
            ..HubConfig::default()
        },
        DisabledReplication,
    );
    let id = hub.create_session(SessionConfig::default()).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let mut slow = hub.attach(id, ada.id()).await.unwrap();
    let mut fast = hub.attach(id, ada.id()).await.unwrap();

    hub.join_session(id, "Bob").await.unwrap();
    drain(&mut fast);
    // `slow` now holds two frames; the next broadcast overflows it.
    hub.join_session(id, "Cy").await.unwrap();

    assert_eq!(hub.connection_count(id).await, 1);
    assert_eq!(drain(&mut fast).len(), 1);
    assert!(slow.next_frame().await.is_some());
    assert!(slow.next_frame().await.is_some());
    assert!(slow.next_frame().await.is_none(), "detached buffer is closed");
}

#[tokio::test]
async fn test_broadcast_snapshot_unknown_session_is_noop() {
    let hub = standalone();
    hub.broadcast_snapshot(SessionId::new()).await;
    assert_eq!(hub.session_count().await, 0);
}

// =========================================================================
// Scoring and reset
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_score_point_counts_every_point() {
    let hub = standalone();
    let (id, ids) = playing_session(&hub, 1_000, &["Ada"]).await;

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let hub = Arc::clone(&hub);
            let ada = ids[0];
            tokio::spawn(async move { hub.score_point(id, ada).await.unwrap() })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap());
    }

    let snapshot = hub.get_session(id).await.unwrap();
    assert_eq!(snapshot.participants[0].score(), 50);
}

#[tokio::test]
async fn test_score_point_outside_playing_does_not_broadcast() {
    let hub = standalone();
    let id = hub.create_session(SessionConfig::default()).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let mut conn = hub.attach(id, ada.id()).await.unwrap();
    drain(&mut conn);

    assert!(!hub.score_point(id, ada.id()).await.unwrap());

    assert!(conn.try_next_frame().is_none());
}

#[tokio::test]
async fn test_reset_session_broadcasts_even_when_noop() {
    let hub = standalone();
    let id = hub.create_session(SessionConfig::default()).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let mut conn = hub.attach(id, ada.id()).await.unwrap();
    drain(&mut conn);

    assert!(!hub.reset_session(id).await.unwrap());

    assert_eq!(drain(&mut conn).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_round_then_reset_credits_winner() {
    let hub = standalone();
    let (id, ids) = playing_session(&hub, 2, &["Ada", "Bob"]).await;

    hub.score_point(id, ids[1]).await.unwrap();
    hub.score_point(id, ids[1]).await.unwrap();
    assert_eq!(hub.get_session(id).await.unwrap().state, SessionState::Finished);

    assert!(hub.reset_session(id).await.unwrap());

    let snapshot = hub.get_session(id).await.unwrap();
    assert_eq!(snapshot.state, SessionState::Setup);
    assert_eq!(snapshot.win_history.get(&ids[1]), Some(&1));
    assert!(snapshot.participants.iter().all(|p| p.score() == 0));
}

// =========================================================================
// Countdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_to_playing_and_broadcasts_each_tick() {
    let hub = standalone();
    let id = hub.create_session(race_config(5, 10, 3)).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let mut conn = hub.attach(id, ada.id()).await.unwrap();
    drain(&mut conn);

    assert!(hub.start_countdown(id).await.unwrap());
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let frames = drain(&mut conn);
    let remaining: Vec<u64> = frames
        .iter()
        .map(|f| f["payload"]["session"]["countdown_remaining"].as_u64().unwrap())
        .collect();
    assert_eq!(remaining, [3, 2, 1, 0]);
    assert_eq!(frames[3]["payload"]["session"]["state"], "playing");
}

#[tokio::test(start_paused = true)]
async fn test_start_countdown_twice_runs_one_ticker() {
    let hub = standalone();
    let id = hub.create_session(race_config(5, 10, 3)).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let mut conn = hub.attach(id, ada.id()).await.unwrap();
    drain(&mut conn);

    assert!(hub.start_countdown(id).await.unwrap());
    assert!(!hub.start_countdown(id).await.unwrap());
    tokio::time::sleep(Duration::from_millis(1500)).await;

    // Two start broadcasts, then a single tick.
    let remaining: Vec<u64> = drain(&mut conn)
        .iter()
        .map(|f| f["payload"]["session"]["countdown_remaining"].as_u64().unwrap())
        .collect();
    assert_eq!(remaining, [3, 3, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_remove_session_stops_countdown_and_closes_connections() {
    let hub = standalone();
    let id = hub.create_session(race_config(5, 10, 3)).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let mut conn = hub.attach(id, ada.id()).await.unwrap();
    hub.start_countdown(id).await.unwrap();

    assert!(hub.remove_session(id).await);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(drain(&mut conn).len(), 2, "initial + countdown start only");
    assert!(conn.next_frame().await.is_none());
    assert_eq!(hub.get_session(id).await, Err(HubError::SessionNotFound(id)));
    assert!(!hub.remove_session(id).await);
}

#[tokio::test(start_paused = true)]
async fn test_ticker_restarts_after_stalled_final_tick() {
    let cache = GatedCache::default();
    let hub = Hub::new(HubConfig::default(), cache.clone());
    let id = hub.create_session(race_config(1, 10, 1)).await;
    let ada = hub.join_session(id, "Ada").await.unwrap().id();
    assert!(hub.start_countdown(id).await.unwrap());

    // The tick that ends the countdown is stuck writing the cache while
    // the next round gets going.
    cache.hold_next_write();
    cache.write_held().await;

    let next_round = tokio::spawn({
        let hub = Arc::clone(&hub);
        async move {
            hub.score_point(id, ada).await.unwrap();
            hub.reset_session(id).await.unwrap();
            hub.start_countdown(id).await.unwrap()
        }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.release();
    assert!(next_round.await.unwrap());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(hub.get_session(id).await.unwrap().state, SessionState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_remove_session_during_cache_write_stays_removed() {
    let cache = GatedCache::default();
    let hub = Hub::new(HubConfig::default(), cache.clone());
    let other = Hub::new(HubConfig::default(), cache.clone());
    let id = hub.create_session(SessionConfig::default()).await;

    cache.hold_next_write();
    let join = tokio::spawn({
        let hub = Arc::clone(&hub);
        async move { hub.join_session(id, "Ada").await }
    });
    cache.write_held().await;

    let remove = tokio::spawn({
        let hub = Arc::clone(&hub);
        async move { hub.remove_session(id).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.release();

    join.await.unwrap().unwrap();
    assert!(remove.await.unwrap());
    assert_eq!(cache.cached(id).await, None);
    assert_eq!(hub.get_session(id).await, Err(HubError::SessionNotFound(id)));
    assert_eq!(other.get_session(id).await, Err(HubError::SessionNotFound(id)));
}

#[tokio::test]
async fn test_removed_session_is_not_rehydrated_from_late_cache_write() {
    let cache = GatedCache::default();
    let hub = Hub::new(HubConfig::default(), cache.clone());
    let id = hub.create_session(SessionConfig::default()).await;
    hub.join_session(id, "Ada").await.unwrap();
    let stale = cache.inner.get_snapshot(&cache_key(id)).await.unwrap().unwrap();

    assert!(hub.remove_session(id).await);
    // Another instance writes an old copy back after the delete.
    cache
        .inner
        .set_snapshot(&cache_key(id), &stale, Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(hub.get_session(id).await, Err(HubError::SessionNotFound(id)));
    assert_eq!(
        hub.join_session(id, "Bob").await.unwrap_err(),
        HubError::SessionNotFound(id)
    );
    assert_eq!(hub.session_count().await, 0);
}

// =========================================================================
// Actions and privilege
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_handle_action_unprivileged_start_is_ignored() {
    let hub = standalone();
    let id = hub.create_session(SessionConfig::default()).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let bob = hub.join_session(id, "Bob").await.unwrap();

    hub.handle_action(id, bob.id(), PlayerAction::StartCountdown)
        .await
        .unwrap();
    assert_eq!(hub.get_session(id).await.unwrap().state, SessionState::Setup);

    hub.handle_action(id, ada.id(), PlayerAction::StartCountdown)
        .await
        .unwrap();
    assert_eq!(
        hub.get_session(id).await.unwrap().state,
        SessionState::CountingDown
    );
}

#[tokio::test(start_paused = true)]
async fn test_handle_action_anyone_may_score_only_privileged_may_reset() {
    let hub = standalone();
    let (id, ids) = playing_session(&hub, 1, &["Ada", "Bob"]).await;

    hub.handle_action(id, ids[1], PlayerAction::ScorePoint)
        .await
        .unwrap();
    assert_eq!(hub.get_session(id).await.unwrap().state, SessionState::Finished);

    hub.handle_action(id, ids[1], PlayerAction::PlayAgain)
        .await
        .unwrap();
    assert_eq!(hub.get_session(id).await.unwrap().state, SessionState::Finished);

    hub.handle_action(id, ids[0], PlayerAction::PlayAgain)
        .await
        .unwrap();
    assert_eq!(hub.get_session(id).await.unwrap().state, SessionState::Setup);
}

#[tokio::test]
async fn test_handle_action_unknown_session_is_not_found() {
    let hub = standalone();
    let id = SessionId::new();

    let err = hub
        .handle_action(id, ParticipantId::new(), PlayerAction::ScorePoint)
        .await
        .unwrap_err();

    assert_eq!(err, HubError::SessionNotFound(id));
}

// =========================================================================
// Replication
// =========================================================================

#[tokio::test]
async fn test_second_standalone_hub_cannot_see_session() {
    let first = standalone();
    let second = standalone();
    let id = first.create_session(SessionConfig::default()).await;

    assert_eq!(
        second.get_session(id).await,
        Err(HubError::SessionNotFound(id))
    );
}

#[tokio::test]
async fn test_second_replicated_hub_rehydrates_session() {
    let broker = MemoryReplication::new();
    let first = Hub::new(HubConfig::default(), broker.clone());
    let second = Hub::new(HubConfig::default(), broker);
    let id = first.create_session(race_config(7, 4, 2)).await;
    first.join_session(id, "Ada").await.unwrap();

    let original = first.get_session(id).await.unwrap();
    let rehydrated = second.get_session(id).await.unwrap();

    assert_eq!(rehydrated, original);
    assert_eq!(second.session_count().await, 1);
}

#[tokio::test]
async fn test_snapshot_from_other_instance_reaches_local_connections() {
    let broker = MemoryReplication::new();
    let first = Hub::new(HubConfig::default(), broker.clone());
    let second = Hub::new(HubConfig::default(), broker);
    assert!(first.start_replication().await);
    assert!(second.start_replication().await);

    let id = first.create_session(SessionConfig::default()).await;
    let ada = first.join_session(id, "Ada").await.unwrap();
    let mut remote = second.attach(id, ada.id()).await.unwrap();

    first.join_session(id, "Bob").await.unwrap();

    let frame = wait_for(&mut remote, |f| {
        f["payload"]["session"]["participants"].as_array().map(Vec::len) == Some(2)
    })
    .await;
    assert_eq!(frame["payload"]["session"]["participants"][1]["name"], "Bob");
    assert_eq!(second.get_session(id).await.unwrap().participants.len(), 2);
}

#[tokio::test]
async fn test_own_publishes_are_not_fanned_out_twice() {
    let hub = Hub::new(HubConfig::default(), MemoryReplication::new());
    assert!(hub.start_replication().await);
    let id = hub.create_session(SessionConfig::default()).await;
    let ada = hub.join_session(id, "Ada").await.unwrap();
    let mut conn = hub.attach(id, ada.id()).await.unwrap();

    hub.join_session(id, "Bob").await.unwrap();
    // Give the subscriber time to see the echo.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(drain(&mut conn).len(), 2, "initial + one broadcast");
}

#[tokio::test]
async fn test_remove_session_deletes_cached_snapshot() {
    let broker = MemoryReplication::new();
    let first = Hub::new(HubConfig::default(), broker.clone());
    let second = Hub::new(HubConfig::default(), broker);
    let id = first.create_session(SessionConfig::default()).await;

    assert!(first.remove_session(id).await);

    assert_eq!(
        second.get_session(id).await,
        Err(HubError::SessionNotFound(id))
    );
}

#[tokio::test(start_paused = true)]
async fn test_cache_keeps_newest_snapshot_when_writes_overlap() {
    let cache = GatedCache::default();
    let hub = Hub::new(HubConfig::default(), cache.clone());
    let (id, ids) = playing_session(&hub, 5, &["Ada"]).await;
    let ada = ids[0];
    let mut conn = hub.attach(id, ada).await.unwrap();
    drain(&mut conn);

    cache.hold_next_write();
    let first = tokio::spawn({
        let hub = Arc::clone(&hub);
        async move { hub.score_point(id, ada).await }
    });
    cache.write_held().await;

    let second = tokio::spawn({
        let hub = Arc::clone(&hub);
        async move { hub.score_point(id, ada).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Both points are delivered locally while the first write is stuck.
    let scores: Vec<u64> = drain(&mut conn)
        .iter()
        .map(|f| f["payload"]["session"]["participants"][0]["score"].as_u64().unwrap())
        .collect();
    assert_eq!(scores, [1, 2]);

    cache.release();
    assert!(first.await.unwrap().unwrap());
    assert!(second.await.unwrap().unwrap());

    let cached = cache.cached(id).await.expect("snapshot cached");
    assert_eq!(cached.participants[0].score(), 2);
}

#[tokio::test]
async fn test_start_replication_disabled_is_noop() {
    let hub = standalone();
    assert!(hub.start_replication().await);
    assert!(!hub.replication().is_enabled());
}
