//! Countdown tickers.
//!
//! One task per session in CountingDown, registered in the hub so it can
//! be aborted when the session is removed. The task only holds a weak
//! reference to the hub and stops on its own once the session is gone or
//! no longer counting down.
//!
//! A ticker unregisters itself while it still holds the session lock on
//! the tick that ends the countdown. The session can only get back to
//! CountingDown through that lock, so a later round always finds the
//! registry free.

use std::sync::{Arc, Weak};

use robot_race_protocol::SessionId;
use robot_race_replication::Replication;
use robot_race_session::SessionState;
use robot_race_tick::{TickConfig, TickScheduler};
use tracing::{debug, info, warn};

use crate::Hub;

/// Spawns the ticker for `session_id` unless one is already running.
/// Returns whether a new ticker was spawned.
pub(crate) async fn spawn<R: Replication>(hub: &Arc<Hub<R>>, session_id: SessionId) -> bool {
    let mut countdowns = hub.countdowns.lock().await;
    if countdowns
        .get(&session_id)
        .is_some_and(|task| !task.is_finished())
    {
        warn!(%session_id, "countdown already running");
        return false;
    }

    let tick_config = TickConfig {
        interval: hub.config().countdown_interval,
        initial_jitter: hub.config().tick_jitter,
    };
    // Registered before the lock is released, so the task always finds
    // its own entry.
    let task = tokio::spawn(run(Arc::downgrade(hub), session_id, tick_config));
    countdowns.insert(session_id, task);
    true
}

async fn run<R: Replication>(hub: Weak<Hub<R>>, session_id: SessionId, tick_config: TickConfig) {
    let mut scheduler = TickScheduler::new(tick_config);
    debug!(%session_id, "countdown ticker started");

    loop {
        let tick = scheduler.wait_for_tick().await;

        let Some(hub) = hub.upgrade() else { return };
        let Some(slot) = hub.local_slot(session_id).await else {
            debug!(%session_id, "session gone, countdown stopped");
            unregister(&hub, session_id).await;
            return;
        };

        let state = {
            let mut session = slot.session.lock().await;
            let state = session.decrement_countdown();
            if state != SessionState::CountingDown {
                unregister(&hub, session_id).await;
            }
            state
        };
        hub.broadcast_slot(session_id, &slot).await;

        if state != SessionState::CountingDown {
            info!(%session_id, ticks = tick.tick, %state, "countdown finished");
            return;
        }
    }
}

/// Drops this task's registry entry. An entry belonging to a newer ticker
/// is left alone.
async fn unregister<R: Replication>(hub: &Hub<R>, session_id: SessionId) {
    let Some(own_id) = tokio::task::try_id() else {
        return;
    };
    let mut countdowns = hub.countdowns.lock().await;
    if countdowns
        .get(&session_id)
        .is_some_and(|task| task.id() == own_id)
    {
        countdowns.remove(&session_id);
    }
}
