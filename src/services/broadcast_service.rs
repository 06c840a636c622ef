//! Change-detecting broadcast scheduler. A single task sweeps every live
//! match on a fixed interval: matches whose event number advanced since the
//! last sweep get a fresh snapshot published, matches idle past the threshold
//! get finalized and removed. The task starts with the first match and winds
//! itself down when none remain.

use std::sync::{Arc, PoisonError};

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{
    dto::snapshot::MatchSnapshot,
    state::{MatchHandle, SharedRegistry},
};

/// Start the scheduler if it is not already running. Idempotent; called on
/// every match creation.
pub fn ensure_started(registry: &SharedRegistry) {
    let mut slot = registry
        .scheduler_slot()
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if slot.as_ref().is_some_and(|task| !task.is_finished()) {
        return;
    }

    info!("starting broadcast scheduler");
    *slot = Some(tokio::spawn(run(registry.clone())));
}

async fn run(registry: SharedRegistry) {
    let mut tick = tokio::time::interval(registry.config().broadcast_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tick.tick().await;

        let handles = registry.handles();
        if handles.is_empty() {
            let mut slot = registry
                .scheduler_slot()
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            slot.take();
            info!("no live matches, broadcast scheduler stopping");
            return;
        }

        for handle in handles {
            sweep_match(&registry, &handle).await;
        }
    }
}

/// Publish the match if it changed, or reap it if it has been idle too long.
async fn sweep_match(registry: &SharedRegistry, handle: &Arc<MatchHandle>) {
    let snapshot = {
        let state = handle.state().lock().await;
        if state.event_number() <= handle.last_broadcast() {
            None
        } else {
            Some(MatchSnapshot::of(&state))
        }
    };

    if let Some(snapshot) = snapshot {
        handle.set_last_broadcast(snapshot.event_number);
        handle.touch();
        registry
            .hub()
            .publish(handle.group_code(), Arc::new(snapshot));
        return;
    }

    if handle.idle_for() >= registry.config().idle_threshold {
        finalize_idle_match(registry, handle).await;
    }
}

/// An idle match reached the threshold: complete it with the persistence
/// collaborator when registered, then remove it. A normal lifecycle end, not
/// an error.
async fn finalize_idle_match(registry: &SharedRegistry, handle: &Arc<MatchHandle>) {
    let (snapshot, registered) = {
        let state = handle.state().lock().await;
        (MatchSnapshot::of(&state), state.is_registered())
    };

    info!(group_code = %handle.group_code(), "match idle past threshold, finalizing");

    if registered {
        if let Err(err) = registry.persistence().complete_match(snapshot).await {
            warn!(group_code = %handle.group_code(), error = %err, "idle finalization could not complete match");
        }
    } else {
        debug!(group_code = %handle.group_code(), "idle match was never registered, removing only");
    }

    registry.remove_match(handle.group_code());
}
