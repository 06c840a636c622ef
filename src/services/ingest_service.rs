//! Event intake: routes decoded telemetry to the right match, executes the
//! side effects each application produces (timers, persistence calls,
//! removal), and owns the timer tasks' re-entry path.

use std::time::Duration;

use tracing::{debug, error, warn};
use validator::Validate;

use crate::{
    dto::ingest::{AuxEvent, ObserverEvent},
    dto::session::CreateMatchRequest,
    dto::snapshot::MatchSnapshot,
    error::{CreateMatchError, IngestError},
    services::broadcast_service,
    state::{
        CreateOutcome, MatchHandle, SharedRegistry,
        live::{Effects, PersistenceAction, TimerCommand, TimerKind},
    },
};

use std::sync::Arc;

/// Handle a session-start request: validate it, create or resume the match,
/// and make sure the broadcast scheduler is running.
pub async fn create_match(
    registry: &SharedRegistry,
    request: CreateMatchRequest,
) -> Result<CreateOutcome, CreateMatchError> {
    request.validate()?;

    let outcome = registry.create_match(&request)?;
    broadcast_service::ensure_started(registry);
    Ok(outcome)
}

/// Tear down a match on explicit request (e.g. the observer session ends the
/// broadcast). Lifecycle completion at `game_end` and idle reaping arrive
/// here too, through the effects path.
pub fn remove_match(registry: &SharedRegistry, group_code: &str) {
    registry.remove_match(group_code);
}

/// Apply one primary-stream event to the match owning its group code.
pub async fn receive_match_data(
    registry: &SharedRegistry,
    event: ObserverEvent,
) -> Result<(), IngestError> {
    let Some(handle) = registry.get(&event.group_code) else {
        return Err(IngestError::UnknownGroupCode {
            group_code: event.group_code.clone(),
        });
    };

    let effects = {
        let mut state = handle.state().lock().await;
        state.apply(&event)?
    };
    handle.touch();

    run_effects(registry, &handle, effects).await
}

/// Fan one auxiliary event out to every match observing its match id.
/// Auxiliary data for an unknown match id is dropped silently; the auxiliary
/// session may simply outlive the matches it fed.
pub async fn receive_aux_data(registry: &SharedRegistry, event: AuxEvent) {
    let handles = registry.matches_for_match_id(&event.match_id).await;
    if handles.is_empty() {
        debug!(match_id = %event.match_id, "auxiliary event matched no live match");
        return;
    }

    for handle in handles {
        let effects = {
            let mut state = handle.state().lock().await;
            state.apply_aux(&event)
        };
        handle.touch();

        if let Err(err) = run_effects(registry, &handle, effects).await {
            warn!(group_code = %handle.group_code(), error = %err, "auxiliary effect execution failed");
        }
    }
}

/// An auxiliary client disconnected: clear its availability flags wherever
/// the player is rostered.
pub async fn aux_disconnected(registry: &SharedRegistry, player_id: &str) {
    for handle in registry.handles() {
        {
            let mut state = handle.state().lock().await;
            state.aux_disconnected(player_id);
        }
        handle.touch();
    }
}

/// Execute the side effects of one state mutation. Timer commands always run;
/// persistence failures only propagate for registration, which the session
/// needs to hear about.
async fn run_effects(
    registry: &SharedRegistry,
    handle: &Arc<MatchHandle>,
    effects: Effects,
) -> Result<(), IngestError> {
    for command in &effects.timers {
        match *command {
            TimerCommand::Arm(kind, duration) => arm_timer(registry, handle, kind, duration),
            TimerCommand::Cancel(kind) => handle.timers().cancel(kind),
        }
    }

    if let Some(action) = effects.persistence {
        dispatch_persistence(registry, handle, action).await?;
    }

    if effects.remove {
        registry.remove_match(handle.group_code());
    }

    Ok(())
}

async fn dispatch_persistence(
    registry: &SharedRegistry,
    handle: &Arc<MatchHandle>,
    action: PersistenceAction,
) -> Result<(), IngestError> {
    let snapshot = {
        let state = handle.state().lock().await;
        MatchSnapshot::of(&state)
    };
    let persistence = registry.persistence();

    match action {
        PersistenceAction::Register => match persistence.register_match(snapshot).await {
            Ok(()) => {
                let mut state = handle.state().lock().await;
                state.mark_registered();
                Ok(())
            }
            Err(err) => {
                error!(group_code = %handle.group_code(), error = %err, "match registration failed");
                Err(IngestError::Registration(err))
            }
        },
        PersistenceAction::Update => {
            if let Err(err) = persistence.update_match(snapshot).await {
                warn!(group_code = %handle.group_code(), error = %err, "match update failed; continuing");
            }
            Ok(())
        }
        PersistenceAction::Complete => {
            if let Err(err) = persistence.complete_match(snapshot).await {
                warn!(group_code = %handle.group_code(), error = %err, "match completion failed; continuing");
            }
            Ok(())
        }
    }
}

/// Spawn the timer task for one arm command and store its abort handle on the
/// match. Tasks re-resolve the handle through the registry at fire time, so a
/// timer outliving its match fizzles instead of resurrecting it.
fn arm_timer(
    registry: &SharedRegistry,
    handle: &Arc<MatchHandle>,
    kind: TimerKind,
    duration: Duration,
) {
    let registry = registry.clone();
    let group_code = handle.group_code().to_string();

    let task = tokio::spawn(async move {
        match kind {
            TimerKind::TimeoutTick => loop {
                tokio::time::sleep(duration).await;
                fire_timer(&registry, &group_code, kind).await;
            },
            _ => {
                tokio::time::sleep(duration).await;
                fire_timer(&registry, &group_code, kind).await;
            }
        }
    });

    handle.timers().store(kind, task.abort_handle());
}

async fn fire_timer(registry: &SharedRegistry, group_code: &str, kind: TimerKind) {
    let Some(handle) = registry.get(group_code) else {
        return;
    };

    let effects = {
        let mut state = handle.state().lock().await;
        state.handle_timer(kind)
    };
    handle.touch();

    if let Err(err) = run_effects(registry, &handle, effects).await {
        warn!(group_code, error = %err, "timer effect execution failed");
    }
}
