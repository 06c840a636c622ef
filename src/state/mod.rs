pub mod hub;
pub mod live;
pub mod phase;
pub mod player;
pub mod team;
pub mod timers;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::{
    config::EngineConfig,
    dto::session::CreateMatchRequest,
    error::CreateMatchError,
    persistence::MatchPersistence,
    state::{live::LiveMatch, timers::TimerSet},
};

pub use self::hub::SnapshotHub;

/// Shared handle to the process-wide registry, constructed once by the entry
/// point and dependency-injected into the transport and collaborators.
pub type SharedRegistry = Arc<MatchRegistry>;

/// Result of a session-start request against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new match aggregate was created.
    Created,
    /// The group code was live and the secret matched: the session resumes
    /// the existing match.
    Reconnected,
}

/// One live match plus everything the registry needs around it: the async
/// mutex serializing event application, the owned timer tasks, and the
/// broadcast bookkeeping.
pub struct MatchHandle {
    group_code: String,
    group_secret: String,
    state: Mutex<LiveMatch>,
    timers: TimerSet,
    /// Event number most recently published for this match.
    last_broadcast: AtomicU64,
    last_activity: StdMutex<Instant>,
}

impl MatchHandle {
    fn new(request: &CreateMatchRequest) -> Arc<Self> {
        Arc::new(Self {
            group_code: request.group_code.clone(),
            group_secret: request.group_secret.clone(),
            state: Mutex::new(LiveMatch::new(request)),
            timers: TimerSet::default(),
            last_broadcast: AtomicU64::new(0),
            last_activity: StdMutex::new(Instant::now()),
        })
    }

    pub fn group_code(&self) -> &str {
        &self.group_code
    }

    /// The match state. Lock scope must stay short: hold it across one event
    /// application or one snapshot build, never across I/O.
    pub fn state(&self) -> &Mutex<LiveMatch> {
        &self.state
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn last_broadcast(&self) -> u64 {
        self.last_broadcast.load(Ordering::Acquire)
    }

    pub fn set_last_broadcast(&self, event_number: u64) {
        self.last_broadcast.store(event_number, Ordering::Release);
    }

    /// Record activity, deferring the idle reaper.
    pub fn touch(&self) {
        let mut last = self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *last = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

/// Owner of all live matches, keyed by group code, with a reverse lookup over
/// match identifiers for auxiliary routing.
pub struct MatchRegistry {
    config: EngineConfig,
    persistence: Arc<dyn MatchPersistence>,
    matches: DashMap<String, Arc<MatchHandle>>,
    hub: SnapshotHub,
    scheduler: StdMutex<Option<JoinHandle<()>>>,
}

impl MatchRegistry {
    pub fn new(config: EngineConfig, persistence: Arc<dyn MatchPersistence>) -> SharedRegistry {
        let hub = SnapshotHub::new(config.snapshot_channel_capacity);
        Arc::new(Self {
            config,
            persistence,
            matches: DashMap::new(),
            hub,
            scheduler: StdMutex::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn persistence(&self) -> &Arc<dyn MatchPersistence> {
        &self.persistence
    }

    pub fn hub(&self) -> &SnapshotHub {
        &self.hub
    }

    /// Create a match for a session-start request, or resume the existing one
    /// when the group code is live and the secret matches.
    pub fn create_match(
        &self,
        request: &CreateMatchRequest,
    ) -> Result<CreateOutcome, CreateMatchError> {
        if let Some(existing) = self.matches.get(&request.group_code) {
            if existing.group_secret == request.group_secret {
                info!(group_code = %request.group_code, "observer reconnected to live match");
                return Ok(CreateOutcome::Reconnected);
            }
            return Err(CreateMatchError::GroupCodeInUse {
                group_code: request.group_code.clone(),
            });
        }

        self.matches
            .insert(request.group_code.clone(), MatchHandle::new(request));
        info!(group_code = %request.group_code, "match created");
        Ok(CreateOutcome::Created)
    }

    /// Remove a match: cancel its timers and drop its broadcast channel. The
    /// scheduler winds itself down on its next tick once nothing is left.
    pub fn remove_match(&self, group_code: &str) -> Option<Arc<MatchHandle>> {
        let (_, handle) = self.matches.remove(group_code)?;
        handle.timers.cancel_all();
        self.hub.remove(group_code);
        info!(group_code, "match removed");
        Some(handle)
    }

    pub fn get(&self, group_code: &str) -> Option<Arc<MatchHandle>> {
        self.matches.get(group_code).map(|entry| entry.value().clone())
    }

    /// All live handles, for the scheduler sweep.
    pub fn handles(&self) -> Vec<Arc<MatchHandle>> {
        self.matches
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Every match currently observing the given match identifier. One
    /// auxiliary source can feed multiple observers when their games overlap.
    pub async fn matches_for_match_id(&self, match_id: &str) -> Vec<Arc<MatchHandle>> {
        let mut found = Vec::new();
        for handle in self.handles() {
            let state = handle.state.lock().await;
            if state.match_id() == match_id {
                drop(state);
                found.push(handle);
            }
        }
        found
    }

    /// Reverse lookup from a match identifier to its group code, used to bind
    /// late-joining auxiliary sessions.
    pub async fn find_match(&self, match_id: &str) -> Option<String> {
        for handle in self.handles() {
            let state = handle.state.lock().await;
            if state.match_id() == match_id {
                return Some(handle.group_code.clone());
            }
        }
        None
    }

    /// Slot holding the broadcast scheduler task; managed by the broadcast
    /// service.
    pub(crate) fn scheduler_slot(&self) -> &StdMutex<Option<JoinHandle<()>>> {
        &self.scheduler
    }
}
