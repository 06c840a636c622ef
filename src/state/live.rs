//! The per-match aggregate: round-phase handling, spike-plant inference,
//! round-outcome attribution, the per-side timeout machinery, and the
//! monotonic event counter that drives change-detected broadcasting.
//!
//! The aggregate is deliberately synchronous. Applying an event returns a set
//! of [`Effects`] (timers to arm or cancel, persistence calls to make, a
//! removal request) which the owning handle executes; nothing in here ever
//! awaits.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    dto::ingest::{
        AuxEvent, AuxPayload, EventPayload, GameMode, ObserverEvent, ScoreboardUpdate, ScorePair,
    },
    dto::session::{CreateMatchRequest, ToolsConfig},
    error::IngestError,
    state::{
        phase::RoundPhase,
        team::{RoundResult, Team},
    },
    translate,
};

/// Exact money bonus awarded for planting the spike. A mid-combat balance
/// increase of exactly this amount is treated as indirect confirmation of a
/// plant, because the explicit plant event is not delivered reliably by every
/// client version.
const PLANT_BONUS: i32 = 300;
/// Combat-phase length; a round that reaches this deadline unresolved is a
/// defender win by timeout.
const COMBAT_WINDOW_MS: u64 = 99_000;
/// Fuse length armed when the spike is planted.
const DETONATION_WINDOW_MS: u64 = 45_000;
/// Cap on per-side timeout counts, including the overtime grant.
const MAX_TIMEOUTS: u8 = 2;

/// Presentation side of the match, as established at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Spike objective flags for the current round.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SpikeState {
    pub planted: bool,
    pub detonated: bool,
    pub defused: bool,
}

/// Timeout presentation state. At most one of `left_active`/`right_active` is
/// true at a time.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutState {
    pub tech_pause: bool,
    pub left_active: bool,
    pub right_active: bool,
    pub seconds_remaining: u64,
}

impl TimeoutState {
    fn active_for(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left_active,
            Side::Right => self.right_active,
        }
    }
}

/// Timers a match can own. Arm/cancel requests travel out of the aggregate as
/// [`TimerCommand`]s; the handles live on the aggregate's wrapper and are all
/// cancelled at `game_end` and on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Ends a running timeout after the configured duration.
    TimeoutExpiry,
    /// Once-per-second countdown while a timeout runs.
    TimeoutTick,
    /// Grace window for the left side's pending timeout.
    GraceLeft,
    /// Grace window for the right side's pending timeout.
    GraceRight,
}

/// One timer side effect requested by the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// (Re-)arm the timer. For [`TimerKind::TimeoutTick`] the duration is the
    /// repeat period, otherwise a one-shot delay.
    Arm(TimerKind, Duration),
    Cancel(TimerKind),
}

/// Persistence side effect requested by the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceAction {
    Register,
    Update,
    Complete,
}

/// Side effects of applying one event or timer firing.
#[derive(Debug, Default)]
pub struct Effects {
    pub timers: Vec<TimerCommand>,
    pub persistence: Option<PersistenceAction>,
    /// The match asked the registry to tear it down.
    pub remove: bool,
}

impl Effects {
    fn cancel_all_timers() -> Vec<TimerCommand> {
        vec![
            TimerCommand::Cancel(TimerKind::TimeoutExpiry),
            TimerCommand::Cancel(TimerKind::TimeoutTick),
            TimerCommand::Cancel(TimerKind::GraceLeft),
            TimerCommand::Cancel(TimerKind::GraceRight),
        ]
    }
}

/// Full in-memory state of one live match.
#[derive(Debug)]
pub struct LiveMatch {
    group_code: String,
    /// Assigned by the client once play starts; routes auxiliary streams.
    match_id: String,
    game_mode: GameMode,
    switch_round: u32,
    first_overtime_round: u32,

    is_running: bool,
    round_number: u32,
    round_phase: RoundPhase,
    /// Deadline after which an unresolved round counts as a defender timeout
    /// win (ms, event-timestamp domain).
    combat_deadline: Option<u64>,
    /// Whether the last score change happened past the combat deadline.
    was_timeout: bool,
    /// Expected detonation time once the spike is planted (ms).
    detonation_deadline: Option<u64>,

    map_name: String,
    spike: SpikeState,
    /// Whether the side that was attacking took the most recent score
    /// increase.
    attackers_won: bool,

    timeout: TimeoutState,
    left_grace_pending: bool,
    right_grace_pending: bool,
    timeouts_left: u8,
    timeouts_right: u8,
    overtime_granted: bool,

    teams: [Team; 2],
    tools: ToolsConfig,

    event_number: u64,
    organization_id: String,
    is_registered: bool,
}

impl LiveMatch {
    pub fn new(request: &CreateMatchRequest) -> Self {
        let game_mode = GameMode::default();
        Self {
            group_code: request.group_code.clone(),
            match_id: String::new(),
            game_mode,
            switch_round: game_mode.switch_round(),
            first_overtime_round: game_mode.first_overtime_round(),
            is_running: false,
            round_number: 0,
            round_phase: RoundPhase::Lobby,
            combat_deadline: None,
            was_timeout: false,
            detonation_deadline: None,
            map_name: "Loading".into(),
            spike: SpikeState::default(),
            attackers_won: false,
            timeout: TimeoutState::default(),
            left_grace_pending: false,
            right_grace_pending: false,
            timeouts_left: request.tools_data.timeout_counter.left.min(MAX_TIMEOUTS),
            timeouts_right: request.tools_data.timeout_counter.right.min(MAX_TIMEOUTS),
            overtime_granted: false,
            teams: [
                Team::new(&request.left_team),
                Team::new(&request.right_team),
            ],
            tools: request.tools_data.clone(),
            event_number: 1,
            organization_id: request.organization_id.clone().unwrap_or_default(),
            is_registered: false,
        }
    }

    /// Apply one primary-stream event. On success the event number has
    /// advanced and the returned effects must be executed; on rejection
    /// nothing changed.
    pub fn apply(&mut self, event: &ObserverEvent) -> Result<Effects, IngestError> {
        let mut effects = Effects::default();

        match &event.payload {
            EventPayload::Roster(data) => {
                let team = self.team_by_side_mut(data.start_team)?;
                team.apply_roster(data)?;
            }

            EventPayload::Scoreboard(data) => {
                let index = self.team_index_by_side(data.start_team)?;
                self.detect_spike_plant(index, data, event.timestamp);
                self.teams[index].apply_scoreboard(data);
            }

            EventPayload::Killfeed(data) => {
                for team in &mut self.teams {
                    team.apply_killfeed(data);
                }
            }

            EventPayload::Observing(name) => {
                for team in &mut self.teams {
                    team.set_observed_player(name);
                }
            }

            EventPayload::RoundInfo(info) => {
                return self.apply_round_info(info.round_number, info.round_phase, event.timestamp);
            }

            EventPayload::Score(score) => {
                self.process_score(*score, event.timestamp);
                self.spike.planted = false;
            }

            EventPayload::Map(internal) => {
                self.map_name = translate::map_display(internal).to_string();
            }

            EventPayload::GameMode(mode) => {
                self.game_mode = *mode;
                self.switch_round = mode.switch_round();
                self.first_overtime_round = mode.first_overtime_round();
            }

            EventPayload::SpikePlanted => {
                self.set_spike_planted(event.timestamp);
            }

            EventPayload::SpikeDetonated => {
                self.spike.detonated = true;
                self.detonation_deadline = None;
            }

            EventPayload::SpikeDefused => {
                self.spike.defused = true;
            }

            EventPayload::TechPause => {
                effects.timers = self.toggle_tech_pause();
            }

            EventPayload::LeftTimeout => {
                effects.timers = self.handle_team_timeout(Side::Left);
            }

            EventPayload::RightTimeout => {
                effects.timers = self.handle_team_timeout(Side::Right);
            }

            EventPayload::MatchStart(match_id) => {
                self.match_id = match_id.clone();
                self.is_running = true;
                effects.persistence = Some(PersistenceAction::Register);
            }
        }

        self.event_number += 1;
        Ok(effects)
    }

    /// Apply one auxiliary-stream event. Auxiliary data is merge-only and
    /// never rejected; rows that match no roster entry are dropped silently.
    pub fn apply_aux(&mut self, event: &AuxEvent) -> Effects {
        match &event.payload {
            AuxPayload::AuxScoreboard(data) => {
                if let Ok(index) = self.team_index_by_side(data.start_team) {
                    self.detect_spike_plant(index, data, event.timestamp);
                    self.teams[index].apply_aux_scoreboard(data);
                }
            }

            AuxPayload::AuxScoreboardTeam(rows) => {
                let index = if self.teams[0].has_player(&event.player_id) {
                    0
                } else {
                    1
                };
                for row in rows {
                    self.detect_spike_plant(index, row, event.timestamp);
                    self.teams[index].apply_aux_scoreboard(row);
                }
            }

            AuxPayload::AuxAbilities(charges) => {
                for team in &mut self.teams {
                    team.apply_aux_abilities(&event.player_id, *charges);
                }
            }

            AuxPayload::AuxHealth(health) => {
                for team in &mut self.teams {
                    team.apply_aux_health(&event.player_id, *health);
                }
            }

            AuxPayload::AuxTargeting(targeting) => {
                for team in &mut self.teams {
                    team.apply_aux_targeting(&event.player_id, *targeting);
                }
            }
        }

        self.event_number += 1;
        Effects::default()
    }

    /// One of the match's timers fired.
    pub fn handle_timer(&mut self, kind: TimerKind) -> Effects {
        let mut effects = Effects::default();

        match kind {
            TimerKind::TimeoutExpiry => {
                self.timeout.left_active = false;
                self.timeout.right_active = false;
                self.event_number += 1;
                effects.timers.push(TimerCommand::Cancel(TimerKind::TimeoutTick));
            }

            TimerKind::TimeoutTick => {
                if self.timeout.seconds_remaining > 0 {
                    self.timeout.seconds_remaining -= 1;
                    self.event_number += 1;
                } else {
                    effects.timers.push(TimerCommand::Cancel(TimerKind::TimeoutTick));
                }
            }

            TimerKind::GraceLeft => {
                self.timeouts_left = self.timeouts_left.saturating_sub(1);
                self.left_grace_pending = false;
                self.event_number += 1;
            }

            TimerKind::GraceRight => {
                self.timeouts_right = self.timeouts_right.saturating_sub(1);
                self.right_grace_pending = false;
                self.event_number += 1;
            }
        }

        effects
    }

    /// Clear a dropped aux client's availability flags wherever the player
    /// is rostered.
    pub fn aux_disconnected(&mut self, player_id: &str) {
        for team in &mut self.teams {
            team.set_aux_disconnected(player_id);
        }
        self.event_number += 1;
    }

    fn apply_round_info(
        &mut self,
        round_number: u32,
        round_phase: RoundPhase,
        timestamp: u64,
    ) -> Result<Effects, IngestError> {
        let mut effects = Effects::default();

        self.round_number = round_number;
        self.round_phase = round_phase;

        match round_phase {
            RoundPhase::Shopping => {
                if self.round_number != 1 {
                    self.process_round_reasons();
                }

                self.grant_overtime_timeout();

                self.spike = SpikeState::default();

                let is_switch_round = self.round_number == self.switch_round
                    || self.round_number >= self.first_overtime_round;
                if is_switch_round {
                    for team in &mut self.teams {
                        team.switch_sides();
                    }
                }

                for team in &mut self.teams {
                    team.reset_round_specific_values(is_switch_round);
                }

                if self.is_registered && self.round_number != 1 {
                    effects.persistence = Some(PersistenceAction::Update);
                }
            }

            RoundPhase::Combat => {
                for team in &mut self.teams {
                    team.find_duplicate_agents();
                }
                self.combat_deadline = Some(timestamp + COMBAT_WINDOW_MS);
            }

            RoundPhase::End => {
                self.combat_deadline = None;
                self.detonation_deadline = None;
            }

            RoundPhase::GameEnd => {
                self.is_running = false;
                self.left_grace_pending = false;
                self.right_grace_pending = false;
                self.event_number += 1;

                effects.timers = Effects::cancel_all_timers();
                effects.remove = true;
                if self.is_registered {
                    effects.persistence = Some(PersistenceAction::Complete);
                }
                // Terminal: the counter was bumped above, nothing else runs
                // for this match.
                return Ok(effects);
            }

            RoundPhase::Lobby => {}
        }

        self.event_number += 1;
        Ok(effects)
    }

    /// Record which team's score advanced and whether the combat deadline had
    /// passed; the actual attribution happens on the next buy phase.
    fn process_score(&mut self, score: ScorePair, timestamp: u64) {
        for (side, new_score) in [(0u8, score.team_0), (1u8, score.team_1)] {
            let Some(team) = self.teams.iter_mut().find(|team| team.side_id() == side) else {
                warn!(group_code = %self.group_code, side, "score event for a side no team owns");
                continue;
            };
            if new_score > team.rounds_won() {
                self.attackers_won = team.is_attacking();
            }
            team.set_rounds_won(new_score);
        }

        self.was_timeout = self
            .combat_deadline
            .is_some_and(|deadline| timestamp >= deadline);
    }

    /// Attribute the previous round's outcome from the signals gathered while
    /// it ran. Infers the winner from the last observed score increase; a
    /// duplicated or re-ordered score event can misattribute here, there is
    /// no sequence number to guard with.
    fn process_round_reasons(&mut self) {
        let round = self.round_number.saturating_sub(1);

        let Some(attacking) = self.teams.iter().position(Team::is_attacking) else {
            warn!(group_code = %self.group_code, "no attacking team, skipping round attribution");
            return;
        };
        let Some(defending) = self.teams.iter().position(|team| !team.is_attacking()) else {
            warn!(group_code = %self.group_code, "no defending team, skipping round attribution");
            return;
        };

        if self.attackers_won {
            let reason = if self.spike.detonated {
                RoundResult::Detonated
            } else {
                RoundResult::Kills
            };
            self.teams[attacking].add_round_reason(reason, round);
            self.teams[defending].add_round_reason(RoundResult::Lost, round);
        } else {
            let reason = if self.spike.defused {
                RoundResult::Defused
            } else if self.was_timeout {
                RoundResult::Timeout
            } else {
                RoundResult::Kills
            };
            self.teams[defending].add_round_reason(reason, round);
            self.teams[attacking].add_round_reason(RoundResult::Lost, round);
        }
    }

    /// Treat an exact plant-bonus balance increase during combat as a plant.
    fn detect_spike_plant(&mut self, team_index: usize, row: &ScoreboardUpdate, timestamp: u64) {
        if self.round_phase != RoundPhase::Combat {
            return;
        }
        let Some(old_money) = self.teams[team_index].money_for(&row.player_id) else {
            return;
        };
        if row.money > old_money && row.money - old_money == PLANT_BONUS {
            self.set_spike_planted(timestamp);
        }
    }

    fn set_spike_planted(&mut self, timestamp: u64) {
        if self.spike.planted || self.round_phase != RoundPhase::Combat {
            return;
        }
        self.spike.planted = true;
        self.combat_deadline = None;
        self.detonation_deadline = Some(timestamp + DETONATION_WINDOW_MS);
    }

    fn toggle_tech_pause(&mut self) -> Vec<TimerCommand> {
        self.timeout.tech_pause = !self.timeout.tech_pause;
        if !self.timeout.tech_pause {
            return Vec::new();
        }

        // Entering a tech pause force-clears any running timeout and its
        // timers without touching the counters.
        self.timeout.left_active = false;
        self.timeout.right_active = false;
        self.left_grace_pending = false;
        self.right_grace_pending = false;
        Effects::cancel_all_timers()
    }

    fn handle_team_timeout(&mut self, side: Side) -> Vec<TimerCommand> {
        let grace_pending = match side {
            Side::Left => self.left_grace_pending,
            Side::Right => self.right_grace_pending,
        };

        // Second request within the grace window: free cancellation.
        if grace_pending {
            self.set_grace_pending(side, false);
            self.timeout.left_active = false;
            self.timeout.right_active = false;
            return vec![
                TimerCommand::Cancel(grace_timer(side)),
                TimerCommand::Cancel(TimerKind::TimeoutExpiry),
                TimerCommand::Cancel(TimerKind::TimeoutTick),
            ];
        }

        // Request while running past the grace window: manual cancel, the
        // counter stays spent.
        if self.timeout.active_for(side) {
            self.timeout.left_active = false;
            self.timeout.right_active = false;
            return vec![
                TimerCommand::Cancel(TimerKind::TimeoutExpiry),
                TimerCommand::Cancel(TimerKind::TimeoutTick),
            ];
        }

        // A running timeout blocks the other side.
        if self.timeout.active_for(side.other()) {
            info!(group_code = %self.group_code, ?side, "timeout request while the other side is active");
            return Vec::new();
        }

        let remaining = match side {
            Side::Left => self.timeouts_left,
            Side::Right => self.timeouts_right,
        };
        if remaining == 0 {
            return Vec::new();
        }

        self.timeout.left_active = side == Side::Left;
        self.timeout.right_active = side == Side::Right;
        self.timeout.tech_pause = false;
        self.timeout.seconds_remaining = self.tools.timeout_duration;
        self.set_grace_pending(side, true);

        vec![
            TimerCommand::Arm(
                TimerKind::TimeoutExpiry,
                Duration::from_secs(self.tools.timeout_duration),
            ),
            TimerCommand::Arm(TimerKind::TimeoutTick, Duration::from_secs(1)),
            TimerCommand::Arm(
                grace_timer(side),
                Duration::from_secs(self.tools.timeout_cancellation_grace_period),
            ),
        ]
    }

    fn set_grace_pending(&mut self, side: Side, pending: bool) {
        match side {
            Side::Left => self.left_grace_pending = pending,
            Side::Right => self.right_grace_pending = pending,
        }
    }

    /// Grant each side one extra timeout the first time overtime is reached.
    fn grant_overtime_timeout(&mut self) {
        if self.round_number >= self.first_overtime_round && !self.overtime_granted {
            self.overtime_granted = true;
            self.timeouts_left = (self.timeouts_left + 1).min(MAX_TIMEOUTS);
            self.timeouts_right = (self.timeouts_right + 1).min(MAX_TIMEOUTS);
            self.event_number += 1;
            info!(group_code = %self.group_code, "overtime reached, each side granted an extra timeout");
        }
    }

    fn team_index_by_side(&self, side: u8) -> Result<usize, IngestError> {
        self.teams
            .iter()
            .position(|team| team.side_id() == side)
            .ok_or(IngestError::UnknownSide { side })
    }

    fn team_by_side_mut(&mut self, side: u8) -> Result<&mut Team, IngestError> {
        let index = self.team_index_by_side(side)?;
        Ok(&mut self.teams[index])
    }

    pub fn mark_registered(&mut self) {
        self.is_registered = true;
    }

    pub fn group_code(&self) -> &str {
        &self.group_code
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn game_mode(&self) -> GameMode {
        self.game_mode
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_registered(&self) -> bool {
        self.is_registered
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn round_phase(&self) -> RoundPhase {
        self.round_phase
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn spike(&self) -> SpikeState {
        self.spike
    }

    pub fn timeout(&self) -> TimeoutState {
        self.timeout
    }

    pub fn timeouts_remaining(&self) -> (u8, u8) {
        (self.timeouts_left, self.timeouts_right)
    }

    pub fn teams(&self) -> &[Team; 2] {
        &self.teams
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    pub fn event_number(&self) -> u64 {
        self.event_number
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    #[cfg(test)]
    pub(crate) fn detonation_deadline(&self) -> Option<u64> {
        self.detonation_deadline
    }
}

fn grace_timer(side: Side) -> TimerKind {
    match side {
        Side::Left => TimerKind::GraceLeft,
        Side::Right => TimerKind::GraceRight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::session::{TeamIdentity, ToolsConfig};
    use crate::dto::ingest::RosterUpdate;

    fn request() -> CreateMatchRequest {
        CreateMatchRequest {
            obs_name: "main-obs".into(),
            group_code: "ABC123".into(),
            group_secret: "s3cret".into(),
            client_version: "1.4.2".into(),
            organization_id: None,
            left_team: TeamIdentity {
                name: "Alpha".into(),
                tricode: "ALP".into(),
                url: String::new(),
                attack_start: true,
            },
            right_team: TeamIdentity {
                name: "Bravo".into(),
                tricode: "BRV".into(),
                url: String::new(),
                attack_start: false,
            },
            tools_data: ToolsConfig::default(),
        }
    }

    fn event(payload: EventPayload, timestamp: u64) -> ObserverEvent {
        ObserverEvent {
            observer_name: "main-obs".into(),
            group_code: "ABC123".into(),
            timestamp,
            payload,
        }
    }

    fn round_info(round: u32, phase: RoundPhase, ts: u64) -> ObserverEvent {
        event(
            EventPayload::RoundInfo(crate::dto::ingest::RoundInfo {
                round_number: round,
                round_phase: phase,
            }),
            ts,
        )
    }

    fn roster_row(id: &str, name: &str, start_team: u8) -> RosterUpdate {
        RosterUpdate {
            name: name.into(),
            tagline: "EU".into(),
            start_team,
            agent_internal: "Wushu".into(),
            player_id: id.into(),
            position: 0,
            locked: true,
            rank: 10,
        }
    }

    fn scoreboard_row(id: &str, start_team: u8, money: i32) -> ScoreboardUpdate {
        ScoreboardUpdate {
            name: "p".into(),
            tagline: "EU".into(),
            player_id: id.into(),
            start_team,
            agent_internal: "Wushu".into(),
            is_alive: true,
            initial_shield: 0,
            scoreboard_weapon_internal: "TX_Hud_Rifles_Volcano".into(),
            curr_ult_points: 0,
            max_ult_points: 7,
            has_spike: false,
            money,
            kills: 0,
            deaths: 0,
            assists: 0,
        }
    }

    fn apply(state: &mut LiveMatch, payload: EventPayload, ts: u64) -> Effects {
        state.apply(&event(payload, ts)).unwrap()
    }

    #[test]
    fn event_number_advances_only_on_accepted_events() {
        let mut state = LiveMatch::new(&request());
        let before = state.event_number();

        apply(&mut state, EventPayload::SpikeDefused, 1_000);
        assert_eq!(state.event_number(), before + 1);

        // Unknown side id: rejected, counter untouched.
        let err = state
            .apply(&event(
                EventPayload::Roster(roster_row("p1", "alpha", 7)),
                2_000,
            ))
            .unwrap_err();
        assert!(matches!(err, IngestError::UnknownSide { side: 7 }));
        assert_eq!(state.event_number(), before + 1);
    }

    #[test]
    fn side_switch_happens_exactly_on_configured_rounds() {
        let mut state = LiveMatch::new(&request());
        assert!(state.teams()[0].is_attacking());

        apply(&mut state, round_info(12, RoundPhase::Shopping, 0).payload, 0);
        assert!(state.teams()[0].is_attacking());

        apply(&mut state, round_info(13, RoundPhase::Shopping, 0).payload, 0);
        assert!(!state.teams()[0].is_attacking());
        assert!(state.teams()[1].is_attacking());

        apply(&mut state, round_info(14, RoundPhase::Shopping, 0).payload, 0);
        assert!(!state.teams()[0].is_attacking());

        // Overtime: swap every round.
        apply(&mut state, round_info(25, RoundPhase::Shopping, 0).payload, 0);
        assert!(state.teams()[0].is_attacking());
        apply(&mut state, round_info(26, RoundPhase::Shopping, 0).payload, 0);
        assert!(!state.teams()[0].is_attacking());
    }

    #[test]
    fn swift_mode_rederives_switch_thresholds() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, EventPayload::GameMode(GameMode::Swift), 0);

        apply(&mut state, round_info(5, RoundPhase::Shopping, 0).payload, 0);
        assert!(!state.teams()[0].is_attacking());

        // Round 25 is not overtime in swift mode.
        apply(&mut state, round_info(25, RoundPhase::Shopping, 0).payload, 0);
        assert!(!state.teams()[0].is_attacking());
    }

    #[test]
    fn attackers_detonation_win_is_attributed() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, round_info(1, RoundPhase::Shopping, 0).payload, 0);
        apply(&mut state, round_info(1, RoundPhase::Combat, 10_000).payload, 10_000);
        apply(&mut state, EventPayload::SpikePlanted, 40_000);
        apply(&mut state, EventPayload::SpikeDetonated, 80_000);
        apply(
            &mut state,
            EventPayload::Score(ScorePair { team_0: 1, team_1: 0 }),
            81_000,
        );
        apply(&mut state, round_info(2, RoundPhase::Shopping, 90_000).payload, 90_000);

        let attacker_record = state.teams()[0].round_record();
        let defender_record = state.teams()[1].round_record();
        assert!(matches!(attacker_record[0].result, RoundResult::Detonated));
        assert!(matches!(defender_record[0].result, RoundResult::Lost));
        assert!(matches!(attacker_record[1].result, RoundResult::Upcoming));
    }

    #[test]
    fn attackers_kill_win_without_detonation() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, round_info(1, RoundPhase::Combat, 10_000).payload, 10_000);
        apply(
            &mut state,
            EventPayload::Score(ScorePair { team_0: 1, team_1: 0 }),
            50_000,
        );
        apply(&mut state, round_info(2, RoundPhase::Shopping, 60_000).payload, 60_000);

        assert!(matches!(
            state.teams()[0].round_record()[0].result,
            RoundResult::Kills
        ));
    }

    #[test]
    fn defender_defuse_and_timeout_wins_are_attributed() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, round_info(1, RoundPhase::Combat, 10_000).payload, 10_000);
        apply(&mut state, EventPayload::SpikePlanted, 30_000);
        apply(&mut state, EventPayload::SpikeDefused, 60_000);
        apply(
            &mut state,
            EventPayload::Score(ScorePair { team_0: 0, team_1: 1 }),
            61_000,
        );
        apply(&mut state, round_info(2, RoundPhase::Shopping, 70_000).payload, 70_000);
        assert!(matches!(
            state.teams()[1].round_record()[0].result,
            RoundResult::Defused
        ));

        // Round 2: clock runs out, defenders hold.
        apply(&mut state, round_info(2, RoundPhase::Combat, 100_000).payload, 100_000);
        apply(
            &mut state,
            EventPayload::Score(ScorePair { team_0: 0, team_1: 2 }),
            100_000 + COMBAT_WINDOW_MS + 1,
        );
        apply(
            &mut state,
            round_info(3, RoundPhase::Shopping, 210_000).payload,
            210_000,
        );
        assert!(matches!(
            state.teams()[1].round_record()[1].result,
            RoundResult::Timeout
        ));
    }

    #[test]
    fn plant_bonus_money_delta_infers_spike_plant() {
        let mut state = LiveMatch::new(&request());
        apply(
            &mut state,
            EventPayload::Roster(roster_row("p1", "alpha", 0)),
            0,
        );
        apply(
            &mut state,
            EventPayload::Scoreboard(scoreboard_row("p1", 0, 2_000)),
            0,
        );
        apply(&mut state, round_info(1, RoundPhase::Combat, 10_000).payload, 10_000);

        apply(
            &mut state,
            EventPayload::Scoreboard(scoreboard_row("p1", 0, 2_300)),
            42_000,
        );
        assert!(state.spike().planted);
        assert_eq!(state.detonation_deadline(), Some(42_000 + DETONATION_WINDOW_MS));

        // Identical delta again: idempotent, the deadline is not re-armed.
        apply(
            &mut state,
            EventPayload::Scoreboard(scoreboard_row("p1", 0, 2_600)),
            55_000,
        );
        assert_eq!(state.detonation_deadline(), Some(42_000 + DETONATION_WINDOW_MS));
    }

    #[test]
    fn plant_event_is_ignored_outside_combat() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, round_info(1, RoundPhase::Shopping, 0).payload, 0);
        apply(&mut state, EventPayload::SpikePlanted, 5_000);
        assert!(!state.spike().planted);
    }

    #[test]
    fn timeout_request_with_empty_counter_is_a_no_op() {
        let mut req = request();
        req.tools_data.timeout_counter.left = 0;
        let mut state = LiveMatch::new(&req);

        let effects = apply(&mut state, EventPayload::LeftTimeout, 0);
        assert!(effects.timers.is_empty());
        assert!(!state.timeout().left_active);
        assert_eq!(state.timeouts_remaining().0, 0);
    }

    #[test]
    fn second_request_within_grace_cancels_for_free() {
        let mut state = LiveMatch::new(&request());

        let effects = apply(&mut state, EventPayload::LeftTimeout, 0);
        assert!(state.timeout().left_active);
        assert!(effects
            .timers
            .contains(&TimerCommand::Arm(TimerKind::TimeoutTick, Duration::from_secs(1))));

        let effects = apply(&mut state, EventPayload::LeftTimeout, 2_000);
        assert!(!state.timeout().left_active);
        assert!(effects
            .timers
            .contains(&TimerCommand::Cancel(TimerKind::GraceLeft)));
        // No grace timer fired, so the counter was never spent.
        assert_eq!(state.timeouts_remaining().0, 1);
    }

    #[test]
    fn grace_expiry_spends_the_counter_and_cancel_after_grace_keeps_it_spent() {
        let mut state = LiveMatch::new(&request());

        apply(&mut state, EventPayload::LeftTimeout, 0);
        state.handle_timer(TimerKind::GraceLeft);
        assert_eq!(state.timeouts_remaining().0, 0);
        assert!(state.timeout().left_active);

        // Cancelling now ends the timeout but does not refund.
        apply(&mut state, EventPayload::LeftTimeout, 30_000);
        assert!(!state.timeout().left_active);
        assert_eq!(state.timeouts_remaining().0, 0);
    }

    #[test]
    fn active_timeout_blocks_the_other_side() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, EventPayload::LeftTimeout, 0);
        state.handle_timer(TimerKind::GraceLeft);

        let effects = apply(&mut state, EventPayload::RightTimeout, 5_000);
        assert!(effects.timers.is_empty());
        assert!(state.timeout().left_active);
        assert!(!state.timeout().right_active);
        assert_eq!(state.timeouts_remaining().1, 1);
    }

    #[test]
    fn tech_pause_force_clears_an_active_timeout() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, EventPayload::LeftTimeout, 0);

        let effects = apply(&mut state, EventPayload::TechPause, 1_000);
        assert!(state.timeout().tech_pause);
        assert!(!state.timeout().left_active);
        assert!(effects
            .timers
            .contains(&TimerCommand::Cancel(TimerKind::TimeoutExpiry)));
        // Grace never elapsed and was force-cleared: nothing spent.
        assert_eq!(state.timeouts_remaining().0, 1);

        apply(&mut state, EventPayload::TechPause, 2_000);
        assert!(!state.timeout().tech_pause);
    }

    #[test]
    fn countdown_tick_decrements_and_bumps() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, EventPayload::LeftTimeout, 0);
        let before = state.event_number();

        state.handle_timer(TimerKind::TimeoutTick);
        assert_eq!(state.timeout().seconds_remaining, 59);
        assert_eq!(state.event_number(), before + 1);
    }

    #[test]
    fn overtime_grants_one_extra_timeout_once() {
        let mut req = request();
        req.tools_data.timeout_counter.left = 0;
        let mut state = LiveMatch::new(&req);

        apply(&mut state, round_info(25, RoundPhase::Shopping, 0).payload, 0);
        assert_eq!(state.timeouts_remaining(), (1, 2));

        apply(&mut state, round_info(26, RoundPhase::Shopping, 0).payload, 0);
        assert_eq!(state.timeouts_remaining(), (1, 2));
    }

    #[test]
    fn game_end_is_terminal_and_requests_removal() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, EventPayload::MatchStart("m-1".into()), 0);
        state.mark_registered();
        let before = state.event_number();

        let effects = apply(&mut state, round_info(24, RoundPhase::GameEnd, 0).payload, 0);
        assert!(!state.is_running());
        assert!(effects.remove);
        assert!(matches!(
            effects.persistence,
            Some(PersistenceAction::Complete)
        ));
        assert_eq!(effects.timers.len(), 4);
        assert_eq!(state.event_number(), before + 1);
    }

    #[test]
    fn shopping_after_round_one_requests_a_persistence_update() {
        let mut state = LiveMatch::new(&request());
        apply(&mut state, EventPayload::MatchStart("m-1".into()), 0);
        state.mark_registered();

        let effects = apply(&mut state, round_info(1, RoundPhase::Shopping, 0).payload, 0);
        assert!(effects.persistence.is_none());

        let effects = apply(&mut state, round_info(2, RoundPhase::Shopping, 0).payload, 0);
        assert!(matches!(effects.persistence, Some(PersistenceAction::Update)));
    }

    #[test]
    fn killfeed_fallback_stops_once_scoreboard_reports() {
        let mut state = LiveMatch::new(&request());
        apply(
            &mut state,
            EventPayload::Roster(roster_row("p1", "alpha", 0)),
            0,
        );
        apply(
            &mut state,
            EventPayload::Roster(roster_row("p2", "bravo", 1)),
            0,
        );
        apply(&mut state, round_info(1, RoundPhase::Combat, 0).payload, 0);

        let line = crate::dto::ingest::KillfeedEntry {
            attacker: "alpha".into(),
            victim: "bravo".into(),
            weapon_killfeed_internal: "TX_Hud_Volcano".into(),
            headshot_kill: false,
            assists: vec![],
            is_teamkill: false,
        };
        apply(&mut state, EventPayload::Killfeed(line.clone()), 1_000);

        let attacker = state.teams()[0].players().next().unwrap();
        let victim = state.teams()[1].players().next().unwrap();
        assert_eq!(attacker.kills(), 1);
        assert_eq!(victim.deaths(), 1);

        // Authoritative data arrives; the fallback must stop counting.
        let mut row = scoreboard_row("p1", 0, 800);
        row.kills = 1;
        apply(&mut state, EventPayload::Scoreboard(row), 2_000);
        apply(&mut state, EventPayload::Killfeed(line), 3_000);

        let attacker = state.teams()[0].players().next().unwrap();
        assert_eq!(attacker.kills(), 1);
    }

    #[test]
    fn aux_scoreboard_team_routes_by_bound_player() {
        let mut state = LiveMatch::new(&request());
        apply(
            &mut state,
            EventPayload::Roster(roster_row("p1", "alpha", 0)),
            0,
        );
        apply(
            &mut state,
            EventPayload::Roster(roster_row("p2", "bravo", 0)),
            0,
        );

        let aux = AuxEvent {
            match_id: "m-1".into(),
            player_id: "p1".into(),
            timestamp: 1_000,
            payload: AuxPayload::AuxScoreboardTeam(vec![
                scoreboard_row("p1", 0, 600),
                scoreboard_row("p2", 0, 900),
            ]),
        };
        state.apply_aux(&aux);

        let money: Vec<i32> = state.teams()[0].players().map(|p| p.money()).collect();
        assert_eq!(money, vec![600, 900]);
    }
}
