//! Outbound snapshot DTOs: the full view of one match published to the
//! per-group-code channel whenever its event number advances, and handed to
//! the persistence collaborator. Internal bookkeeping (timer handles,
//! deadlines, watermarks, merge flags) never appears here.

use std::collections::HashMap;

use serde::Serialize;
use serde_with::skip_serializing_none;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    dto::ingest::{AbilityCharges, GameMode},
    dto::session::ToolsConfig,
    state::{
        live::{LiveMatch, SpikeState, TimeoutState},
        phase::RoundPhase,
        player::Player,
        team::{RoundRecordEntry, Team},
    },
};

/// Full state of one match as downstream subscribers see it.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub group_code: String,
    /// Empty until play has started.
    pub match_id: String,
    pub organization_id: Option<String>,
    pub map: String,
    pub game_mode: GameMode,
    pub is_running: bool,
    pub is_registered: bool,
    pub round_number: u32,
    pub round_phase: RoundPhase,
    pub spike_state: SpikeState,
    pub timeout_state: TimeoutState,
    pub timeouts_remaining: TimeoutsRemaining,
    pub teams: Vec<TeamSnapshot>,
    /// Overlay/tools configuration, passed through from session start.
    pub tools: ToolsConfig,
    pub event_number: u64,
    /// RFC 3339 timestamp of when this snapshot was built.
    pub generated_at: String,
}

/// Remaining timeout counts per side.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TimeoutsRemaining {
    pub left: u8,
    pub right: u8,
}

/// One side of the match.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSnapshot {
    pub name: String,
    pub tricode: String,
    pub url: String,
    pub side_id: u8,
    pub is_attacking: bool,
    pub rounds_won: u32,
    pub spent_this_round: i32,
    pub round_record: Vec<RoundRecordEntry>,
    pub players: Vec<PlayerSnapshot>,
}

/// One tracked player.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub name: String,
    pub tagline: String,
    pub player_id: String,
    pub search_name: String,
    pub agent_internal: String,
    pub agent: String,
    pub position: u8,
    pub locked: bool,
    pub is_alive: bool,
    pub has_spike: bool,
    pub is_observed: bool,
    pub is_targeting: bool,
    pub health: u32,
    pub abilities: AbilityCharges,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub kd_ratio: f32,
    pub kills_this_round: u32,
    pub curr_ult_points: u32,
    pub max_ult_points: u32,
    pub ult_ready: bool,
    pub money: i32,
    pub money_spent: i32,
    pub armor: String,
    pub highest_weapon: String,
    pub team_kills: u32,
    pub headshot_kills: u32,
    pub headshot_ratio: f32,
    pub kills_by_weapon: HashMap<String, u32>,
    pub kills_on_enemy: HashMap<String, u32>,
    pub kills_on_teammate: HashMap<String, u32>,
}

impl MatchSnapshot {
    /// Build a snapshot from a locked match state. Cheap enough to run under
    /// the state lock.
    pub fn of(state: &LiveMatch) -> Self {
        let (left, right) = state.timeouts_remaining();
        Self {
            group_code: state.group_code().to_string(),
            match_id: state.match_id().to_string(),
            organization_id: if state.organization_id().is_empty() {
                None
            } else {
                Some(state.organization_id().to_string())
            },
            map: state.map_name().to_string(),
            game_mode: state.game_mode(),
            is_running: state.is_running(),
            is_registered: state.is_registered(),
            round_number: state.round_number(),
            round_phase: state.round_phase(),
            spike_state: state.spike(),
            timeout_state: state.timeout(),
            timeouts_remaining: TimeoutsRemaining { left, right },
            teams: state.teams().iter().map(TeamSnapshot::of).collect(),
            tools: state.tools().clone(),
            event_number: state.event_number(),
            generated_at: format_timestamp(OffsetDateTime::now_utc()),
        }
    }
}

impl TeamSnapshot {
    fn of(team: &Team) -> Self {
        Self {
            name: team.name().to_string(),
            tricode: team.tricode().to_string(),
            url: team.logo_url().to_string(),
            side_id: team.side_id(),
            is_attacking: team.is_attacking(),
            rounds_won: team.rounds_won(),
            spent_this_round: team.spent_this_round(),
            round_record: team.round_record().to_vec(),
            players: team.players().map(PlayerSnapshot::of).collect(),
        }
    }
}

impl PlayerSnapshot {
    fn of(player: &Player) -> Self {
        Self {
            name: player.name().to_string(),
            tagline: player.tagline().to_string(),
            player_id: player.player_id().to_string(),
            search_name: player.search_name().to_string(),
            agent_internal: player.agent_internal().to_string(),
            agent: player.agent_display().to_string(),
            position: player.position(),
            locked: player.is_locked(),
            is_alive: player.is_alive(),
            has_spike: player.has_spike(),
            is_observed: player.is_observed(),
            is_targeting: player.is_targeting(),
            health: player.health(),
            abilities: player.abilities(),
            kills: player.kills(),
            deaths: player.deaths(),
            assists: player.assists(),
            kd_ratio: player.kd_ratio(),
            kills_this_round: player.kills_this_round(),
            curr_ult_points: player.curr_ult_points(),
            max_ult_points: player.max_ult_points(),
            ult_ready: player.ult_ready(),
            money: player.money(),
            money_spent: player.money_spent(),
            armor: player.armor_name().to_string(),
            highest_weapon: player.highest_weapon().to_string(),
            team_kills: player.team_kills(),
            headshot_kills: player.headshot_kills(),
            headshot_ratio: player.headshot_ratio(),
            kills_by_weapon: player.kills_by_weapon().clone(),
            kills_on_enemy: player.kills_on_enemy().clone(),
            kills_on_teammate: player.kills_on_teammate().clone(),
        }
    }
}

fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
