//! Inbound telemetry wire types for the primary observer stream and the
//! player-bound auxiliary streams.

use serde::{Deserialize, Serialize};

use crate::state::phase::RoundPhase;

/// One decoded event from the authoritative observer client, scoped to a
/// group code. The timestamp is assigned by the transport when the frame is
/// received, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverEvent {
    /// Display name of the observer session that produced the event.
    #[serde(rename = "obsName")]
    pub observer_name: String,
    /// Group code routing the event to one live match.
    #[serde(rename = "groupCode")]
    pub group_code: String,
    /// Server-assigned receive timestamp (ms).
    pub timestamp: u64,
    /// Typed payload.
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// One decoded event from an auxiliary (player-bound) client, scoped to a
/// match identifier rather than a group code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxEvent {
    /// Match identifier used to fan the event out to observing matches.
    #[serde(rename = "matchId")]
    pub match_id: String,
    /// Stable identifier of the player the sending client is bound to.
    #[serde(rename = "playerId")]
    pub player_id: String,
    /// Server-assigned receive timestamp (ms).
    pub timestamp: u64,
    /// Typed payload.
    #[serde(flatten)]
    pub payload: AuxPayload,
}

/// Every event kind the primary stream can carry. Closed: an unknown
/// discriminant fails deserialization at the transport boundary instead of
/// reaching the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    /// Agent-select and lock-in state for one player slot.
    Roster(RosterUpdate),
    /// Authoritative per-player scoreboard row.
    Scoreboard(ScoreboardUpdate),
    /// One kill as shown in the killfeed.
    Killfeed(KillfeedEntry),
    /// Round number plus phase, applied verbatim to the match.
    RoundInfo(RoundInfo),
    /// Aggregate score pair for both sides.
    Score(ScorePair),
    /// Internal map identifier.
    Map(String),
    /// Game mode variant; controls side-switch thresholds.
    GameMode(GameMode),
    /// Search name of the player currently on the observer's screen.
    Observing(String),
    SpikePlanted,
    SpikeDetonated,
    SpikeDefused,
    /// Toggles the technical pause flag.
    TechPause,
    /// Timeout request for the left side.
    LeftTimeout,
    /// Timeout request for the right side.
    RightTimeout,
    /// Carries the match identifier assigned once play starts.
    MatchStart(String),
}

/// Auxiliary event kinds, all bound to the sending player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AuxPayload {
    /// Partial scoreboard row for the sending player.
    AuxScoreboard(ScoreboardUpdate),
    /// Scoreboard rows for the sending player's whole team.
    AuxScoreboardTeam(Vec<ScoreboardUpdate>),
    /// Current ability charge counts.
    AuxAbilities(AbilityCharges),
    /// Current health value.
    AuxHealth(u32),
    /// Whether the player is actively targeting with a map-wide ability.
    AuxTargeting(bool),
}

/// Per-player scoreboard row as the client reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardUpdate {
    pub name: String,
    pub tagline: String,
    pub player_id: String,
    /// Side id (0/1) the player's team started on.
    pub start_team: u8,
    /// Internal agent identifier, translated for display.
    pub agent_internal: String,
    pub is_alive: bool,
    /// Armor tier index.
    pub initial_shield: u8,
    /// Internal identifier of the highest-value weapon held.
    pub scoreboard_weapon_internal: String,
    pub curr_ult_points: u32,
    pub max_ult_points: u32,
    pub has_spike: bool,
    pub money: i32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
}

/// One killfeed line. Attacker/victim/assists are display names, the weapon
/// is an internal identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillfeedEntry {
    pub attacker: String,
    pub victim: String,
    pub weapon_killfeed_internal: String,
    pub headshot_kill: bool,
    /// Internal agent identifiers of assisting players.
    pub assists: Vec<String>,
    pub is_teamkill: bool,
}

/// Agent-select roster row for one player slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpdate {
    pub name: String,
    pub tagline: String,
    /// Side id (0/1) the player's team starts on.
    pub start_team: u8,
    pub agent_internal: String,
    pub player_id: String,
    /// Slot position within the team (0..5).
    pub position: u8,
    pub locked: bool,
    pub rank: u32,
}

/// Round number plus phase carried by a `round_info` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundInfo {
    pub round_number: u32,
    pub round_phase: RoundPhase,
}

/// Aggregate rounds-won pair, keyed by side id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScorePair {
    pub team_0: u32,
    pub team_1: u32,
}

/// Ability charge counts reported by an auxiliary client.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AbilityCharges {
    pub grenade: u32,
    #[serde(rename = "ability_1")]
    pub ability1: u32,
    #[serde(rename = "ability_2")]
    pub ability2: u32,
}

/// Game mode variant. Unknown modes fall back to the defuse-style default the
/// way older clients expect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Swift,
    #[default]
    Bomb,
}

impl<'de> Deserialize<'de> for GameMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "swift" => GameMode::Swift,
            _ => GameMode::Bomb,
        })
    }
}

impl GameMode {
    /// Round at which sides first swap.
    pub fn switch_round(self) -> u32 {
        match self {
            GameMode::Swift => 5,
            GameMode::Bomb => 13,
        }
    }

    /// Round at which overtime side-swapping begins every round. Swift mode
    /// has no overtime, expressed as a round number never reached.
    pub fn first_overtime_round(self) -> u32 {
        match self {
            GameMode::Swift => 99,
            GameMode::Bomb => 25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_info_event_deserializes() {
        let raw = r#"{
            "obsName": "main-obs",
            "groupCode": "ABC123",
            "timestamp": 1700000000000,
            "type": "round_info",
            "data": { "roundNumber": 3, "roundPhase": "combat" }
        }"#;
        let event: ObserverEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.group_code, "ABC123");
        match event.payload {
            EventPayload::RoundInfo(info) => {
                assert_eq!(info.round_number, 3);
                assert_eq!(info.round_phase, RoundPhase::Combat);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn unit_payloads_tolerate_missing_data() {
        let raw = r#"{
            "obsName": "main-obs",
            "groupCode": "ABC123",
            "timestamp": 1700000000000,
            "type": "spike_planted"
        }"#;
        let event: ObserverEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event.payload, EventPayload::SpikePlanted));
    }

    #[test]
    fn unknown_event_kind_is_rejected() {
        let raw = r#"{
            "obsName": "main-obs",
            "groupCode": "ABC123",
            "timestamp": 1700000000000,
            "type": "wallhack_report",
            "data": true
        }"#;
        assert!(serde_json::from_str::<ObserverEvent>(raw).is_err());
    }

    #[test]
    fn unknown_game_mode_falls_back_to_bomb() {
        let mode: GameMode = serde_json::from_str("\"deathmatch\"").unwrap();
        assert_eq!(mode, GameMode::Bomb);
        assert_eq!(mode.switch_round(), 13);
    }

    #[test]
    fn aux_event_deserializes() {
        let raw = r#"{
            "matchId": "m-1",
            "playerId": "p-9",
            "timestamp": 1700000000000,
            "type": "aux_health",
            "data": 37
        }"#;
        let event: AuxEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event.payload, AuxPayload::AuxHealth(37)));
    }
}
