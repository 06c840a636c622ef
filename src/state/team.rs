//! Team aggregate: roster of up to five players, side tracking, per-round
//! economy aggregation, and the ordered round-outcome record.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::{
    dto::ingest::{AbilityCharges, KillfeedEntry, RosterUpdate, ScoreboardUpdate},
    dto::session::TeamIdentity,
    error::IngestError,
    state::player::Player,
    translate,
};

/// Hard roster cap per team.
pub const MAX_PLAYERS: usize = 5;

/// Number of round-record slots pre-opened at match start; the record grows
/// past this in overtime.
const INITIAL_ROUND_SLOTS: u32 = 10;

/// Terminal (or pending) state of one round from this team's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundResult {
    /// Slot opened, round not yet attributed.
    Upcoming,
    /// Won as attackers by detonating the spike.
    Detonated,
    /// Won as defenders by defusing the spike.
    Defused,
    /// Won by eliminating the opposing team.
    Kills,
    /// Won as defenders by running the clock out.
    Timeout,
    /// Lost the round, any reason.
    Lost,
}

/// One slot in the round-outcome record.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoundRecordEntry {
    #[serde(rename = "type")]
    pub result: RoundResult,
    /// Whether this team was attacking when the slot was written.
    pub was_attack: bool,
    /// 1-based round number.
    pub round: u32,
}

/// One of the two sides of a live match.
#[derive(Debug, Clone)]
pub struct Team {
    name: String,
    tricode: String,
    logo_url: String,
    /// Side id (0 = starts attacking, 1 = starts defending), the key used to
    /// route scoreboard and roster events.
    side_id: u8,
    is_attacking: bool,
    rounds_won: u32,
    spent_this_round: i32,
    round_record: Vec<RoundRecordEntry>,
    /// Players keyed by stable id, kept in roster-arrival order.
    players: IndexMap<String, Player>,
    has_duplicate_agents: bool,
}

impl Team {
    pub fn new(identity: &TeamIdentity) -> Self {
        let is_attacking = identity.attack_start;
        let mut team = Self {
            name: identity.name.clone(),
            tricode: identity.tricode.clone(),
            logo_url: identity.url.clone(),
            side_id: if identity.attack_start { 0 } else { 1 },
            is_attacking,
            rounds_won: 0,
            spent_this_round: 0,
            round_record: Vec::new(),
            players: IndexMap::new(),
            has_duplicate_agents: false,
        };
        team.init_round_record();
        team
    }

    fn init_round_record(&mut self) {
        for round in 1..=INITIAL_ROUND_SLOTS {
            self.round_record.push(RoundRecordEntry {
                result: RoundResult::Upcoming,
                was_attack: self.is_attacking,
                round,
            });
        }
    }

    /// Apply a roster row: update the known player, or create one while the
    /// roster has room. Incomplete rows and over-cap rows are rejected.
    pub fn apply_roster(&mut self, data: &RosterUpdate) -> Result<(), IngestError> {
        if data.player_id.is_empty() || data.name.is_empty() || data.tagline.is_empty() {
            return Err(IngestError::MalformedRoster);
        }

        if let Some(player) = self.players.get_mut(&data.player_id) {
            player.on_roster_update(data);
            return Ok(());
        }

        if self.players.len() >= MAX_PLAYERS {
            return Err(IngestError::TeamFull {
                team: self.name.clone(),
                player: data.name.clone(),
            });
        }

        self.players
            .insert(data.player_id.clone(), Player::new(data));
        self.is_attacking = data.start_team == 0;
        Ok(())
    }

    /// Apply an authoritative scoreboard row to the matching player and
    /// refresh the team economy aggregate. Rows for unknown players are
    /// ignored; the roster event simply has not arrived yet.
    pub fn apply_scoreboard(&mut self, data: &ScoreboardUpdate) {
        let Some(player) = self.players.get_mut(&data.player_id) else {
            return;
        };
        player.update_from_scoreboard(data);
        self.spent_this_round = self.total_money_spent();
    }

    /// Apply an auxiliary scoreboard row to the matching player.
    pub fn apply_aux_scoreboard(&mut self, data: &ScoreboardUpdate) {
        if let Some(player) = self.players.get_mut(&data.player_id) {
            player.update_from_aux_scoreboard(data);
        }
    }

    /// Route a killfeed line to attacker, victim, and assisting players on
    /// this team. Either side of the line may belong to the other team; a
    /// miss here is normal.
    pub fn apply_killfeed(&mut self, data: &KillfeedEntry) {
        let attacker_found = {
            let attacker = self
                .players
                .values_mut()
                .find(|player| player.name() == data.attacker);
            if let Some(attacker) = attacker {
                attacker.extract_killfeed_info(data);
                attacker.fallback_killfeed_extraction(false);
                true
            } else {
                false
            }
        };

        // Assists only name an agent; with duplicate agents on the roster
        // the mapping back to a player is ambiguous and skipped.
        if attacker_found && !self.has_duplicate_agents {
            for assist in &data.assists {
                let Some(internal) = translate::killfeed_agent_internal(assist) else {
                    warn!(assist, "unrecognized killfeed assist identifier");
                    continue;
                };
                if let Some(assister) = self
                    .players
                    .values_mut()
                    .find(|player| player.agent_internal() == internal)
                {
                    assister.fallback_assist_increment();
                }
            }
        }

        if let Some(victim) = self
            .players
            .values_mut()
            .find(|player| player.name() == data.victim)
        {
            victim.fallback_killfeed_extraction(true);
        }
    }

    /// Update ability charges from the auxiliary feed.
    pub fn apply_aux_abilities(&mut self, player_id: &str, data: AbilityCharges) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.update_abilities(data);
        }
    }

    /// Update health from the auxiliary feed.
    pub fn apply_aux_health(&mut self, player_id: &str, health: u32) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.set_health(health);
        }
    }

    /// Update the targeting flag from the auxiliary feed.
    pub fn apply_aux_targeting(&mut self, player_id: &str, targeting: bool) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.set_targeting(targeting);
        }
    }

    /// Update every player's observed flag against the current camera target.
    pub fn set_observed_player(&mut self, observed_name: &str) {
        for player in self.players.values_mut() {
            player.process_observed_event(observed_name);
        }
    }

    /// Scan the roster for duplicate agent selections; run on combat start,
    /// once lock-ins are final.
    pub fn find_duplicate_agents(&mut self) {
        let mut seen: Vec<&str> = Vec::with_capacity(self.players.len());
        for player in self.players.values() {
            if seen.contains(&player.agent_internal()) {
                self.has_duplicate_agents = true;
                return;
            }
            seen.push(player.agent_internal());
        }
    }

    pub fn switch_sides(&mut self) {
        self.is_attacking = !self.is_attacking;
    }

    /// Reset all players' per-round derived values at buy-phase start.
    pub fn reset_round_specific_values(&mut self, is_side_switch: bool) {
        for player in self.players.values_mut() {
            player.reset_round_specific_values(is_side_switch);
        }
    }

    /// Write the outcome for `round_number` and open the next slot as
    /// upcoming. The record grows as overtime pushes past the pre-opened
    /// slots.
    pub fn add_round_reason(&mut self, result: RoundResult, round_number: u32) {
        let index = round_number.saturating_sub(1) as usize;
        let needed = index + 2;
        while self.round_record.len() < needed {
            let round = self.round_record.len() as u32 + 1;
            self.round_record.push(RoundRecordEntry {
                result: RoundResult::Upcoming,
                was_attack: self.is_attacking,
                round,
            });
        }

        self.round_record[index] = RoundRecordEntry {
            result,
            was_attack: self.is_attacking,
            round: round_number,
        };
        self.round_record[index + 1] = RoundRecordEntry {
            result: RoundResult::Upcoming,
            was_attack: self.is_attacking,
            round: round_number + 1,
        };
    }

    /// Clear a dropped aux client's availability flags on the matching
    /// player.
    pub fn set_aux_disconnected(&mut self, player_id: &str) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.set_aux_disconnected();
        }
    }

    /// Last known money for a player, used by the plant-bonus heuristic.
    pub fn money_for(&self, player_id: &str) -> Option<i32> {
        self.players.get(player_id).map(Player::money)
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    fn total_money_spent(&self) -> i32 {
        self.players.values().map(Player::money_spent).sum()
    }

    pub fn alive_players(&self) -> usize {
        self.players.values().filter(|p| p.is_alive()).count()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tricode(&self) -> &str {
        &self.tricode
    }

    pub fn logo_url(&self) -> &str {
        &self.logo_url
    }

    pub fn side_id(&self) -> u8 {
        self.side_id
    }

    pub fn is_attacking(&self) -> bool {
        self.is_attacking
    }

    pub fn rounds_won(&self) -> u32 {
        self.rounds_won
    }

    pub fn set_rounds_won(&mut self, rounds: u32) {
        self.rounds_won = rounds;
    }

    pub fn spent_this_round(&self) -> i32 {
        self.spent_this_round
    }

    pub fn round_record(&self) -> &[RoundRecordEntry] {
        &self.round_record
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn has_duplicate_agents(&self) -> bool {
        self.has_duplicate_agents
    }
}
