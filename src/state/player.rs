//! Per-player stat state. A player accumulates data from two concurrent
//! sources per round: the authoritative observer scoreboard and the lower
//! precedence auxiliary feed bound to the player's own client. Killfeed lines
//! provide a third, inferred source used only until either scoreboard has
//! reported.

use std::collections::HashMap;

use crate::{
    dto::ingest::{AbilityCharges, KillfeedEntry, RosterUpdate, ScoreboardUpdate},
    translate,
};

/// Money handed to every player on a side-switch pistol round.
const SWITCH_ROUND_MONEY: i32 = 800;

/// Which auxiliary feeds have reported for this player. Scoreboard resets per
/// round; abilities and health persist until the aux client disconnects.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuxAvailability {
    pub health: bool,
    pub abilities: bool,
    pub scoreboard: bool,
}

/// One tracked player, keyed by a stable player identifier and owned by
/// exactly one team.
#[derive(Debug, Clone)]
pub struct Player {
    name: String,
    tagline: String,
    player_id: String,
    /// `name #tagline`, the form observer and aux clients use to reference
    /// players by display identity.
    search_name: String,

    position: u8,
    locked: bool,
    agent_internal: String,
    agent_display: String,

    is_alive: bool,
    has_spike: bool,
    is_observed: bool,
    /// Set while the player channels a map-wide targeting ability.
    is_targeting: bool,

    health: u32,
    abilities: AbilityCharges,

    kills: u32,
    deaths: u32,
    assists: u32,
    kd_ratio: f32,
    kills_this_round: u32,

    curr_ult_points: u32,
    max_ult_points: u32,
    ult_ready: bool,

    money: i32,
    money_spent: i32,
    spent_money_this_round: bool,

    armor_name: &'static str,
    highest_weapon: String,

    // Extrapolated from killfeed lines, updated regardless of scoreboard
    // availability.
    team_kills: u32,
    headshot_kills: u32,
    headshot_ratio: f32,
    kills_by_weapon: HashMap<String, u32>,
    kills_on_enemy: HashMap<String, u32>,
    kills_on_teammate: HashMap<String, u32>,

    /// Primary scoreboard has reported this round; gates all auxiliary and
    /// killfeed-fallback writes to the overlapping counters.
    scoreboard_available: bool,
    aux_available: AuxAvailability,
}

impl Player {
    pub fn new(data: &RosterUpdate) -> Self {
        Self {
            name: data.name.clone(),
            tagline: data.tagline.clone(),
            player_id: data.player_id.clone(),
            search_name: format!("{} #{}", data.name, data.tagline),
            position: data.position,
            locked: data.locked,
            agent_internal: data.agent_internal.clone(),
            agent_display: display_name_for(&data.agent_internal),
            is_alive: true,
            has_spike: false,
            is_observed: false,
            is_targeting: false,
            health: 100,
            abilities: AbilityCharges::default(),
            kills: 0,
            deaths: 0,
            assists: 0,
            kd_ratio: 0.0,
            kills_this_round: 0,
            curr_ult_points: 0,
            max_ult_points: 0,
            ult_ready: false,
            money: 0,
            money_spent: 0,
            spent_money_this_round: false,
            armor_name: translate::armor_name(0),
            highest_weapon: "Unknown".into(),
            team_kills: 0,
            headshot_kills: 0,
            headshot_ratio: 0.0,
            kills_by_weapon: HashMap::new(),
            kills_on_enemy: HashMap::new(),
            kills_on_teammate: HashMap::new(),
            scoreboard_available: false,
            aux_available: AuxAvailability::default(),
        }
    }

    /// Re-apply identity fields when the roster re-announces this player,
    /// e.g. on an agent re-select before lock-in.
    pub fn on_roster_update(&mut self, data: &RosterUpdate) {
        self.name = data.name.clone();
        self.tagline = data.tagline.clone();
        self.search_name = format!("{} #{}", data.name, data.tagline);
        self.agent_internal = data.agent_internal.clone();
        self.agent_display = display_name_for(&data.agent_internal);
        self.locked = data.locked;
    }

    /// Apply an authoritative scoreboard row. Marks the primary source as
    /// reported for this round, locking auxiliary writes out.
    pub fn update_from_scoreboard(&mut self, data: &ScoreboardUpdate) {
        self.apply_scoreboard_row(data);
        self.scoreboard_available = true;
    }

    /// Apply an auxiliary scoreboard row. Merge-only: ignored entirely once
    /// the primary source has reported this round.
    pub fn update_from_aux_scoreboard(&mut self, data: &ScoreboardUpdate) {
        if self.scoreboard_available {
            return;
        }
        self.apply_scoreboard_row(data);
        self.aux_available.scoreboard = true;
    }

    fn apply_scoreboard_row(&mut self, data: &ScoreboardUpdate) {
        if data.kills > self.kills {
            self.kills_this_round += data.kills - self.kills;
        }

        self.agent_internal = data.agent_internal.clone();
        self.agent_display = display_name_for(&data.agent_internal);

        self.kills = data.kills;
        self.deaths = data.deaths;
        self.assists = data.assists;
        self.kd_ratio = self.kills as f32 / self.deaths.max(1) as f32;

        self.curr_ult_points = data.curr_ult_points;
        self.max_ult_points = data.max_ult_points;
        self.ult_ready = self.curr_ult_points >= self.max_ult_points && self.max_ult_points > 0;

        // The first drop below the last known balance marks the buy; from
        // then on every delta this round counts as spending (plant and kill
        // rewards subtract).
        if !self.spent_money_this_round && data.money < self.money {
            self.spent_money_this_round = true;
        }
        if self.spent_money_this_round && data.money != self.money {
            self.money_spent += self.money - data.money;
        }
        self.money = data.money;

        self.armor_name = translate::armor_name(data.initial_shield);
        self.highest_weapon = translate::weapon_display(&data.scoreboard_weapon_internal)
            .unwrap_or("Unknown")
            .to_string();

        if !data.is_alive && self.is_alive {
            self.health = 0;
        }
        if data.is_alive && !self.is_alive {
            self.health = 100;
        }
        self.is_alive = data.is_alive;
        self.has_spike = data.has_spike;
    }

    /// Record extrapolated statistics from a killfeed line where this player
    /// is the attacker. Always applied; these fields have no scoreboard
    /// equivalent to defer to.
    pub fn extract_killfeed_info(&mut self, data: &KillfeedEntry) {
        *self
            .kills_by_weapon
            .entry(data.weapon_killfeed_internal.clone())
            .or_insert(0) += 1;

        if data.headshot_kill {
            self.headshot_kills += 1;
            self.headshot_ratio = self.headshot_kills as f32 / self.kills.max(1) as f32;
        }

        if data.is_teamkill {
            self.team_kills += 1;
            *self.kills_on_teammate.entry(data.victim.clone()).or_insert(0) += 1;
        } else {
            *self.kills_on_enemy.entry(data.victim.clone()).or_insert(0) += 1;
        }
    }

    /// Infer kill/death counters from a killfeed line, but only while no
    /// scoreboard source has reported this round; once one has, the counters
    /// come from it and incrementing here would double count.
    pub fn fallback_killfeed_extraction(&mut self, victim: bool) {
        if self.any_scoreboard_available() {
            return;
        }

        if victim {
            self.is_alive = false;
            self.health = 0;
            self.deaths += 1;
        } else {
            self.kills += 1;
            self.kills_this_round += 1;
        }
    }

    /// Infer an assist, gated the same way as kill/death fallback.
    pub fn fallback_assist_increment(&mut self) {
        if self.any_scoreboard_available() {
            return;
        }
        self.assists += 1;
    }

    /// Update the observed flag from the observer's current camera target.
    pub fn process_observed_event(&mut self, observed_name: &str) {
        self.is_observed = self.search_name == observed_name;
    }

    pub fn update_abilities(&mut self, data: AbilityCharges) {
        self.abilities = data;
        self.aux_available.abilities = true;
    }

    pub fn set_health(&mut self, health: u32) {
        self.health = health;
        self.aux_available.health = true;
    }

    pub fn set_targeting(&mut self, targeting: bool) {
        self.is_targeting = targeting;
    }

    /// Reset per-round derived state at the start of a buy phase. On a
    /// side-switch round money is also forced to the pistol-round value.
    pub fn reset_round_specific_values(&mut self, is_side_switch: bool) {
        self.kills_this_round = 0;
        self.money_spent = 0;
        self.spent_money_this_round = false;

        if is_side_switch {
            self.money = SWITCH_ROUND_MONEY;
        }

        self.scoreboard_available = false;
        self.aux_available.scoreboard = false;
        self.is_alive = true;
        self.health = 100;
    }

    /// Forget all auxiliary availability when the player's aux client drops.
    /// Primary-sourced data is untouched.
    pub fn set_aux_disconnected(&mut self) {
        self.aux_available = AuxAvailability::default();
    }

    fn any_scoreboard_available(&self) -> bool {
        self.scoreboard_available || self.aux_available.scoreboard
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagline(&self) -> &str {
        &self.tagline
    }

    pub fn search_name(&self) -> &str {
        &self.search_name
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn agent_internal(&self) -> &str {
        &self.agent_internal
    }

    pub fn agent_display(&self) -> &str {
        &self.agent_display
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    pub fn has_spike(&self) -> bool {
        self.has_spike
    }

    pub fn is_observed(&self) -> bool {
        self.is_observed
    }

    pub fn is_targeting(&self) -> bool {
        self.is_targeting
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn abilities(&self) -> AbilityCharges {
        self.abilities
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub fn assists(&self) -> u32 {
        self.assists
    }

    pub fn kd_ratio(&self) -> f32 {
        self.kd_ratio
    }

    pub fn kills_this_round(&self) -> u32 {
        self.kills_this_round
    }

    pub fn curr_ult_points(&self) -> u32 {
        self.curr_ult_points
    }

    pub fn max_ult_points(&self) -> u32 {
        self.max_ult_points
    }

    pub fn ult_ready(&self) -> bool {
        self.ult_ready
    }

    pub fn money(&self) -> i32 {
        self.money
    }

    pub fn money_spent(&self) -> i32 {
        self.money_spent
    }

    pub fn armor_name(&self) -> &'static str {
        self.armor_name
    }

    pub fn highest_weapon(&self) -> &str {
        &self.highest_weapon
    }

    pub fn team_kills(&self) -> u32 {
        self.team_kills
    }

    pub fn headshot_kills(&self) -> u32 {
        self.headshot_kills
    }

    pub fn headshot_ratio(&self) -> f32 {
        self.headshot_ratio
    }

    pub fn kills_by_weapon(&self) -> &HashMap<String, u32> {
        &self.kills_by_weapon
    }

    pub fn kills_on_enemy(&self) -> &HashMap<String, u32> {
        &self.kills_on_enemy
    }

    pub fn kills_on_teammate(&self) -> &HashMap<String, u32> {
        &self.kills_on_teammate
    }

    pub fn scoreboard_available(&self) -> bool {
        self.scoreboard_available
    }

    pub fn aux_available(&self) -> AuxAvailability {
        self.aux_available
    }
}

fn display_name_for(agent_internal: &str) -> String {
    translate::agent_display(agent_internal)
        .map(str::to_string)
        .unwrap_or_else(|| agent_internal.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_row(id: &str, name: &str) -> RosterUpdate {
        RosterUpdate {
            name: name.into(),
            tagline: "EU".into(),
            start_team: 0,
            agent_internal: "Wushu".into(),
            player_id: id.into(),
            position: 0,
            locked: true,
            rank: 20,
        }
    }

    fn scoreboard_row(id: &str, kills: u32, money: i32) -> ScoreboardUpdate {
        ScoreboardUpdate {
            name: "p".into(),
            tagline: "EU".into(),
            player_id: id.into(),
            start_team: 0,
            agent_internal: "Wushu".into(),
            is_alive: true,
            initial_shield: 1,
            scoreboard_weapon_internal: "TX_Hud_Rifles_Volcano".into(),
            curr_ult_points: 2,
            max_ult_points: 7,
            has_spike: false,
            money: kills as i32 * 200 + money,
            kills,
            deaths: 0,
            assists: 0,
        }
    }

    fn killfeed_line(attacker: &str, victim: &str) -> KillfeedEntry {
        KillfeedEntry {
            attacker: attacker.into(),
            victim: victim.into(),
            weapon_killfeed_internal: "TX_Hud_Volcano".into(),
            headshot_kill: true,
            assists: vec![],
            is_teamkill: false,
        }
    }

    #[test]
    fn killfeed_fallback_applies_until_scoreboard_reports() {
        let mut player = Player::new(&roster_row("p1", "alpha"));

        player.extract_killfeed_info(&killfeed_line("alpha", "bravo"));
        player.fallback_killfeed_extraction(false);
        assert_eq!(player.kills(), 1);
        assert_eq!(player.kills_this_round(), 1);

        player.update_from_scoreboard(&scoreboard_row("p1", 1, 0));

        player.extract_killfeed_info(&killfeed_line("alpha", "charlie"));
        player.fallback_killfeed_extraction(false);
        // Counter now comes from the scoreboard; the extrapolated weapon
        // tally still advances.
        assert_eq!(player.kills(), 1);
        assert_eq!(player.kills_by_weapon()["TX_Hud_Volcano"], 2);
    }

    #[test]
    fn aux_scoreboard_never_overwrites_primary_data() {
        let mut player = Player::new(&roster_row("p1", "alpha"));
        player.update_from_scoreboard(&scoreboard_row("p1", 3, 100));

        let mut aux = scoreboard_row("p1", 9, 4000);
        aux.deaths = 9;
        player.update_from_aux_scoreboard(&aux);

        assert_eq!(player.kills(), 3);
        assert_eq!(player.deaths(), 0);
        assert!(!player.aux_available().scoreboard);
    }

    #[test]
    fn aux_scoreboard_fills_in_before_primary() {
        let mut player = Player::new(&roster_row("p1", "alpha"));
        player.update_from_aux_scoreboard(&scoreboard_row("p1", 2, 0));
        assert_eq!(player.kills(), 2);
        assert!(player.aux_available().scoreboard);

        // Primary arriving later still wins.
        player.update_from_scoreboard(&scoreboard_row("p1", 4, 0));
        assert_eq!(player.kills(), 4);
        assert!(player.scoreboard_available());
    }

    #[test]
    fn money_spent_accumulates_after_first_drop() {
        let mut player = Player::new(&roster_row("p1", "alpha"));
        player.update_from_scoreboard(&scoreboard_row("p1", 0, 4000));
        assert_eq!(player.money_spent(), 0);

        player.update_from_scoreboard(&scoreboard_row("p1", 0, 1100));
        assert_eq!(player.money_spent(), 2900);

        player.reset_round_specific_values(false);
        assert_eq!(player.money_spent(), 0);
        assert_eq!(player.money(), 1100);
    }

    #[test]
    fn side_switch_reset_forces_pistol_money() {
        let mut player = Player::new(&roster_row("p1", "alpha"));
        player.update_from_scoreboard(&scoreboard_row("p1", 0, 3900));
        player.reset_round_specific_values(true);
        assert_eq!(player.money(), SWITCH_ROUND_MONEY);
        assert!(player.is_alive());
        assert!(!player.scoreboard_available());
    }

    #[test]
    fn aux_disconnect_clears_only_aux_flags() {
        let mut player = Player::new(&roster_row("p1", "alpha"));
        player.update_from_scoreboard(&scoreboard_row("p1", 1, 0));
        player.set_health(42);
        player.update_abilities(AbilityCharges {
            grenade: 1,
            ability1: 2,
            ability2: 0,
        });

        player.set_aux_disconnected();
        assert!(!player.aux_available().health);
        assert!(!player.aux_available().abilities);
        assert!(player.scoreboard_available());
        assert_eq!(player.kills(), 1);
    }

    #[test]
    fn observed_flag_tracks_search_name() {
        let mut player = Player::new(&roster_row("p1", "alpha"));
        player.process_observed_event("alpha #EU");
        assert!(player.is_observed());
        player.process_observed_event("someone #NA");
        assert!(!player.is_observed());
    }
}
