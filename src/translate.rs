//! Translation tables from the game client's internal identifiers to display
//! names. Raw payloads name agents, weapons and maps by engine-internal ids;
//! everything user-facing goes through these lookups.

/// Display name for an agent's internal identifier, covering both the
/// character-blueprint spelling (`Clay_PC_C`) and the bare spelling (`Clay`).
/// Returns `None` for identifiers from client versions newer than this table.
pub fn agent_display(internal: &str) -> Option<&'static str> {
    let name = match internal {
        "Clay_PC_C" | "Clay" => "Raze",
        "Pandemic_PC_C" | "Pandemic" => "Viper",
        "Wraith_PC_C" | "Wraith" => "Omen",
        "Hunter_PC_C" | "Hunter" => "Sova",
        "Thorne_PC_C" | "Thorne" => "Sage",
        "Phoenix_PC_C" | "Phoenix" => "Phoenix",
        "Wushu_PC_C" | "Wushu" => "Jett",
        "Gumshoe_PC_C" | "Gumshoe" => "Cypher",
        "Sarge_PC_C" | "Sarge" => "Brimstone",
        "Breach_PC_C" | "Breach" => "Breach",
        "Vampire_PC_C" | "Vampire" => "Reyna",
        "Killjoy_PC_C" | "Killjoy" => "Killjoy",
        "Guide_PC_C" | "Guide" => "Skye",
        "Stealth_PC_C" | "Stealth" => "Yoru",
        "Rift_PC_C" | "Rift" => "Astra",
        // No slash for overlay image reasons.
        "Grenadier_PC_C" | "Grenadier" => "KAYO",
        "Deadeye_PC_C" | "Deadeye" => "Chamber",
        "Sprinter_PC_C" | "Sprinter" => "Neon",
        "BountyHunter_PC_C" | "BountyHunter" => "Fade",
        "Mage_PC_C" | "Mage" => "Harbor",
        "Aggrobot_PC_C" | "Aggrobot" => "Gekko",
        "Cable_PC_C" | "Cable" => "Deadlock",
        "Sequoia_PC_C" | "Sequoia" => "Iso",
        "Smonk_PC_C" | "Smonk" => "Clove",
        "Nox_PC_C" | "Nox" => "Vyse",
        "Cashew_PC_C" | "Cashew" => "Tejo",
        "Terra_PC_C" | "Terra" => "Waylay",
        _ => return None,
    };
    Some(name)
}

/// Resolve a killfeed assist identifier (`TX_Killfeed_Raze`) to the bare
/// internal agent id the roster uses, so assists can be matched to players.
pub fn killfeed_agent_internal(killfeed_id: &str) -> Option<&'static str> {
    let internal = match killfeed_id {
        "TX_Killfeed_Raze" => "Clay",
        "TX_Killfeed_Viper" => "Pandemic",
        "TX_Killfeed_Omen" => "Wraith",
        "TX_Killfeed_Sova" => "Hunter",
        "TX_Killfeed_Sage" => "Thorne",
        "TX_Killfeed_Phoenix" => "Phoenix",
        "TX_Killfeed_Jett" => "Wushu",
        "TX_Killfeed_Cypher" => "Gumshoe",
        "TX_Killfeed_Brimstone" => "Sarge",
        "TX_Killfeed_Breach" => "Breach",
        "TX_Killfeed_Reyna" => "Vampire",
        "TX_Killfeed_Killjoy" => "Killjoy",
        "TX_Killfeed_Skye" => "Guide",
        "TX_Killfeed_Yoru" => "Stealth",
        "TX_Killfeed_Astra" => "Rift",
        "TX_Killfeed_KAYO" => "Grenadier",
        "TX_Killfeed_Chamber" => "Deadeye",
        "TX_Killfeed_Neon" => "Sprinter",
        "TX_Killfeed_Fade" => "BountyHunter",
        "TX_Killfeed_Harbor" => "Mage",
        "TX_Killfeed_Gekko" => "Aggrobot",
        "TX_Killfeed_Deadlock" => "Cable",
        "TX_Killfeed_Iso" => "Sequoia",
        "TX_Killfeed_Clove" => "Smonk",
        "TX_Killfeed_Vyse" => "Nox",
        "TX_Killfeed_Tejo" => "Cashew",
        "TX_Killfeed_Waylay" => "Terra",
        _ => return None,
    };
    Some(internal)
}

/// Display name for a weapon or damaging-ability identifier as it appears in
/// scoreboard and killfeed payloads. The client has shipped two spellings for
/// most weapons over its lifetime; both are accepted.
pub fn weapon_display(internal: &str) -> Option<&'static str> {
    let name = match internal {
        "TX_Hud_Pistol_Classic" | "TX_Hud_Pistol_Glock_S" => "Classic",
        "TX_Hud_Pistol_Slim" | "TX_Hud_Pistol_SawedOff_S" => "Shorty",
        "TX_Hud_Pistol_AutoPistol" | "TX_Hud_AutoPistol" => "Frenzy",
        "TX_Hud_Pistol_Luger" | "TX_Hud_Pistol_Luger_S" => "Ghost",
        "TX_Hud_Pistol_Sheriff" | "TX_Hud_Pistol_Revolver_S" => "Sheriff",
        "TX_Hud_Shotguns_Pump" | "TX_Hud_Pump" => "Bucky",
        "TX_Hud_Shotguns_Persuader" | "TX_Hud_Shotguns_Spas12_S" => "Judge",
        "TX_Hud_SMGs_Vector" | "TX_Hud_Vector" => "Stinger",
        "TX_Hud_SMGs_Ninja" | "TX_Hud_SMG_MP5_S" => "Spectre",
        "TX_Hud_Rifles_Burst" | "TX_Hud_Burst" => "Bulldog",
        "TX_Hud_Rifles_DMR" | "tx_hud_dmr" => "Guardian",
        "TX_Hud_Rifles_Ghost" | "TX_Hud_Assault_AR10A2_S" => "Phantom",
        "TX_Hud_Rifles_Volcano" | "TX_Hud_Volcano" => "Vandal",
        "TX_Hud_Sniper_Bolt" | "TX_Hud_Sniper_BoltAction_S" => "Marshal",
        "TX_Hud_Sniper_Operater" | "TX_Hud_Operator" => "Operator",
        "TX_Hud_Sniper_DoubleSniper" | "TX_Hud_DoubleSniper" => "Outlaw",
        "TX_Hud_LMG" => "Ares",
        "TX_Hud_HMG" => "Odin",
        "knife" | "TX_Hud_Knife_Standard_S" => "Knife",
        "TX_Breach_FusionBlast" => "Aftershock",
        "TX_Sarge_MolotovLauncher" => "Incendiary",
        "TX_Sarge_OrbitalStrike" => "Orbital Strike (ULT)",
        "TX_Pheonix_FireWall" => "Blaze",
        "TX_Pheonix_Molotov" => "Hot Hands",
        "TX_Hunter_ShockArrow" => "Shock Bolt",
        "TX_Hunter_BowBlast" => "Hunters Fury",
        "TX_Hud_Deadeye_Q_Pistol" => "Headhunter",
        "TX_Hud_Deadeye_X_GiantSlayer" => "Tour de Force (ULT)",
        "TX_Cable_FishingHook" => "Annihilation (ULT)",
        "TX_Hud_Wushu_X_Dagger" => "Blade Storm (ULT)",
        "TX_Neon_Ult" => "Overdrive (ULT)",
        "TX_Thorne_Heal" => "Resurrection (ULT)",
        "TX_Gumshoe_Tripwire" => "Trapwire",
        "TX_Gren_Icon" => "Frag/ment",
        "TX_Aggrobot_Bubbles" => "Mosh Pit",
        "TX_KJ_Bees" => "Nanoswarm",
        "tx_KJ_turret" => "Turret",
        "TX_Clay_Boomba" => "Boom bot",
        "TX_Clay_ClusterBomb" => "Paint Shells",
        "TX_Clay_RocketLauncher" => "Show stopper (ULT)",
        "TX_Guide4" => "Trail blazer",
        "TX_Pandemic_AcidLauncher" => "Snake bite",
        _ => return None,
    };
    Some(name)
}

/// Display name used when a map identifier is not in the table yet; new maps
/// ship in the client before this table learns about them.
pub const FALLBACK_MAP: &str = "Corrode";

/// Display name for a map's internal identifier, falling back to the newest
/// known map.
pub fn map_display(internal: &str) -> &'static str {
    match internal {
        "Infinityy" => "Abyss",
        "Triad" => "Haven",
        "Duality" => "Bind",
        "Bonsai" => "Split",
        "Ascent" => "Ascent",
        "Port" => "Icebox",
        "Foxtrot" => "Breeze",
        "Canyon" => "Fracture",
        "Pitt" => "Pearl",
        "Jam" => "Lotus",
        "Juliett" => "Sunset",
        "Rook" => "Corrode",
        "Range" => "Practice Range",
        "HURM_Alley" => "District",
        "HURM_Yard" => "Piazza",
        "HURM_Bowl" => "Kasbah",
        "HURM_Helix" => "Drift",
        _ => FALLBACK_MAP,
    }
}

/// Armor tier names indexed by the scoreboard's shield field. Index 3 is a
/// gap in the client's own numbering.
pub fn armor_name(index: u8) -> &'static str {
    const ARMOR: [&str; 5] = ["None", "Light", "Heavy", "None", "Regen"];
    ARMOR.get(index as usize).copied().unwrap_or("None")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_lookup_accepts_both_spellings() {
        assert_eq!(agent_display("Clay_PC_C"), Some("Raze"));
        assert_eq!(agent_display("Clay"), Some("Raze"));
        assert_eq!(agent_display("NotAnAgent"), None);
    }

    #[test]
    fn killfeed_assist_resolves_to_roster_internal() {
        let internal = killfeed_agent_internal("TX_Killfeed_Clove").unwrap();
        assert_eq!(agent_display(internal), Some("Clove"));
    }

    #[test]
    fn unknown_map_falls_back_to_newest() {
        assert_eq!(map_display("BrandNewMap"), FALLBACK_MAP);
        assert_eq!(map_display("Triad"), "Haven");
    }

    #[test]
    fn armor_indexes_are_bounded() {
        assert_eq!(armor_name(1), "Light");
        assert_eq!(armor_name(4), "Regen");
        assert_eq!(armor_name(250), "None");
    }
}
