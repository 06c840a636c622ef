//! Session-start contract: the payload an authenticated transport session
//! hands the registry to create (or reconnect to) a live match, including the
//! overlay/tools configuration block.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Everything the transport supplies after a successful authentication
/// handshake. Consumed by the registry; never constructed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    /// Display name of the observer session.
    pub obs_name: String,
    /// Group code keying the live match.
    pub group_code: String,
    /// Shared secret used to match a reconnecting session to its live match.
    pub group_secret: String,
    /// Client version string; compatibility is checked by the transport.
    pub client_version: String,
    /// Organization the session's ingest key belongs to, when known.
    #[serde(default)]
    pub organization_id: Option<String>,
    pub left_team: TeamIdentity,
    pub right_team: TeamIdentity,
    /// Overlay/tools configuration, carried into every snapshot.
    #[serde(default)]
    pub tools_data: ToolsConfig,
}

impl Validate for CreateMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.obs_name.is_empty() || self.obs_name.len() > 64 {
            errors.add("obs_name", ValidationError::new("obs_name_length"));
        }
        if let Err(e) = validate_group_code(&self.group_code) {
            errors.add("group_code", e);
        }
        if self.group_secret.is_empty() {
            errors.add("group_secret", ValidationError::new("group_secret_empty"));
        }
        if self.left_team.attack_start == self.right_team.attack_start {
            errors.add("left_team", ValidationError::new("both_teams_same_side"));
        }

        errors.merge_self("left_team", self.left_team.validate());
        errors.merge_self("right_team", self.right_team.validate());

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Validates that a group code is 1 to 16 ASCII alphanumeric characters.
fn validate_group_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || code.len() > 16 {
        let mut err = ValidationError::new("group_code_length");
        err.message =
            Some(format!("group code must be 1-16 characters (got {})", code.len()).into());
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("group_code_charset");
        err.message = Some("group code must contain only ASCII alphanumerics".into());
        return Err(err);
    }

    Ok(())
}

/// Identity of one side as supplied at session start.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeamIdentity {
    /// Full display name shown on the overlay.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Short code, up to five characters.
    #[validate(length(max = 5))]
    pub tricode: String,
    /// Logo URL, may be empty.
    #[serde(default)]
    pub url: String,
    /// Whether this side starts on attack.
    pub attack_start: bool,
}

/// Overlay/tools configuration block. Every field is optional on the wire;
/// defaults are applied here at deserialization rather than scattered through
/// the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// Full timeout duration in seconds.
    pub timeout_duration: u64,
    /// Window after a timeout request during which the same side can cancel
    /// it for free, in seconds.
    pub timeout_cancellation_grace_period: u64,
    /// Remaining timeouts per side at match start.
    pub timeout_counter: TimeoutCounter,
    /// Best-of-N series context, when the match is part of one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_info: Option<SeriesInfo>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_duration: 60,
            timeout_cancellation_grace_period: 5,
            timeout_counter: TimeoutCounter::default(),
            series_info: None,
        }
    }
}

/// Remaining timeout counts per side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutCounter {
    pub left: u8,
    pub right: u8,
}

impl Default for TimeoutCounter {
    fn default() -> Self {
        Self { left: 1, right: 1 }
    }
}

/// Best-of-N series state shown alongside the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesInfo {
    /// Maps needed to win the series.
    pub needed: u32,
    pub won_left: u32,
    pub won_right: u32,
    #[serde(default)]
    pub map_info: Vec<MapPoolEntry>,
}

/// One entry of the series map pool, in played order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MapPoolEntry {
    /// Already played; carries the final score.
    Past {
        map: String,
        left: MapPoolResult,
        right: MapPoolResult,
    },
    /// The map this match is being played on.
    Present { logo: String },
    /// Not yet played.
    Future { map: String, logo: String },
}

/// One side's result on a completed series map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapPoolResult {
    pub logo: String,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_json() -> &'static str {
        r#"{
            "obsName": "main-obs",
            "groupCode": "ABC123",
            "groupSecret": "s3cret",
            "clientVersion": "1.4.2",
            "leftTeam": { "name": "Alpha", "tricode": "ALP", "url": "", "attackStart": true },
            "rightTeam": { "name": "Bravo", "tricode": "BRV", "url": "", "attackStart": false },
            "toolsData": { "timeoutDuration": 45 }
        }"#
    }

    #[test]
    fn defaults_fill_missing_tools_fields() {
        let request: CreateMatchRequest = serde_json::from_str(request_json()).unwrap();
        request.validate().unwrap();
        assert_eq!(request.tools_data.timeout_duration, 45);
        assert_eq!(request.tools_data.timeout_cancellation_grace_period, 5);
        assert_eq!(request.tools_data.timeout_counter.left, 1);
        assert!(request.tools_data.series_info.is_none());
    }

    #[test]
    fn group_code_charset_is_validated() {
        let mut request: CreateMatchRequest = serde_json::from_str(request_json()).unwrap();
        request.group_code = "not a code!".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn series_map_pool_round_trips() {
        let raw = r#"{
            "needed": 2,
            "wonLeft": 1,
            "wonRight": 0,
            "mapInfo": [
                { "type": "past", "map": "Haven", "left": { "logo": "", "score": 13 }, "right": { "logo": "", "score": 7 } },
                { "type": "present", "logo": "alpha.png" },
                { "type": "future", "map": "Bind", "logo": "bravo.png" }
            ]
        }"#;
        let series: SeriesInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(series.map_info.len(), 3);
        assert!(matches!(series.map_info[1], MapPoolEntry::Present { .. }));
    }
}
