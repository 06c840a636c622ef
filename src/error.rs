use thiserror::Error;

use crate::persistence::PersistenceError;

/// Reasons an inbound telemetry event is rejected. A rejected event mutates
/// nothing and does not advance the match's event number.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Roster row arrived without a player id, name, or tagline.
    #[error("roster row is missing player identity fields")]
    MalformedRoster,
    /// Roster row would exceed the five-player cap.
    #[error("team `{team}` roster is full, dropped roster row for `{player}`")]
    TeamFull { team: String, player: String },
    /// Event referenced a side id neither team owns.
    #[error("no team with side id {side}")]
    UnknownSide { side: u8 },
    /// No live match is registered for the event's group code.
    #[error("no live match for group code `{group_code}`")]
    UnknownGroupCode { group_code: String },
    /// The persistence collaborator refused to register the match. State has
    /// already been mutated; the session should be told registration did not
    /// fully succeed.
    #[error("match registration failed")]
    Registration(#[source] PersistenceError),
}

/// Reasons a session-start request is rejected by the registry.
#[derive(Debug, Error)]
pub enum CreateMatchError {
    /// The group code is held by a live match and the supplied secret does
    /// not match it. Distinct from a reconnect, which succeeds.
    #[error("group code `{group_code}` is already in use")]
    GroupCodeInUse { group_code: String },
    /// The request failed field validation.
    #[error("invalid session-start request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),
}
