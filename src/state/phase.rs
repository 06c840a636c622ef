use serde::{Deserialize, Serialize};

/// Stages of a round as the client reports them. Values are applied verbatim
/// from `round_info` events; the engine never invents a transition on its
/// own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Pre-game lobby, before the first buy phase.
    #[default]
    #[serde(rename = "LOBBY")]
    Lobby,
    /// Buy phase.
    Shopping,
    /// Live round.
    Combat,
    /// Round over, waiting for the next buy phase.
    End,
    /// Match over. Terminal: the match is torn down on this transition.
    GameEnd,
}

impl RoundPhase {
    /// Whether this phase ends the match.
    pub fn is_terminal(self) -> bool {
        matches!(self, RoundPhase::GameEnd)
    }
}
