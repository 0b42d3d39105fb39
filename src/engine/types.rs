use std::fmt;

use serde::{Deserialize, Serialize};

use crate::table::TablePhase;

/// Registry key of a game, e.g. `tic-tac-toe`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameTitle(String);

impl GameTitle {
    pub fn new(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameTitle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Static facts a title declares about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDefinition {
    pub title: GameTitle,
    pub display_name: String,
    pub min_players: usize,
    pub max_players: usize,
}

impl GameDefinition {
    pub fn accepts_player_count(&self, count: usize) -> bool {
        (self.min_players..=self.max_players).contains(&count)
    }
}

/// Result of applying one action.
///
/// A rule violation is reported by handing back the table's current phase,
/// the untouched state and a summary explaining the refusal.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorOutcome<S> {
    pub table_phase: TablePhase,
    pub state: S,
    pub state_summary: String,
}

impl<S> ProcessorOutcome<S> {
    pub fn new(table_phase: TablePhase, state: S, state_summary: impl Into<String>) -> Self {
        Self {
            table_phase,
            state,
            state_summary: state_summary.into(),
        }
    }
}
