use thiserror::Error;

use crate::encoding::EncodedString;
use crate::ids::GameTableId;

use super::hash::{self, StateHash};
use super::types::DbGameTableAction;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionLogError {
    #[error("entry for table {entry} cannot be appended to the log of table {log}")]
    ForeignTable { log: GameTableId, entry: GameTableId },
    #[error("action log for table {0} is empty")]
    Empty(GameTableId),
}

/// Append-only history of a single table.
///
/// Entries are ordered by position; the last one holds the current state.
/// Nothing in this API can rewrite or drop an existing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLog {
    game_table_id: GameTableId,
    entries: Vec<DbGameTableAction>,
}

impl ActionLog {
    pub fn new(game_table_id: GameTableId) -> Self {
        Self {
            game_table_id,
            entries: Vec::new(),
        }
    }

    /// Rebuilds a log from persisted or received entries.
    pub fn from_entries(
        game_table_id: GameTableId,
        entries: Vec<DbGameTableAction>,
    ) -> Result<Self, ActionLogError> {
        if let Some(foreign) = entries.iter().find(|e| e.game_table_id != game_table_id) {
            return Err(ActionLogError::ForeignTable {
                log: game_table_id,
                entry: foreign.game_table_id.clone(),
            });
        }
        Ok(Self {
            game_table_id,
            entries,
        })
    }

    pub fn game_table_id(&self) -> &GameTableId {
        &self.game_table_id
    }

    pub fn append(&mut self, entry: DbGameTableAction) -> Result<&DbGameTableAction, ActionLogError> {
        if entry.game_table_id != self.game_table_id {
            return Err(ActionLogError::ForeignTable {
                log: self.game_table_id.clone(),
                entry: entry.game_table_id,
            });
        }
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn latest(&self) -> Option<&DbGameTableAction> {
        self.entries.last()
    }

    pub fn latest_state_str(&self) -> Result<&EncodedString, ActionLogError> {
        self.latest()
            .map(|entry| &entry.next_game_state_str)
            .ok_or_else(|| ActionLogError::Empty(self.game_table_id.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DbGameTableAction> + '_ {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[DbGameTableAction] {
        &self.entries
    }

    pub fn state_hash(&self) -> StateHash {
        hash::hash_log(&self.game_table_id, &self.entries)
    }
}
