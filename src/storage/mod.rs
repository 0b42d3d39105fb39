//! Local persistence of lobbies, tables and action logs, keyed by id.

mod in_memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::ids::{GameLobbyId, GameTableId};
use crate::ledger::DbGameTableAction;
use crate::lobby::GameLobby;
use crate::table::GameTable;

pub use in_memory::InMemoryTableStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[async_trait]
pub trait TableStorage: Send + Sync {
    async fn get_lobby(&self, id: &GameLobbyId) -> Result<Option<GameLobby>, StorageError>;

    async fn set_lobby(&self, lobby: &GameLobby) -> Result<(), StorageError>;

    async fn get_table(&self, id: &GameTableId) -> Result<Option<GameTable>, StorageError>;

    async fn set_table(&self, table: &GameTable) -> Result<(), StorageError>;

    /// Entries in append order; empty when the table has no log yet.
    async fn get_actions(&self, table_id: &GameTableId)
        -> Result<Vec<DbGameTableAction>, StorageError>;

    async fn append_action(&self, action: &DbGameTableAction) -> Result<(), StorageError>;
}
