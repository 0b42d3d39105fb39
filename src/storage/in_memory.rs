use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::ids::{GameLobbyId, GameTableId};
use crate::ledger::DbGameTableAction;
use crate::lobby::GameLobby;
use crate::table::GameTable;

use super::{StorageError, TableStorage};

#[derive(Default)]
struct Inner {
    lobbies: HashMap<GameLobbyId, GameLobby>,
    tables: HashMap<GameTableId, GameTable>,
    actions: HashMap<GameTableId, Vec<DbGameTableAction>>,
}

/// Process-local storage used by tests and the demo binary. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryTableStorage {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryTableStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableStorage for InMemoryTableStorage {
    async fn get_lobby(&self, id: &GameLobbyId) -> Result<Option<GameLobby>, StorageError> {
        Ok(self.inner.read().lobbies.get(id).cloned())
    }

    async fn set_lobby(&self, lobby: &GameLobby) -> Result<(), StorageError> {
        self.inner
            .write()
            .lobbies
            .insert(lobby.id.clone(), lobby.clone());
        Ok(())
    }

    async fn get_table(&self, id: &GameTableId) -> Result<Option<GameTable>, StorageError> {
        Ok(self.inner.read().tables.get(id).cloned())
    }

    async fn set_table(&self, table: &GameTable) -> Result<(), StorageError> {
        self.inner
            .write()
            .tables
            .insert(table.id.clone(), table.clone());
        Ok(())
    }

    async fn get_actions(
        &self,
        table_id: &GameTableId,
    ) -> Result<Vec<DbGameTableAction>, StorageError> {
        Ok(self
            .inner
            .read()
            .actions
            .get(table_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_action(&self, action: &DbGameTableAction) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        if !inner.tables.contains_key(&action.game_table_id) {
            return Err(StorageError::not_found("table", &action.game_table_id));
        }
        inner
            .actions
            .entry(action.game_table_id.clone())
            .or_default()
            .push(action.clone());
        Ok(())
    }
}
