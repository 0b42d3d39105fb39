use thiserror::Error;

use crate::ids::{GameLobbyId, GameTableId};
use crate::lobby::LobbyError;
use crate::storage::StorageError;
use crate::table::TableSyncError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Lobby(#[from] LobbyError),
    #[error(transparent)]
    Table(#[from] TableSyncError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("table {0} has no persisted state to resume from")]
    NothingToResume(GameTableId),
    #[error("lobby {0} has not started a table yet")]
    NoTable(GameLobbyId),
    #[error("session has already left its room")]
    Closed,
}

impl SessionError {
    /// True for failures a peer caused with a bad request; the session keeps running.
    pub fn is_rejection(&self) -> bool {
        match self {
            SessionError::Lobby(err) => !err.is_fatal(),
            SessionError::Table(err) => !err.is_fatal(),
            _ => false,
        }
    }
}
