use crate::engine::{EngineError, GameTitle, RegistryError};
use crate::ids::{GameLobbyId, PlayerProfileId};
use crate::ledger::ActionLogError;
use crate::table::SeatingError;

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("lobby {0} already started a table")]
    Frozen(GameLobbyId),
    #[error("only the host may do that, not {0}")]
    HostOnly(PlayerProfileId),
    #[error("lobby is not valid and cannot start")]
    NotStartable,
    #[error("game `{0}` is not offered in this lobby")]
    GameNotOffered(GameTitle),
    #[error("lobby is full")]
    LobbyFull,
    #[error("invalid lobby options: {0}")]
    InvalidOptions(String),
    #[error(transparent)]
    Configuration(#[from] RegistryError),
    #[error(transparent)]
    Seating(#[from] SeatingError),
    #[error("processor failed to build the initial entry: {0}")]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Log(#[from] ActionLogError),
}

impl LobbyError {
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }

    /// Configuration and internal faults, as opposed to a peer's bad request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LobbyError::Configuration(_) | LobbyError::Engine(_) | LobbyError::Log(_)
        )
    }
}
