use thiserror::Error;

use crate::encoding::{DecodeError, EncodeError};
use crate::engine::{EngineError, RegistryError};
use crate::ids::PlayerProfileId;
use crate::ledger::{ActionLogError, GameTableActionType};

use super::types::TablePhase;

/// Why a submission was not appended. Nothing is logged or broadcast for any
/// of these.
#[derive(Debug, Error)]
pub enum TableSyncError {
    #[error("action payload rejected: {0}")]
    MalformedAction(#[source] DecodeError),
    #[error("player {0} does not occupy a seat at this table")]
    NotSeated(PlayerProfileId),
    #[error("host actions can only be submitted by the host")]
    HostOnly,
    #[error("{submitted} is not a valid {expected} action kind")]
    ActionKindMismatch {
        expected: &'static str,
        submitted: GameTableActionType,
    },
    #[error("table is {0}; no further actions are accepted")]
    GameOver(TablePhase),
    #[error(transparent)]
    Configuration(#[from] RegistryError),
    #[error("stored game state is corrupt: {0}")]
    CorruptState(#[source] DecodeError),
    #[error(transparent)]
    Log(#[from] ActionLogError),
    #[error("failed to encode processor output: {0}")]
    Encode(#[source] EncodeError),
}

impl TableSyncError {
    /// Faults in the host's own configuration or data, as opposed to a bad
    /// submission from a peer.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TableSyncError::Configuration(_)
                | TableSyncError::CorruptState(_)
                | TableSyncError::Log(_)
                | TableSyncError::Encode(_)
        )
    }
}

impl From<EngineError> for TableSyncError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::MalformedAction(inner) => TableSyncError::MalformedAction(inner),
            EngineError::CorruptState(inner) => TableSyncError::CorruptState(inner),
            EngineError::Encode(inner) => TableSyncError::Encode(inner),
            EngineError::ActionKindMismatch {
                expected,
                submitted,
            } => TableSyncError::ActionKindMismatch {
                expected,
                submitted,
            },
        }
    }
}
