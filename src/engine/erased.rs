use async_trait::async_trait;
use thiserror::Error;

use crate::encoding::{DecodeError, EncodeError, EncodedString};
use crate::ledger::GameTableActionType;
use crate::table::{GameTable, PlayerSeat, TablePhase};

use super::processor::GameProcessor;
use super::types::GameDefinition;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("submitted action could not be decoded: {0}")]
    MalformedAction(#[source] DecodeError),
    #[error("stored game state could not be decoded: {0}")]
    CorruptState(#[source] DecodeError),
    #[error("failed to encode processor output: {0}")]
    Encode(#[from] EncodeError),
    #[error("{submitted} is not a valid {expected} action kind")]
    ActionKindMismatch {
        expected: &'static str,
        submitted: GameTableActionType,
    },
}

/// Encoded form of a title's first log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialEntry {
    pub action_type: GameTableActionType,
    pub action_str: EncodedString,
    pub state_str: EncodedString,
}

/// Encoded result of applying one action, ready to be appended to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErasedOutcome {
    pub action_type: GameTableActionType,
    pub action_str: EncodedString,
    pub table_phase: TablePhase,
    pub state_str: EncodedString,
    pub state_summary: String,
}

/// String-in, string-out view of a [`GameProcessor`].
///
/// The synchronizers and the registry only ever hold this trait object, so a
/// title's concrete types never leak past [`GameAdapter`].
#[async_trait]
pub trait ErasedProcessor: Send + Sync {
    fn definition(&self) -> GameDefinition;

    fn initial_entry(&self, table: &GameTable) -> Result<InitialEntry, EngineError>;

    async fn apply_player_action(
        &self,
        table: &GameTable,
        state_str: &str,
        seat: PlayerSeat,
        action_str: &str,
    ) -> Result<ErasedOutcome, EngineError>;

    async fn apply_host_action(
        &self,
        table: &GameTable,
        state_str: &str,
        action_str: &str,
    ) -> Result<ErasedOutcome, EngineError>;

    fn next_to_act(&self, state_str: &str) -> Result<Vec<PlayerSeat>, EngineError>;
}

/// Wraps a typed processor behind [`ErasedProcessor`].
pub struct GameAdapter<P> {
    inner: P,
}

impl<P: GameProcessor> GameAdapter<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn decode_state(&self, state_str: &str) -> Result<P::State, EngineError> {
        self.inner
            .state_encoder()
            .decode(state_str)
            .map_err(EngineError::CorruptState)
    }
}

#[async_trait]
impl<P: GameProcessor> ErasedProcessor for GameAdapter<P> {
    fn definition(&self) -> GameDefinition {
        self.inner.definition()
    }

    fn initial_entry(&self, table: &GameTable) -> Result<InitialEntry, EngineError> {
        let action = self.inner.create_initial_action(table);
        let action_type = self.inner.host_action_type(&action);
        if !action_type.is_host_action() {
            return Err(EngineError::ActionKindMismatch {
                expected: "host",
                submitted: action_type,
            });
        }
        let state = self.inner.create_initial_state(&action);
        Ok(InitialEntry {
            action_type,
            action_str: self.inner.host_action_encoder().encode(&action)?,
            state_str: self.inner.state_encoder().encode(&state)?,
        })
    }

    async fn apply_player_action(
        &self,
        table: &GameTable,
        state_str: &str,
        seat: PlayerSeat,
        action_str: &str,
    ) -> Result<ErasedOutcome, EngineError> {
        let action = self
            .inner
            .player_action_encoder()
            .decode(action_str)
            .map_err(EngineError::MalformedAction)?;
        let action_type = self.inner.player_action_type(&action);
        if action_type.is_host_action() {
            return Err(EngineError::ActionKindMismatch {
                expected: "player",
                submitted: action_type,
            });
        }
        let state = self.decode_state(state_str)?;

        let outcome = self
            .inner
            .apply_player_action(table, &state, seat, &action)
            .await;
        Ok(ErasedOutcome {
            action_type,
            action_str: self.inner.player_action_encoder().encode(&action)?,
            table_phase: outcome.table_phase,
            state_str: self.inner.state_encoder().encode(&outcome.state)?,
            state_summary: outcome.state_summary,
        })
    }

    async fn apply_host_action(
        &self,
        table: &GameTable,
        state_str: &str,
        action_str: &str,
    ) -> Result<ErasedOutcome, EngineError> {
        let action = self
            .inner
            .host_action_encoder()
            .decode(action_str)
            .map_err(EngineError::MalformedAction)?;
        let action_type = self.inner.host_action_type(&action);
        if !action_type.is_host_action() {
            return Err(EngineError::ActionKindMismatch {
                expected: "host",
                submitted: action_type,
            });
        }
        let state = self.decode_state(state_str)?;

        let outcome = self.inner.apply_host_action(table, &state, &action).await;
        Ok(ErasedOutcome {
            action_type,
            action_str: self.inner.host_action_encoder().encode(&action)?,
            table_phase: outcome.table_phase,
            state_str: self.inner.state_encoder().encode(&outcome.state)?,
            state_summary: outcome.state_summary,
        })
    }

    fn next_to_act(&self, state_str: &str) -> Result<Vec<PlayerSeat>, EngineError> {
        let state = self.decode_state(state_str)?;
        Ok(self.inner.next_to_act(&state))
    }
}
