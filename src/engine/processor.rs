use async_trait::async_trait;

use crate::encoding::Encoder;
use crate::ledger::GameTableActionType;
use crate::table::{GameTable, PlayerSeat};

use super::types::{GameDefinition, ProcessorOutcome};

/// Rules of one game title.
///
/// Implementations are stateless: every call receives the table and the
/// current state and returns the next state. Well-formed input must never
/// panic; illegal moves come back as an unchanged phase plus a summary.
#[async_trait]
pub trait GameProcessor: Send + Sync + 'static {
    type State: Send + Sync;
    type PlayerAction: Send + Sync;
    type HostAction: Send + Sync;

    fn definition(&self) -> GameDefinition;

    fn state_encoder(&self) -> &dyn Encoder<Self::State>;
    fn player_action_encoder(&self) -> &dyn Encoder<Self::PlayerAction>;
    fn host_action_encoder(&self) -> &dyn Encoder<Self::HostAction>;

    /// First entry of every log, derived from the freshly seated table.
    fn create_initial_action(&self, table: &GameTable) -> Self::HostAction;

    fn create_initial_state(&self, initial_action: &Self::HostAction) -> Self::State;

    async fn apply_player_action(
        &self,
        table: &GameTable,
        state: &Self::State,
        seat: PlayerSeat,
        action: &Self::PlayerAction,
    ) -> ProcessorOutcome<Self::State>;

    async fn apply_host_action(
        &self,
        table: &GameTable,
        state: &Self::State,
        action: &Self::HostAction,
    ) -> ProcessorOutcome<Self::State>;

    fn next_to_act(&self, state: &Self::State) -> Vec<PlayerSeat>;

    /// Log kind recorded for a host action. Must be one of the `host-*` kinds.
    fn host_action_type(&self, action: &Self::HostAction) -> GameTableActionType;

    /// Log kind recorded for a player action. Must not be a `host-*` kind.
    fn player_action_type(&self, _action: &Self::PlayerAction) -> GameTableActionType {
        GameTableActionType::PlayerMove
    }
}
