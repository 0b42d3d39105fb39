//! Game-engine processors: the typed plugin contract, its string-erased
//! adapter and the title registry.

mod erased;
pub mod games;
mod processor;
mod registry;
mod types;

pub use erased::{EngineError, ErasedOutcome, ErasedProcessor, GameAdapter, InitialEntry};
pub use processor::GameProcessor;
pub use registry::{GameRegistry, GameRegistryBuilder, RegistryError};
pub use types::{GameDefinition, GameTitle, ProcessorOutcome};

#[cfg(test)]
mod tests {
    use super::games::{HostCommand, Nim, NimMove, TicTacToe};
    use super::*;
    use crate::ids::{GameTableId, PlayerProfileId};
    use crate::table::{GameTable, PlayerSeat, Seats, TablePhase};
    use crate::test_utils::fixed_now;

    fn nim_table() -> GameTable {
        let pool = [PlayerProfileId::new(), PlayerProfileId::new()];
        GameTable {
            id: GameTableId::new(),
            created_at: fixed_now(),
            last_updated_at: fixed_now(),
            game_title: GameTitle::new("nim"),
            game_host_player_profile_id: pool[0].clone(),
            table_phase: TablePhase::Lobby,
            current_status_description: String::new(),
            seats: Seats::from_pool(&pool).unwrap(),
        }
    }

    #[test]
    fn builtin_registry_knows_both_titles() {
        let registry = GameRegistry::with_builtin_games();
        let titles: Vec<_> = registry.titles().map(GameTitle::as_str).collect();
        assert_eq!(titles, vec!["nim", "tic-tac-toe"]);
        let ttt = registry.definition(&GameTitle::new("tic-tac-toe")).unwrap();
        assert_eq!((ttt.min_players, ttt.max_players), (2, 2));
    }

    #[test]
    fn unknown_titles_are_configuration_errors() {
        let registry = GameRegistry::with_builtin_games();
        let missing = GameTitle::new("chess");
        assert_eq!(
            registry.get(&missing).err(),
            Some(RegistryError::UnknownTitle(missing))
        );
    }

    #[test]
    fn builder_rejects_duplicates() {
        let err = GameRegistry::builder()
            .register(Nim::new())
            .unwrap()
            .register(Nim::new())
            .err();
        assert_eq!(err, Some(RegistryError::DuplicateTitle(GameTitle::new("nim"))));

        let registry = GameRegistry::builder()
            .register(TicTacToe::new())
            .unwrap()
            .build();
        assert!(registry.contains(&GameTitle::new("tic-tac-toe")));
        assert!(!registry.contains(&GameTitle::new("nim")));
    }

    #[tokio::test]
    async fn erased_adapter_decodes_action_before_state() {
        let adapter = GameAdapter::new(Nim::new());
        let table = nim_table();
        let initial = adapter.initial_entry(&table).unwrap();
        assert_eq!(initial.action_type, crate::ledger::GameTableActionType::HostStartsSetup);

        let bad_action = adapter
            .apply_player_action(&table, "garbage", PlayerSeat::P1, "also garbage")
            .await;
        assert!(matches!(bad_action, Err(EngineError::MalformedAction(_))));

        let take = adapter
            .inner()
            .player_action_encoder()
            .encode(&NimMove::Take { count: 1 })
            .unwrap();
        let bad_state = adapter
            .apply_player_action(&table, "garbage", PlayerSeat::P1, take.as_str())
            .await;
        assert!(matches!(bad_state, Err(EngineError::CorruptState(_))));
    }

    #[tokio::test]
    async fn erased_adapter_reencodes_outcomes() {
        let adapter = GameAdapter::new(Nim::new());
        let table = nim_table();
        let initial = adapter.initial_entry(&table).unwrap();
        let start = adapter
            .inner()
            .host_action_encoder()
            .encode(&HostCommand::Start)
            .unwrap();
        let outcome = adapter
            .apply_host_action(&table, initial.state_str.as_str(), start.as_str())
            .await
            .unwrap();
        assert_eq!(outcome.table_phase, TablePhase::GameInProgress);
        assert_eq!(outcome.action_str, start);
        assert_eq!(
            adapter.next_to_act(outcome.state_str.as_str()).unwrap(),
            vec![PlayerSeat::P1]
        );
    }
}
