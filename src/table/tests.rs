use std::sync::Arc;

use super::*;
use crate::encoding::EncodedString;
use crate::engine::games::{HostCommand, Nim, NimMove, TicTacToe, TicTacToeMove};
use crate::engine::{GameProcessor, GameRegistry, GameTitle, RegistryError};
use crate::ids::PlayerProfileId;
use crate::ledger::{ActionLog, ActionSource, DbGameTableAction, GameTableActionType};
use crate::lobby::{LobbyHost, LobbyMove, LobbyOptions};
use crate::test_utils::{fixed_now, public_profile, registry, serde::assert_round_trip_eq};

struct Fixture {
    registry: Arc<GameRegistry>,
    host: TableHost,
    host_id: PlayerProfileId,
    players: Vec<PlayerProfileId>,
}

fn start_table(title: &str, extra_players: usize) -> Fixture {
    let registry = registry();
    let host_profile = public_profile("host");
    let host_id = host_profile.id.clone();
    let mut lobby = LobbyHost::new(
        Arc::clone(&registry),
        host_profile,
        "table tests",
        LobbyOptions::default(),
        fixed_now(),
    )
    .unwrap();
    lobby
        .apply_move(
            &host_id,
            &LobbyMove::SetGameChoice {
                game_choice: GameTitle::new(title),
            },
            fixed_now(),
        )
        .unwrap();
    let mut players = vec![host_id.clone()];
    players.extend((0..extra_players).map(|_| PlayerProfileId::new()));
    for player in &players {
        lobby.apply_move(player, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    }
    let started = lobby.start_game(&host_id, fixed_now()).unwrap();
    let host = TableHost::new(&registry, started.table, started.log).unwrap();
    Fixture {
        registry,
        host,
        host_id,
        players,
    }
}

fn host_command(command: &HostCommand) -> String {
    Nim::new()
        .host_action_encoder()
        .encode(command)
        .unwrap()
        .into_inner()
}

fn nim_move(mv: &NimMove) -> String {
    Nim::new().player_action_encoder().encode(mv).unwrap().into_inner()
}

async fn started_nim(players: usize) -> Fixture {
    let mut fixture = start_table("nim", players - 1);
    fixture
        .host
        .submit_host_action(&host_command(&HostCommand::Start), fixed_now())
        .await
        .unwrap();
    fixture
}

#[tokio::test]
async fn host_start_action_opens_the_game() {
    let mut fixture = start_table("nim", 1);
    let snapshot = fixture
        .host
        .submit_host_action(&host_command(&HostCommand::Start), fixed_now())
        .await
        .unwrap();
    assert_eq!(snapshot.table.table_phase, TablePhase::GameInProgress);
    assert_eq!(snapshot.actions.len(), 2);
    let entry = snapshot.actions.last().unwrap();
    assert_eq!(entry.source, ActionSource::Host);
    assert_eq!(entry.action_type, GameTableActionType::HostStartsGame);
    assert!(snapshot.table.current_status_description.contains("p1 to move"));
}

#[tokio::test]
async fn malformed_action_is_dropped_without_touching_the_log() {
    let mut fixture = started_nim(2).await;
    let before = fixture.host.snapshot();
    let p1 = fixture.players[0].clone();

    for payload in ["", "{", r#"{"type":"take"}"#, r#"{"type":"take","count":0}"#, r#"{"type":"fly"}"#] {
        let err = fixture
            .host
            .submit_player_action(&p1, payload, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, TableSyncError::MalformedAction(_)), "{payload}: {err}");
        assert!(!err.is_fatal());
    }
    assert_eq!(fixture.host.snapshot(), before);
}

#[tokio::test]
async fn unseated_profiles_cannot_act() {
    let mut fixture = started_nim(2).await;
    let before = fixture.host.log().len();
    let err = fixture
        .host
        .submit_player_action(
            &PlayerProfileId::new(),
            &nim_move(&NimMove::Take { count: 1 }),
            fixed_now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TableSyncError::NotSeated(_)));
    assert_eq!(fixture.host.log().len(), before);
}

#[tokio::test]
async fn rule_violations_are_logged_with_unchanged_state() {
    let mut fixture = started_nim(2).await;
    let p2 = fixture.players[1].clone();
    let state_before = fixture.host.log().latest_state_str().unwrap().clone();

    let snapshot = fixture
        .host
        .submit_player_action(&p2, &nim_move(&NimMove::Take { count: 1 }), fixed_now())
        .await
        .unwrap();
    assert_eq!(snapshot.table.table_phase, TablePhase::GameInProgress);
    assert!(snapshot.table.current_status_description.contains("not p2's turn"));
    let last = snapshot.actions.last().unwrap();
    assert_eq!(last.source, ActionSource::Player(PlayerSeat::P2));
    assert_eq!(last.next_game_state_str, state_before);
}

#[tokio::test]
async fn log_only_grows_and_prefixes_are_stable() {
    let mut fixture = started_nim(3).await;
    let mut previous = fixture.host.snapshot().actions;
    let mut turn = 0usize;
    while !fixture.host.table().table_phase.is_game_over() {
        let actor = fixture.players[turn % fixture.players.len()].clone();
        let result = fixture
            .host
            .submit_player_action(&actor, &nim_move(&NimMove::Take { count: 1 }), fixed_now())
            .await;
        let snapshot = result.unwrap();
        assert_eq!(snapshot.actions.len(), previous.len() + 1);
        assert_eq!(&snapshot.actions[..previous.len()], previous.as_slice());
        previous = snapshot.actions;
        turn += 1;
    }
    assert_eq!(
        fixture.host.table().table_phase,
        TablePhase::GameCompleteWithWinners
    );
}

#[tokio::test]
async fn finished_tables_refuse_further_actions() {
    let mut fixture = started_nim(2).await;
    fixture
        .host
        .submit_host_action(&host_command(&HostCommand::Cancel), fixed_now())
        .await
        .unwrap();
    assert_eq!(fixture.host.table().table_phase, TablePhase::GameAbandoned);
    let len = fixture.host.log().len();

    let p1 = fixture.players[0].clone();
    let err = fixture
        .host
        .submit_player_action(&p1, &nim_move(&NimMove::Take { count: 1 }), fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, TableSyncError::GameOver(TablePhase::GameAbandoned)));
    let err = fixture
        .host
        .submit_host_action(&host_command(&HostCommand::DeclareDraw), fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, TableSyncError::GameOver(_)));
    assert_eq!(fixture.host.log().len(), len);
}

#[tokio::test]
async fn player_payloads_on_the_host_path_are_malformed() {
    let mut fixture = started_nim(2).await;
    let err = fixture
        .host
        .submit_host_action(&nim_move(&NimMove::Take { count: 1 }), fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, TableSyncError::MalformedAction(_)));
}

#[tokio::test]
async fn corrupt_checkpoints_are_fatal() {
    let fixture = start_table("nim", 1);
    let table = fixture.host.table().clone();
    let mut entries = fixture.host.log().entries().to_vec();
    entries.push(DbGameTableAction::new(
        table.id.clone(),
        fixed_now(),
        ActionSource::Host,
        GameTableActionType::HostStartsGame,
        EncodedString::new("{}"),
        EncodedString::new("not a state"),
    ));
    let log = ActionLog::from_entries(table.id.clone(), entries).unwrap();
    let mut host = TableHost::new(&fixture.registry, table, log).unwrap();

    let err = host
        .submit_host_action(&host_command(&HostCommand::Start), fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, TableSyncError::CorruptState(_)));
    assert!(err.is_fatal());
}

#[test]
fn unknown_titles_cannot_be_hosted() {
    let fixture = start_table("nim", 1);
    let mut table = fixture.host.table().clone();
    table.game_title = GameTitle::new("backgammon");
    let log = fixture.host.log().clone();
    let err = TableHost::new(&fixture.registry, table, log).unwrap_err();
    assert!(matches!(
        err,
        TableSyncError::Configuration(RegistryError::UnknownTitle(_))
    ));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn mirror_derives_seat_and_turn() {
    let mut fixture = start_table("tic-tac-toe", 1);
    let start = TicTacToe::new()
        .host_action_encoder()
        .encode(&HostCommand::Start)
        .unwrap();
    let snapshot = fixture
        .host
        .submit_host_action(start.as_str(), fixed_now())
        .await
        .unwrap();
    assert_round_trip_eq(&snapshot);

    let mut p1 = TableMirror::new(fixture.players[0].clone(), snapshot.table.id.clone());
    let mut p2 = TableMirror::new(fixture.players[1].clone(), snapshot.table.id.clone());
    let mut observer = TableMirror::new(PlayerProfileId::new(), snapshot.table.id.clone());
    for mirror in [&mut p1, &mut p2, &mut observer] {
        assert!(mirror.view(&fixture.registry).is_none());
        assert!(mirror.apply_snapshot(snapshot.clone()));
    }

    let p1_view = p1.view(&fixture.registry).unwrap();
    assert_eq!(p1_view.my_player_seat, Some(PlayerSeat::P1));
    assert!(p1_view.is_my_turn);
    assert_eq!(p1_view.next_to_act, vec![PlayerSeat::P1]);
    assert_eq!(p1_view.state_hash, fixture.host.log().state_hash());

    let p2_view = p2.view(&fixture.registry).unwrap();
    assert_eq!(p2_view.my_player_seat, Some(PlayerSeat::P2));
    assert!(!p2_view.is_my_turn);

    let observer_view = observer.view(&fixture.registry).unwrap();
    assert_eq!(observer_view.my_player_seat, None);
    assert!(!observer_view.is_my_turn);

    let state = p1.latest_state(&TicTacToe::new()).unwrap();
    assert_eq!(state.open_cells().count(), 9);
    assert_eq!(fixture.host_id, fixture.players[0]);

    let place = TicTacToe::new()
        .player_action_encoder()
        .encode(&TicTacToeMove::Place { cell: 4 })
        .unwrap();
    let next = fixture
        .host
        .submit_player_action(&fixture.players[0], place.as_str(), fixed_now())
        .await
        .unwrap();
    p2.apply_snapshot(next);
    assert!(p2.view(&fixture.registry).unwrap().is_my_turn);
}

#[tokio::test]
async fn applying_a_snapshot_twice_matches_applying_it_once() {
    let fixture = started_nim(2).await;
    let snapshot = fixture.host.snapshot();
    let table_id = snapshot.table.id.clone();

    let mut once = TableMirror::new(fixture.players[1].clone(), table_id.clone());
    once.apply_snapshot(snapshot.clone());
    let mut twice = TableMirror::new(fixture.players[1].clone(), table_id);
    twice.apply_snapshot(snapshot.clone());
    twice.apply_snapshot(snapshot);

    assert_eq!(once.view(&fixture.registry), twice.view(&fixture.registry));
}

#[tokio::test]
async fn late_joiner_catches_up_from_one_snapshot() {
    let mut fixture = started_nim(2).await;
    let table_id = fixture.host.table().id.clone();
    let mut steady = TableMirror::new(fixture.players[0].clone(), table_id.clone());
    let mut flaky = TableMirror::new(fixture.players[0].clone(), table_id.clone());

    let mut snapshots = vec![fixture.host.snapshot()];
    let mut turn = 0;
    while fixture.host.log().len() < 9 {
        let actor = fixture.players[turn % 2].clone();
        snapshots.push(
            fixture
                .host
                .submit_player_action(&actor, &nim_move(&NimMove::Take { count: 1 }), fixed_now())
                .await
                .unwrap(),
        );
        turn += 1;
    }

    for snapshot in &snapshots {
        steady.apply_snapshot(snapshot.clone());
        if snapshot.actions.len() <= 5 {
            flaky.apply_snapshot(snapshot.clone());
        }
    }
    assert_eq!(flaky.actions().len(), 5);

    // Reconnects and receives only the latest snapshot.
    flaky.apply_snapshot(fixture.host.snapshot());
    assert_eq!(flaky.actions().len(), 9);
    assert_eq!(flaky.view(&fixture.registry), steady.view(&fixture.registry));
}

#[test]
fn mirrors_ignore_other_tables() {
    let first = start_table("nim", 1);
    let second = start_table("nim", 1);
    let mut mirror = TableMirror::new(first.players[0].clone(), first.host.table().id.clone());
    assert!(mirror.apply_snapshot(first.host.snapshot()));
    assert!(!mirror.apply_snapshot(second.host.snapshot()));
    assert!(!mirror.apply_actions(second.host.log().entries().to_vec()));
    assert_eq!(mirror.table().unwrap().id, first.host.table().id);
    assert_eq!(mirror.actions(), first.host.log().entries());
}
