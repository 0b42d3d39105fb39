use rand::seq::SliceRandom;
use rand::Rng;

use super::*;
use crate::engine::{GameTitle, RegistryError};
use crate::ids::PlayerProfileId;
use crate::ledger::{ActionSource, GameTableActionType};
use crate::table::{PlayerSeat, TablePhase};
use crate::test_utils::{
    fixed_now, fixture_rng, public_profile, registry, serde::assert_round_trip_eq,
};

fn hosted(options: LobbyOptions) -> LobbyHost {
    LobbyHost::new(registry(), public_profile("host"), "friday games", options, fixed_now())
        .expect("default options are valid")
}

fn set_game(title: &str) -> LobbyMove {
    LobbyMove::SetGameChoice {
        game_choice: GameTitle::new(title),
    }
}

#[test]
fn two_player_scenario_becomes_valid_and_starts_a_table() {
    let mut host = hosted(LobbyOptions::default());
    let host_id = host.host_profile().id.clone();
    host.apply_move(&host_id, &set_game("tic-tac-toe"), fixed_now())
        .unwrap();
    assert_eq!(host.lobby().min_num_players, 2);
    assert_eq!(host.lobby().max_num_players, 2);
    assert!(!host.lobby().is_lobby_valid, "no players seated yet");

    let alice = PlayerProfileId::new();
    let bob = PlayerProfileId::new();
    host.apply_move(&alice, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    assert!(!host.lobby().is_lobby_valid);
    host.apply_move(&bob, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    assert!(host.lobby().is_lobby_valid);

    let started = host.start_game(&host_id, fixed_now()).unwrap();
    assert_eq!(started.table.seats.get(PlayerSeat::P1), Some(&alice));
    assert_eq!(started.table.seats.get(PlayerSeat::P2), Some(&bob));
    assert_eq!(started.table.seats.get(PlayerSeat::P3), None);
    assert_eq!(started.table.table_phase, TablePhase::Lobby);
    assert_eq!(started.table.game_host_player_profile_id, host_id);
    assert_eq!(started.log.len(), 1);

    let first = started.log.latest().unwrap();
    assert_eq!(first.source, ActionSource::Host);
    assert_eq!(first.action_type, GameTableActionType::HostStartsSetup);
    assert_eq!(first.game_table_id, started.table.id);

    let lobby = host.lobby();
    assert!(lobby.is_frozen());
    assert_eq!(lobby.game_table_id.as_ref(), Some(&started.table.id));
    assert_eq!(
        lobby.game_link.as_deref(),
        Some(format!("/table/{}", started.table.id).as_str())
    );
}

#[test]
fn validity_tracks_every_move() {
    let mut rng = fixture_rng();
    let mut host = hosted(LobbyOptions::default());
    let players: Vec<_> = (0..10).map(|_| PlayerProfileId::new()).collect();
    let titles = ["nim", "tic-tac-toe"];

    for _ in 0..500 {
        let caller = players.choose(&mut rng).unwrap();
        let lobby_move = match rng.gen_range(0..3) {
            0 => set_game(titles.choose(&mut rng).unwrap()),
            1 => LobbyMove::TakeSeat,
            _ => LobbyMove::LeaveSeat,
        };
        let _ = host.apply_move(caller, &lobby_move, fixed_now());

        let lobby = host.lobby();
        let expected = lobby.game_title.as_ref().is_some_and(|title| {
            let definition = registry().definition(title).unwrap();
            (definition.min_players..=definition.max_players).contains(&lobby.player_pool.len())
        });
        assert_eq!(lobby.is_lobby_valid, expected);
        assert_eq!(lobby.is_lobby_valid, compute_validity(lobby));

        let mut pool = lobby.player_pool.clone();
        pool.sort();
        pool.dedup();
        assert_eq!(pool.len(), lobby.player_pool.len(), "pool holds duplicates");
        assert!(lobby.player_pool.len() <= crate::table::MAX_SEATS);
    }
}

#[test]
fn seat_moves_are_idempotent() {
    let mut host = hosted(LobbyOptions::default());
    let alice = PlayerProfileId::new();
    host.apply_move(&alice, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    host.apply_move(&alice, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    assert_eq!(host.lobby().player_pool, vec![alice.clone()]);
    host.apply_move(&alice, &LobbyMove::LeaveSeat, fixed_now()).unwrap();
    host.apply_move(&alice, &LobbyMove::LeaveSeat, fixed_now()).unwrap();
    assert!(host.lobby().player_pool.is_empty());
}

#[test]
fn ninth_player_is_turned_away() {
    let mut host = hosted(LobbyOptions::default());
    for _ in 0..8 {
        host.apply_move(&PlayerProfileId::new(), &LobbyMove::TakeSeat, fixed_now())
            .unwrap();
    }
    let err = host
        .apply_move(&PlayerProfileId::new(), &LobbyMove::TakeSeat, fixed_now())
        .unwrap_err();
    assert!(matches!(err, LobbyError::LobbyFull));
}

#[test]
fn only_the_host_starts_and_only_when_valid() {
    let mut host = hosted(LobbyOptions::default());
    let host_id = host.host_profile().id.clone();
    assert!(matches!(
        host.start_game(&host_id, fixed_now()),
        Err(LobbyError::NotStartable)
    ));

    host.apply_move(&host_id, &set_game("nim"), fixed_now()).unwrap();
    let stranger = PlayerProfileId::new();
    host.apply_move(&stranger, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    host.apply_move(&host_id, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    assert!(host.lobby().is_lobby_valid);

    assert!(matches!(
        host.start_game(&stranger, fixed_now()),
        Err(LobbyError::HostOnly(_))
    ));
    assert!(!host.lobby().is_frozen());
    host.start_game(&host_id, fixed_now()).unwrap();
}

#[test]
fn preparing_a_game_leaves_the_lobby_open_until_committed() {
    let mut host = hosted(LobbyOptions::default());
    let host_id = host.host_profile().id.clone();
    host.apply_move(&host_id, &set_game("nim"), fixed_now()).unwrap();
    host.apply_move(&host_id, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    host.apply_move(&PlayerProfileId::new(), &LobbyMove::TakeSeat, fixed_now())
        .unwrap();
    let before = host.lobby().clone();

    let abandoned = host.prepare_game(&host_id, fixed_now()).unwrap();
    assert_eq!(host.lobby(), &before);

    let started = host.prepare_game(&host_id, fixed_now()).unwrap();
    assert_ne!(started.table.id, abandoned.table.id);
    host.commit_game(&started, fixed_now()).unwrap();
    assert_eq!(host.lobby().game_table_id.as_ref(), Some(&started.table.id));
    assert!(matches!(
        host.commit_game(&abandoned, fixed_now()),
        Err(LobbyError::Frozen(_))
    ));
}

#[test]
fn frozen_lobby_rejects_everything() {
    let mut host = hosted(LobbyOptions::default());
    let host_id = host.host_profile().id.clone();
    host.apply_move(&host_id, &set_game("nim"), fixed_now()).unwrap();
    host.apply_move(&host_id, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    host.apply_move(&PlayerProfileId::new(), &LobbyMove::TakeSeat, fixed_now())
        .unwrap();
    host.start_game(&host_id, fixed_now()).unwrap();
    let before = host.lobby().clone();

    let late = PlayerProfileId::new();
    for result in [
        host.apply_move(&late, &LobbyMove::TakeSeat, fixed_now()),
        host.apply_move(&host_id, &LobbyMove::LeaveSeat, fixed_now()),
        host.rename("renamed", fixed_now()),
        host.set_options(LobbyOptions::default(), fixed_now()),
        host.start_game(&host_id, fixed_now()).map(|_| ()),
    ] {
        assert!(matches!(result, Err(LobbyError::Frozen(_))));
    }
    assert_eq!(host.lobby(), &before);
}

#[test]
fn offered_games_restrict_the_choice() {
    let options = LobbyOptions {
        game_choices: vec![GameTitle::new("nim")],
        max_players: 4,
    };
    let mut host = hosted(options);
    let caller = PlayerProfileId::new();
    let err = host
        .apply_move(&caller, &set_game("tic-tac-toe"), fixed_now())
        .unwrap_err();
    assert!(matches!(err, LobbyError::GameNotOffered(_)));
    assert!(!err.is_fatal());
    assert!(host.lobby().game_title.is_none());
}

#[test]
fn unregistered_titles_are_fatal() {
    let mut host = hosted(LobbyOptions::default());
    let err = host
        .apply_move(&PlayerProfileId::new(), &set_game("chess"), fixed_now())
        .unwrap_err();
    assert!(matches!(
        err,
        LobbyError::Configuration(RegistryError::UnknownTitle(_))
    ));
    assert!(err.is_fatal());

    let bad_options = LobbyOptions {
        game_choices: vec![GameTitle::new("chess")],
        max_players: 2,
    };
    assert!(host.set_options(bad_options, fixed_now()).unwrap_err().is_fatal());
}

#[test]
fn mirror_follows_snapshots() {
    let mut host = hosted(LobbyOptions::default());
    let host_id = host.host_profile().id.clone();
    let mut host_mirror = LobbyMirror::new(host_id.clone(), host.lobby().id.clone());
    let alice = PlayerProfileId::new();
    let mut alice_mirror = LobbyMirror::new(alice.clone(), host.lobby().id.clone());

    host.apply_move(&alice, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    host.apply_move(&host_id, &LobbyMove::TakeSeat, fixed_now()).unwrap();
    host.apply_move(&host_id, &set_game("nim"), fixed_now()).unwrap();
    let snapshot = host.snapshot();
    assert_round_trip_eq(&snapshot);

    assert!(alice_mirror.apply(snapshot.clone()));
    assert!(host_mirror.apply(snapshot));
    assert!(alice_mirror.am_seated());
    assert!(!alice_mirror.can_start());
    assert!(host_mirror.can_start());

    let other = hosted(LobbyOptions::default()).snapshot();
    assert!(!alice_mirror.apply(other));
    assert_eq!(alice_mirror.lobby().unwrap().id, host.lobby().id);

    let started = host.start_game(&host_id, fixed_now()).unwrap();
    alice_mirror.apply(host.snapshot());
    assert_eq!(alice_mirror.table_id(), Some(&started.table.id));
}

#[test]
fn lobby_move_wire_shape() {
    let json = serde_json::to_value(set_game("nim")).unwrap();
    assert_eq!(json["type"], "set-game-choice");
    assert_eq!(json["gameChoice"], "nim");
    assert_eq!(
        serde_json::to_value(LobbyMove::TakeSeat).unwrap()["type"],
        "take-seat"
    );
}
