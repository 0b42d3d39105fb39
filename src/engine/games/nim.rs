use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::encoding::{Encoder, SchemaEncoder, Validate, ValidationError};
use crate::engine::processor::GameProcessor;
use crate::engine::types::{GameDefinition, GameTitle, ProcessorOutcome};
use crate::ledger::GameTableActionType;
use crate::table::{GameTable, PlayerSeat, TablePhase, MAX_SEATS};

use super::{apply_common_host_command, refuse, HostCommand, MatchStatus};

pub const TITLE: &str = "nim";
pub const NIM_STONES_PER_PLAYER: u32 = 7;
const MAX_TAKE: u32 = 3;

/// Single pile, players take 1 to 3 stones in seat order. Whoever takes the
/// last stone wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NimState {
    pub pile: u32,
    pub max_take: u32,
    /// Seats still in the game, in turn order.
    pub players: Vec<PlayerSeat>,
    pub turn: usize,
    pub status: MatchStatus,
}

impl NimState {
    fn for_players(count: usize) -> Self {
        let count = count.clamp(1, MAX_SEATS);
        Self {
            pile: NIM_STONES_PER_PLAYER * count as u32,
            max_take: MAX_TAKE,
            players: PlayerSeat::ALL[..count].to_vec(),
            turn: 0,
            status: MatchStatus::AwaitingStart,
        }
    }

    pub fn current(&self) -> Option<PlayerSeat> {
        self.players.get(self.turn).copied()
    }

    /// Drops `seat` from the rotation, keeping the turn with whoever was due
    /// to act next.
    fn remove_player(&mut self, seat: PlayerSeat) -> bool {
        let Some(position) = self.players.iter().position(|s| *s == seat) else {
            return false;
        };
        self.players.remove(position);
        if position < self.turn {
            self.turn -= 1;
        }
        if self.turn >= self.players.len() {
            self.turn = 0;
        }
        true
    }

    fn advance(&mut self) {
        if !self.players.is_empty() {
            self.turn = (self.turn + 1) % self.players.len();
        }
    }
}

impl Validate for NimState {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_take == 0 {
            return Err(ValidationError::new("maxTake", "must be positive"));
        }
        if self.players.len() > MAX_SEATS {
            return Err(ValidationError::new("players", "more players than seats"));
        }
        if !self.players.is_empty() && self.turn >= self.players.len() {
            return Err(ValidationError::new("turn", "points past the player list"));
        }
        let mut seen = self.players.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.players.len() {
            return Err(ValidationError::new("players", "duplicate seat"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum NimMove {
    Take { count: u32 },
    Resign,
}

impl Validate for NimMove {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            NimMove::Take { count: 0 } => Err(ValidationError::new("count", "must be positive")),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Nim {
    states: SchemaEncoder<NimState>,
    moves: SchemaEncoder<NimMove>,
    host_commands: SchemaEncoder<HostCommand>,
}

impl Nim {
    pub fn new() -> Self {
        Self::default()
    }

    fn drop_player(
        table: &GameTable,
        state: &NimState,
        seat: PlayerSeat,
        verb: &str,
    ) -> ProcessorOutcome<NimState> {
        let mut next = state.clone();
        if !next.remove_player(seat) {
            return refuse(table, state, format!("{seat} is not playing"));
        }
        match next.players.as_slice() {
            [winner] => {
                let winner = *winner;
                next.status = MatchStatus::Won {
                    winners: vec![winner],
                };
                ProcessorOutcome::new(
                    TablePhase::GameCompleteWithWinners,
                    next,
                    format!("{seat} {verb}; {winner} is the last player standing"),
                )
            }
            [] => {
                next.status = MatchStatus::Abandoned;
                ProcessorOutcome::new(
                    TablePhase::GameCompleteNoWinners,
                    next,
                    format!("{seat} {verb}; nobody is left"),
                )
            }
            _ => {
                let summary = match next.current() {
                    Some(current) => format!("{seat} {verb}; {current} to move"),
                    None => format!("{seat} {verb}"),
                };
                ProcessorOutcome::new(TablePhase::GameInProgress, next, summary)
            }
        }
    }
}

#[async_trait]
impl GameProcessor for Nim {
    type State = NimState;
    type PlayerAction = NimMove;
    type HostAction = HostCommand;

    fn definition(&self) -> GameDefinition {
        GameDefinition {
            title: GameTitle::new(TITLE),
            display_name: "Nim".into(),
            min_players: 2,
            max_players: MAX_SEATS,
        }
    }

    fn state_encoder(&self) -> &dyn Encoder<NimState> {
        &self.states
    }

    fn player_action_encoder(&self) -> &dyn Encoder<NimMove> {
        &self.moves
    }

    fn host_action_encoder(&self) -> &dyn Encoder<HostCommand> {
        &self.host_commands
    }

    fn create_initial_action(&self, table: &GameTable) -> HostCommand {
        HostCommand::Setup {
            players: table.player_count(),
        }
    }

    fn create_initial_state(&self, initial_action: &HostCommand) -> NimState {
        match initial_action {
            HostCommand::Setup { players } => NimState::for_players(*players),
            _ => NimState::for_players(self.definition().min_players),
        }
    }

    async fn apply_player_action(
        &self,
        table: &GameTable,
        state: &NimState,
        seat: PlayerSeat,
        action: &NimMove,
    ) -> ProcessorOutcome<NimState> {
        if state.status != MatchStatus::InProgress {
            return refuse(table, state, "game is not in progress");
        }
        match action {
            NimMove::Resign => Self::drop_player(table, state, seat, "resigned"),
            NimMove::Take { count } => {
                if state.current() != Some(seat) {
                    return refuse(table, state, format!("not {seat}'s turn"));
                }
                if *count > state.max_take {
                    return refuse(
                        table,
                        state,
                        format!("at most {} stones may be taken", state.max_take),
                    );
                }
                if *count > state.pile {
                    return refuse(table, state, format!("only {} stones left", state.pile));
                }

                let mut next = state.clone();
                next.pile -= count;
                if next.pile == 0 {
                    next.status = MatchStatus::Won {
                        winners: vec![seat],
                    };
                    return ProcessorOutcome::new(
                        TablePhase::GameCompleteWithWinners,
                        next,
                        format!("{seat} took the last stone and wins"),
                    );
                }
                next.advance();
                let summary = match next.current() {
                    Some(current) => format!(
                        "{seat} took {count}; {} left, {current} to move",
                        next.pile
                    ),
                    None => format!("{seat} took {count}; {} left", next.pile),
                };
                ProcessorOutcome::new(TablePhase::GameInProgress, next, summary)
            }
        }
    }

    async fn apply_host_action(
        &self,
        table: &GameTable,
        state: &NimState,
        action: &HostCommand,
    ) -> ProcessorOutcome<NimState> {
        let finish = |status| NimState {
            status,
            ..state.clone()
        };
        if let Some(outcome) = apply_common_host_command(table, state, &state.status, action, finish) {
            return outcome;
        }

        match action {
            HostCommand::Setup { players } => {
                if state.status != MatchStatus::AwaitingStart {
                    return refuse(table, state, "game already started");
                }
                ProcessorOutcome::new(
                    table.table_phase,
                    NimState::for_players(*players),
                    format!("pile reset for {players} players"),
                )
            }
            HostCommand::Start => {
                if state.status != MatchStatus::AwaitingStart {
                    return refuse(table, state, "game already started");
                }
                if state.players.len() < self.definition().min_players {
                    return refuse(table, state, "not enough players to start");
                }
                let mut next = state.clone();
                next.status = MatchStatus::InProgress;
                let summary = format!("game started with {} stones; p1 to move", next.pile);
                ProcessorOutcome::new(TablePhase::GameInProgress, next, summary)
            }
            HostCommand::Eliminate { seat } => {
                if state.status != MatchStatus::InProgress {
                    return refuse(table, state, "game is not in progress");
                }
                Self::drop_player(table, state, *seat, "was eliminated")
            }
            HostCommand::Cancel | HostCommand::DeclareDraw | HostCommand::DeclareWinners { .. } => {
                refuse(table, state, "unsupported host action")
            }
        }
    }

    fn next_to_act(&self, state: &NimState) -> Vec<PlayerSeat> {
        match (&state.status, state.current()) {
            (MatchStatus::InProgress, Some(seat)) => vec![seat],
            _ => Vec::new(),
        }
    }

    fn host_action_type(&self, action: &HostCommand) -> GameTableActionType {
        action.action_type()
    }

    fn player_action_type(&self, action: &NimMove) -> GameTableActionType {
        match action {
            NimMove::Take { .. } => GameTableActionType::PlayerMove,
            NimMove::Resign => GameTableActionType::PlayerResigns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{GameTableId, PlayerProfileId};
    use crate::table::Seats;
    use crate::test_utils::fixed_now;

    fn table(players: usize, phase: TablePhase) -> GameTable {
        let pool: Vec<_> = (0..players).map(|_| PlayerProfileId::new()).collect();
        GameTable {
            id: GameTableId::new(),
            created_at: fixed_now(),
            last_updated_at: fixed_now(),
            game_title: GameTitle::new(TITLE),
            game_host_player_profile_id: pool[0].clone(),
            table_phase: phase,
            current_status_description: String::new(),
            seats: Seats::from_pool(&pool).unwrap(),
        }
    }

    async fn started(game: &Nim, players: usize) -> (GameTable, NimState) {
        let lobby = table(players, TablePhase::Lobby);
        let initial = game.create_initial_state(&game.create_initial_action(&lobby));
        let outcome = game.apply_host_action(&lobby, &initial, &HostCommand::Start).await;
        assert_eq!(outcome.table_phase, TablePhase::GameInProgress);
        (table(players, TablePhase::GameInProgress), outcome.state)
    }

    #[tokio::test]
    async fn pile_scales_with_player_count() {
        let game = Nim::new();
        let (_, state) = started(&game, 3).await;
        assert_eq!(state.pile, 21);
        assert_eq!(state.players, vec![PlayerSeat::P1, PlayerSeat::P2, PlayerSeat::P3]);
        assert_eq!(game.next_to_act(&state), vec![PlayerSeat::P1]);
    }

    #[tokio::test]
    async fn turns_rotate_and_the_last_stone_wins() {
        let game = Nim::new();
        let (table, mut state) = started(&game, 2).await;
        let mut seat = PlayerSeat::P1;
        let mut last = None;
        while state.status == MatchStatus::InProgress {
            let outcome = game
                .apply_player_action(&table, &state, seat, &NimMove::Take { count: 3 })
                .await;
            if outcome.table_phase == TablePhase::GameInProgress {
                assert_ne!(outcome.state.pile, state.pile);
            }
            state = outcome.state.clone();
            last = Some((seat, outcome));
            seat = if seat == PlayerSeat::P1 { PlayerSeat::P2 } else { PlayerSeat::P1 };
            if state.pile < 3 && state.status == MatchStatus::InProgress {
                let outcome = game
                    .apply_player_action(&table, &state, seat, &NimMove::Take { count: state.pile })
                    .await;
                state = outcome.state.clone();
                last = Some((seat, outcome));
            }
        }
        let (winner, outcome) = last.unwrap();
        assert_eq!(outcome.table_phase, TablePhase::GameCompleteWithWinners);
        assert_eq!(outcome.state.status, MatchStatus::Won { winners: vec![winner] });
        assert_eq!(outcome.state.pile, 0);
    }

    #[tokio::test]
    async fn illegal_takes_are_refused_with_a_summary() {
        let game = Nim::new();
        let (table, state) = started(&game, 2).await;

        let too_many = game
            .apply_player_action(&table, &state, PlayerSeat::P1, &NimMove::Take { count: 4 })
            .await;
        assert_eq!(too_many.state, state);
        assert_eq!(too_many.table_phase, TablePhase::GameInProgress);
        assert!(too_many.state_summary.contains("at most 3"));

        let wrong_turn = game
            .apply_player_action(&table, &state, PlayerSeat::P2, &NimMove::Take { count: 1 })
            .await;
        assert_eq!(wrong_turn.state, state);
    }

    #[tokio::test]
    async fn resigning_down_to_one_player_ends_the_game() {
        let game = Nim::new();
        let (table, state) = started(&game, 3).await;
        let after_p2 = game
            .apply_player_action(&table, &state, PlayerSeat::P2, &NimMove::Resign)
            .await;
        assert_eq!(after_p2.table_phase, TablePhase::GameInProgress);
        assert_eq!(after_p2.state.current(), Some(PlayerSeat::P1));

        let eliminated = game
            .apply_host_action(&table, &after_p2.state, &HostCommand::Eliminate { seat: PlayerSeat::P1 })
            .await;
        assert_eq!(eliminated.table_phase, TablePhase::GameCompleteWithWinners);
        assert_eq!(
            eliminated.state.status,
            MatchStatus::Won {
                winners: vec![PlayerSeat::P3]
            }
        );
    }

    #[tokio::test]
    async fn moves_before_start_are_refused() {
        let game = Nim::new();
        let lobby = table(2, TablePhase::Lobby);
        let initial = game.create_initial_state(&game.create_initial_action(&lobby));
        let outcome = game
            .apply_player_action(&lobby, &initial, PlayerSeat::P1, &NimMove::Take { count: 1 })
            .await;
        assert_eq!(outcome.table_phase, TablePhase::Lobby);
        assert_eq!(outcome.state, initial);
    }
}
