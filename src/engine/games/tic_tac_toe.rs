use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::encoding::{Encoder, SchemaEncoder, Validate, ValidationError};
use crate::engine::processor::GameProcessor;
use crate::engine::types::{GameDefinition, GameTitle, ProcessorOutcome};
use crate::ledger::GameTableActionType;
use crate::table::{GameTable, PlayerSeat, TablePhase};

use super::{apply_common_host_command, refuse, HostCommand, MatchStatus};

pub const TITLE: &str = "tic-tac-toe";

const CELLS: usize = 9;
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn seat(self) -> PlayerSeat {
        match self {
            Mark::X => PlayerSeat::P1,
            Mark::O => PlayerSeat::P2,
        }
    }

    fn for_seat(seat: PlayerSeat) -> Option<Self> {
        match seat {
            PlayerSeat::P1 => Some(Mark::X),
            PlayerSeat::P2 => Some(Mark::O),
            _ => None,
        }
    }

    fn other(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TicTacToeState {
    pub board: [Option<Mark>; CELLS],
    pub to_move: Mark,
    pub status: MatchStatus,
}

impl TicTacToeState {
    fn fresh() -> Self {
        Self {
            board: [None; CELLS],
            to_move: Mark::X,
            status: MatchStatus::AwaitingStart,
        }
    }

    fn count(&self, mark: Mark) -> usize {
        self.board.iter().filter(|cell| **cell == Some(mark)).count()
    }

    fn winner(&self) -> Option<Mark> {
        LINES.iter().find_map(|[a, b, c]| match self.board[*a] {
            Some(mark) if self.board[*b] == Some(mark) && self.board[*c] == Some(mark) => {
                Some(mark)
            }
            _ => None,
        })
    }

    pub fn open_cells(&self) -> impl Iterator<Item = u8> + '_ {
        self.board
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index as u8)
    }
}

impl Validate for TicTacToeState {
    fn validate(&self) -> Result<(), ValidationError> {
        let (xs, os) = (self.count(Mark::X), self.count(Mark::O));
        if xs < os || xs > os + 1 {
            return Err(ValidationError::new("board", "mark counts are inconsistent"));
        }
        let expected = if xs == os { Mark::X } else { Mark::O };
        if self.to_move != expected && self.status == MatchStatus::InProgress {
            return Err(ValidationError::new("toMove", "does not match the board"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum TicTacToeMove {
    Place { cell: u8 },
    Resign,
}

impl Validate for TicTacToeMove {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            TicTacToeMove::Place { cell } if usize::from(*cell) >= CELLS => {
                Err(ValidationError::new("cell", "must be within 0..9"))
            }
            _ => Ok(()),
        }
    }
}

/// Two players, X in `p1` and O in `p2`.
#[derive(Debug, Default)]
pub struct TicTacToe {
    states: SchemaEncoder<TicTacToeState>,
    moves: SchemaEncoder<TicTacToeMove>,
    host_commands: SchemaEncoder<HostCommand>,
}

impl TicTacToe {
    pub fn new() -> Self {
        Self::default()
    }

    fn finish(state: &TicTacToeState, status: MatchStatus) -> TicTacToeState {
        TicTacToeState {
            status,
            ..state.clone()
        }
    }
}

#[async_trait]
impl GameProcessor for TicTacToe {
    type State = TicTacToeState;
    type PlayerAction = TicTacToeMove;
    type HostAction = HostCommand;

    fn definition(&self) -> GameDefinition {
        GameDefinition {
            title: GameTitle::new(TITLE),
            display_name: "Tic-tac-toe".into(),
            min_players: 2,
            max_players: 2,
        }
    }

    fn state_encoder(&self) -> &dyn Encoder<TicTacToeState> {
        &self.states
    }

    fn player_action_encoder(&self) -> &dyn Encoder<TicTacToeMove> {
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

    fn create_initial_state(&self, _initial_action: &HostCommand) -> TicTacToeState {
        TicTacToeState::fresh()
    }

    async fn apply_player_action(
        &self,
        table: &GameTable,
        state: &TicTacToeState,
        seat: PlayerSeat,
        action: &TicTacToeMove,
    ) -> ProcessorOutcome<TicTacToeState> {
        if state.status != MatchStatus::InProgress {
            return refuse(table, state, "game is not in progress");
        }
        let Some(mark) = Mark::for_seat(seat) else {
            return refuse(table, state, format!("{seat} has no mark in tic-tac-toe"));
        };

        match action {
            TicTacToeMove::Resign => {
                let winner = mark.other().seat();
                ProcessorOutcome::new(
                    TablePhase::GameCompleteWithWinners,
                    Self::finish(state, MatchStatus::Won { winners: vec![winner] }),
                    format!("{seat} resigned; {winner} wins"),
                )
            }
            TicTacToeMove::Place { cell } => {
                if mark != state.to_move {
                    return refuse(table, state, format!("not {seat}'s turn"));
                }
                let index = usize::from(*cell);
                if state.board[index].is_some() {
                    return refuse(table, state, format!("cell {cell} is taken"));
                }

                let mut next = state.clone();
                next.board[index] = Some(mark);
                next.to_move = mark.other();

                if let Some(winner) = next.winner() {
                    next.status = MatchStatus::Won {
                        winners: vec![winner.seat()],
                    };
                    let summary = format!("{} completes a line and wins", winner.seat());
                    ProcessorOutcome::new(TablePhase::GameCompleteWithWinners, next, summary)
                } else if next.open_cells().next().is_none() {
                    next.status = MatchStatus::Draw;
                    ProcessorOutcome::new(TablePhase::GameCompleteWithDraw, next, "board full; draw")
                } else {
                    let summary = format!(
                        "{seat} played cell {cell}; {} to move",
                        next.to_move.seat()
                    );
                    ProcessorOutcome::new(TablePhase::GameInProgress, next, summary)
                }
            }
        }
    }

    async fn apply_host_action(
        &self,
        table: &GameTable,
        state: &TicTacToeState,
        action: &HostCommand,
    ) -> ProcessorOutcome<TicTacToeState> {
        if let Some(outcome) = apply_common_host_command(table, state, &state.status, action, |status| {
            Self::finish(state, status)
        }) {
            return outcome;
        }

        match action {
            HostCommand::Setup { .. } => {
                if state.status != MatchStatus::AwaitingStart {
                    return refuse(table, state, "game already started");
                }
                ProcessorOutcome::new(table.table_phase, TicTacToeState::fresh(), "board cleared")
            }
            HostCommand::Start => {
                if state.status != MatchStatus::AwaitingStart {
                    return refuse(table, state, "game already started");
                }
                if table.player_count() != 2 {
                    return refuse(table, state, "tic-tac-toe needs exactly two seated players");
                }
                let mut next = state.clone();
                next.status = MatchStatus::InProgress;
                ProcessorOutcome::new(TablePhase::GameInProgress, next, "game started; p1 to move")
            }
            HostCommand::Eliminate { seat } => {
                if state.status != MatchStatus::InProgress {
                    return refuse(table, state, "game is not in progress");
                }
                let Some(mark) = Mark::for_seat(*seat) else {
                    return refuse(table, state, format!("{seat} is not playing"));
                };
                let winner = mark.other().seat();
                ProcessorOutcome::new(
                    TablePhase::GameCompleteWithWinners,
                    Self::finish(state, MatchStatus::Won { winners: vec![winner] }),
                    format!("host eliminated {seat}; {winner} wins"),
                )
            }
            HostCommand::Cancel | HostCommand::DeclareDraw | HostCommand::DeclareWinners { .. } => {
                refuse(table, state, "unsupported host action")
            }
        }
    }

    fn next_to_act(&self, state: &TicTacToeState) -> Vec<PlayerSeat> {
        match state.status {
            MatchStatus::InProgress => vec![state.to_move.seat()],
            _ => Vec::new(),
        }
    }

    fn host_action_type(&self, action: &HostCommand) -> GameTableActionType {
        action.action_type()
    }

    fn player_action_type(&self, action: &TicTacToeMove) -> GameTableActionType {
        match action {
            TicTacToeMove::Place { .. } => GameTableActionType::PlayerMove,
            TicTacToeMove::Resign => GameTableActionType::PlayerResigns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{GameTableId, PlayerProfileId};
    use crate::table::Seats;
    use crate::test_utils::fixed_now;

    fn table(phase: TablePhase) -> GameTable {
        let pool = [PlayerProfileId::new(), PlayerProfileId::new()];
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

    async fn started(game: &TicTacToe) -> TicTacToeState {
        let initial = game.create_initial_state(&game.create_initial_action(&table(TablePhase::Lobby)));
        game.apply_host_action(&table(TablePhase::Lobby), &initial, &HostCommand::Start)
            .await
            .state
    }

    async fn play(game: &TicTacToe, cells: &[(PlayerSeat, u8)]) -> ProcessorOutcome<TicTacToeState> {
        let table = table(TablePhase::GameInProgress);
        let mut state = started(game).await;
        let mut last = None;
        for (seat, cell) in cells {
            let outcome = game
                .apply_player_action(&table, &state, *seat, &TicTacToeMove::Place { cell: *cell })
                .await;
            state = outcome.state.clone();
            last = Some(outcome);
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn start_moves_the_table_in_progress() {
        let game = TicTacToe::new();
        let lobby = table(TablePhase::Lobby);
        let initial = game.create_initial_state(&game.create_initial_action(&lobby));
        assert!(game.next_to_act(&initial).is_empty());

        let outcome = game.apply_host_action(&lobby, &initial, &HostCommand::Start).await;
        assert_eq!(outcome.table_phase, TablePhase::GameInProgress);
        assert_eq!(game.next_to_act(&outcome.state), vec![PlayerSeat::P1]);
    }

    #[tokio::test]
    async fn completing_a_line_wins() {
        let game = TicTacToe::new();
        use PlayerSeat::{P1, P2};
        let outcome = play(&game, &[(P1, 0), (P2, 3), (P1, 1), (P2, 4), (P1, 2)]).await;
        assert_eq!(outcome.table_phase, TablePhase::GameCompleteWithWinners);
        assert_eq!(outcome.state.status, MatchStatus::Won { winners: vec![P1] });
        assert!(game.next_to_act(&outcome.state).is_empty());
    }

    #[tokio::test]
    async fn full_board_without_line_is_a_draw() {
        let game = TicTacToe::new();
        use PlayerSeat::{P1, P2};
        let outcome = play(
            &game,
            &[(P1, 0), (P2, 1), (P1, 2), (P2, 4), (P1, 3), (P2, 5), (P1, 7), (P2, 6), (P1, 8)],
        )
        .await;
        assert_eq!(outcome.table_phase, TablePhase::GameCompleteWithDraw);
    }

    #[tokio::test]
    async fn illegal_moves_leave_state_untouched() {
        let game = TicTacToe::new();
        let table = table(TablePhase::GameInProgress);
        let state = started(&game).await;

        let out_of_turn = game
            .apply_player_action(&table, &state, PlayerSeat::P2, &TicTacToeMove::Place { cell: 4 })
            .await;
        assert_eq!(out_of_turn.table_phase, TablePhase::GameInProgress);
        assert_eq!(out_of_turn.state, state);
        assert!(out_of_turn.state_summary.contains("turn"));

        let placed = game
            .apply_player_action(&table, &state, PlayerSeat::P1, &TicTacToeMove::Place { cell: 4 })
            .await
            .state;
        let taken = game
            .apply_player_action(&table, &placed, PlayerSeat::P2, &TicTacToeMove::Place { cell: 4 })
            .await;
        assert_eq!(taken.state, placed);
        assert!(taken.state_summary.contains("taken"));
    }

    #[tokio::test]
    async fn resigning_hands_the_win_to_the_opponent() {
        let game = TicTacToe::new();
        let table = table(TablePhase::GameInProgress);
        let state = started(&game).await;
        let outcome = game
            .apply_player_action(&table, &state, PlayerSeat::P1, &TicTacToeMove::Resign)
            .await;
        assert_eq!(outcome.table_phase, TablePhase::GameCompleteWithWinners);
        assert_eq!(
            outcome.state.status,
            MatchStatus::Won {
                winners: vec![PlayerSeat::P2]
            }
        );
        assert_eq!(
            game.player_action_type(&TicTacToeMove::Resign),
            GameTableActionType::PlayerResigns
        );
    }

    #[tokio::test]
    async fn host_cancel_abandons_the_game() {
        let game = TicTacToe::new();
        let table = table(TablePhase::GameInProgress);
        let state = started(&game).await;
        let outcome = game.apply_host_action(&table, &state, &HostCommand::Cancel).await;
        assert_eq!(outcome.table_phase, TablePhase::GameAbandoned);
        assert_eq!(outcome.state.status, MatchStatus::Abandoned);
    }

    #[test]
    fn state_schema_rejects_impossible_boards() {
        let encoder = SchemaEncoder::<TicTacToeState>::new();
        let mut state = TicTacToeState::fresh();
        state.board[0] = Some(Mark::O);
        let json = serde_json::to_string(&state).unwrap();
        assert!(encoder.decode(&json).is_err());

        let encoded = encoder.encode(&TicTacToeState::fresh()).unwrap();
        assert_eq!(encoder.decode(encoded.as_str()).unwrap(), TicTacToeState::fresh());
    }
}
