//! Titles bundled with the crate.

mod nim;
mod tic_tac_toe;

use serde::{Deserialize, Serialize};

use crate::encoding::{Validate, ValidationError};
use crate::ledger::GameTableActionType;
use crate::table::{GameTable, PlayerSeat, TablePhase, MAX_SEATS};

use super::types::ProcessorOutcome;

pub use nim::{Nim, NimMove, NimState, NIM_STONES_PER_PLAYER};
pub use tic_tac_toe::{Mark, TicTacToe, TicTacToeMove, TicTacToeState};

/// Where a bundled game stands, independent of its board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MatchStatus {
    AwaitingStart,
    InProgress,
    Won { winners: Vec<PlayerSeat> },
    Draw,
    Abandoned,
}

impl MatchStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            MatchStatus::Won { .. } | MatchStatus::Draw | MatchStatus::Abandoned
        )
    }
}

/// Host actions understood by every bundled title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum HostCommand {
    Setup { players: usize },
    Start,
    DeclareWinners { seats: Vec<PlayerSeat> },
    DeclareDraw,
    Eliminate { seat: PlayerSeat },
    Cancel,
}

impl HostCommand {
    pub fn action_type(&self) -> GameTableActionType {
        match self {
            HostCommand::Setup { .. } => GameTableActionType::HostStartsSetup,
            HostCommand::Start => GameTableActionType::HostStartsGame,
            HostCommand::DeclareWinners { .. } => GameTableActionType::HostDeclaresWinners,
            HostCommand::DeclareDraw => GameTableActionType::HostDeclaresDraw,
            HostCommand::Eliminate { .. } => GameTableActionType::HostEliminatesPlayer,
            HostCommand::Cancel => GameTableActionType::HostCancelsGame,
        }
    }
}

impl Validate for HostCommand {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            HostCommand::Setup { players } if *players == 0 || *players > MAX_SEATS => Err(
                ValidationError::new("players", format!("must be within 1..={MAX_SEATS}")),
            ),
            HostCommand::DeclareWinners { seats } if seats.is_empty() => {
                Err(ValidationError::new("seats", "at least one winner is required"))
            }
            _ => Ok(()),
        }
    }
}

/// Refusal: phase and state stay as they are.
fn refuse<S: Clone>(table: &GameTable, state: &S, reason: impl Into<String>) -> ProcessorOutcome<S> {
    ProcessorOutcome::new(table.table_phase, state.clone(), reason)
}

fn describe_seats(seats: &[PlayerSeat]) -> String {
    seats
        .iter()
        .map(|seat| seat.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Applies the host commands whose effect is the same for every bundled title.
///
/// Returns `None` for `Setup`, `Start` and `Eliminate`, which each game handles
/// itself.
fn apply_common_host_command<S, F>(
    table: &GameTable,
    state: &S,
    status: &MatchStatus,
    command: &HostCommand,
    with_status: F,
) -> Option<ProcessorOutcome<S>>
where
    S: Clone,
    F: FnOnce(MatchStatus) -> S,
{
    let outcome = match command {
        HostCommand::Cancel => {
            if status.is_finished() {
                refuse(table, state, "game already finished")
            } else {
                ProcessorOutcome::new(
                    TablePhase::GameAbandoned,
                    with_status(MatchStatus::Abandoned),
                    "host cancelled the game",
                )
            }
        }
        HostCommand::DeclareDraw => {
            if status.is_finished() {
                refuse(table, state, "game already finished")
            } else {
                ProcessorOutcome::new(
                    TablePhase::GameCompleteWithDraw,
                    with_status(MatchStatus::Draw),
                    "host declared a draw",
                )
            }
        }
        HostCommand::DeclareWinners { seats } => {
            if status.is_finished() {
                refuse(table, state, "game already finished")
            } else if let Some(empty) = seats.iter().find(|seat| table.seats.get(**seat).is_none()) {
                refuse(table, state, format!("seat {empty} is empty"))
            } else {
                let summary = format!("host declared {} the winner", describe_seats(seats));
                ProcessorOutcome::new(
                    TablePhase::GameCompleteWithWinners,
                    with_status(MatchStatus::Won {
                        winners: seats.clone(),
                    }),
                    summary,
                )
            }
        }
        HostCommand::Setup { .. } | HostCommand::Start | HostCommand::Eliminate { .. } => {
            return None
        }
    };
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{Encoder, SchemaEncoder};
    use crate::test_utils::serde::assert_round_trip_eq;

    #[test]
    fn host_commands_map_to_host_kinds() {
        let commands = [
            HostCommand::Setup { players: 2 },
            HostCommand::Start,
            HostCommand::DeclareWinners {
                seats: vec![PlayerSeat::P1],
            },
            HostCommand::DeclareDraw,
            HostCommand::Eliminate {
                seat: PlayerSeat::P2,
            },
            HostCommand::Cancel,
        ];
        for command in commands {
            assert!(command.action_type().is_host_action());
            assert_round_trip_eq(&command);
        }
    }

    #[test]
    fn host_command_schema_rejects_out_of_range_values() {
        let encoder = SchemaEncoder::<HostCommand>::new();
        assert!(encoder.decode(r#"{"type":"setup","players":0}"#).is_err());
        assert!(encoder.decode(r#"{"type":"setup","players":9}"#).is_err());
        assert!(encoder.decode(r#"{"type":"declare-winners","seats":[]}"#).is_err());
        assert!(encoder.decode(r#"{"type":"launch"}"#).is_err());
        assert_eq!(
            encoder.decode(r#"{"type":"start"}"#).unwrap(),
            HostCommand::Start
        );
    }

    #[test]
    fn winner_summary_lists_seats_in_order() {
        assert_eq!(describe_seats(&[PlayerSeat::P1, PlayerSeat::P3]), "p1, p3");
        assert_eq!(describe_seats(&[]), "");
    }
}
