use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::GameTitle;
use crate::ids::{GameTableId, PlayerProfileId};

pub const MAX_SEATS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSeat {
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
}

impl PlayerSeat {
    pub const ALL: [PlayerSeat; MAX_SEATS] = [
        PlayerSeat::P1,
        PlayerSeat::P2,
        PlayerSeat::P3,
        PlayerSeat::P4,
        PlayerSeat::P5,
        PlayerSeat::P6,
        PlayerSeat::P7,
        PlayerSeat::P8,
    ];

    /// Zero-based position of the seat.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerSeat::P1 => "p1",
            PlayerSeat::P2 => "p2",
            PlayerSeat::P3 => "p3",
            PlayerSeat::P4 => "p4",
            PlayerSeat::P5 => "p5",
            PlayerSeat::P6 => "p6",
            PlayerSeat::P7 => "p7",
            PlayerSeat::P8 => "p8",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|seat| seat.as_str() == value)
    }
}

impl fmt::Display for PlayerSeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TablePhase {
    Lobby,
    LobbyAbandoned,
    GameSetup,
    GameInProgress,
    GameCompleteWithWinners,
    GameCompleteWithDraw,
    GameCompleteNoWinners,
    GameAbandoned,
    Error,
}

impl TablePhase {
    /// True for every phase except `lobby` and `game-in-progress`.
    pub fn is_game_over(self) -> bool {
        !matches!(self, TablePhase::Lobby | TablePhase::GameInProgress)
    }

    /// Completed, abandoned or errored. Nothing is accepted past these.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TablePhase::LobbyAbandoned
                | TablePhase::GameCompleteWithWinners
                | TablePhase::GameCompleteWithDraw
                | TablePhase::GameCompleteNoWinners
                | TablePhase::GameAbandoned
                | TablePhase::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TablePhase::Lobby => "lobby",
            TablePhase::LobbyAbandoned => "lobby-abandoned",
            TablePhase::GameSetup => "game-setup",
            TablePhase::GameInProgress => "game-in-progress",
            TablePhase::GameCompleteWithWinners => "game-complete-with-winners",
            TablePhase::GameCompleteWithDraw => "game-complete-with-draw",
            TablePhase::GameCompleteNoWinners => "game-complete-no-winners",
            TablePhase::GameAbandoned => "game-abandoned",
            TablePhase::Error => "error",
        }
    }
}

impl fmt::Display for TablePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeatingError {
    #[error("{count} players exceed the eight available seats")]
    TooManyPlayers { count: usize },
    #[error("player {0} appears more than once in the pool")]
    DuplicatePlayer(PlayerProfileId),
}

/// The eight fixed seats of a table, flattened as `p1`..`p8` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SeatsRepr", into = "SeatsRepr")]
pub struct Seats([Option<PlayerProfileId>; MAX_SEATS]);

impl Seats {
    /// Seats the pool in order starting at `p1`.
    pub fn from_pool(pool: &[PlayerProfileId]) -> Result<Self, SeatingError> {
        if pool.len() > MAX_SEATS {
            return Err(SeatingError::TooManyPlayers { count: pool.len() });
        }
        let mut seats = Self::default();
        for (index, profile) in pool.iter().enumerate() {
            if seats.seat_of(profile).is_some() {
                return Err(SeatingError::DuplicatePlayer(profile.clone()));
            }
            seats.0[index] = Some(profile.clone());
        }
        Ok(seats)
    }

    pub fn get(&self, seat: PlayerSeat) -> Option<&PlayerProfileId> {
        self.0[seat.index()].as_ref()
    }

    pub fn seat_of(&self, profile: &PlayerProfileId) -> Option<PlayerSeat> {
        self.0
            .iter()
            .position(|occupant| occupant.as_ref() == Some(profile))
            .and_then(PlayerSeat::from_index)
    }

    pub fn occupied(&self) -> impl Iterator<Item = (PlayerSeat, &PlayerProfileId)> + '_ {
        PlayerSeat::ALL
            .into_iter()
            .filter_map(|seat| self.get(seat).map(|profile| (seat, profile)))
    }

    pub fn occupied_count(&self) -> usize {
        self.0.iter().filter(|occupant| occupant.is_some()).count()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SeatsRepr {
    #[serde(default)]
    p1: Option<PlayerProfileId>,
    #[serde(default)]
    p2: Option<PlayerProfileId>,
    #[serde(default)]
    p3: Option<PlayerProfileId>,
    #[serde(default)]
    p4: Option<PlayerProfileId>,
    #[serde(default)]
    p5: Option<PlayerProfileId>,
    #[serde(default)]
    p6: Option<PlayerProfileId>,
    #[serde(default)]
    p7: Option<PlayerProfileId>,
    #[serde(default)]
    p8: Option<PlayerProfileId>,
}

impl From<SeatsRepr> for Seats {
    fn from(repr: SeatsRepr) -> Self {
        Seats([
            repr.p1, repr.p2, repr.p3, repr.p4, repr.p5, repr.p6, repr.p7, repr.p8,
        ])
    }
}

impl From<Seats> for SeatsRepr {
    fn from(seats: Seats) -> Self {
        let [p1, p2, p3, p4, p5, p6, p7, p8] = seats.0;
        SeatsRepr {
            p1,
            p2,
            p3,
            p4,
            p5,
            p6,
            p7,
            p8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTable {
    pub id: GameTableId,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub game_title: GameTitle,
    pub game_host_player_profile_id: PlayerProfileId,
    pub table_phase: TablePhase,
    pub current_status_description: String,
    #[serde(flatten)]
    pub seats: Seats,
}

impl GameTable {
    pub fn seat_of(&self, profile: &PlayerProfileId) -> Option<PlayerSeat> {
        self.seats.seat_of(profile)
    }

    pub fn player_count(&self) -> usize {
        self.seats.occupied_count()
    }
}
