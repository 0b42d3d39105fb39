use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::EncodedString;
use crate::ids::{GameTableActionId, GameTableId};
use crate::table::PlayerSeat;

/// Originator of a log entry, `host` or `player-pN` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionSource {
    Host,
    Player(PlayerSeat),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action source `{0}`")]
pub struct UnknownActionSource(pub String);

impl ActionSource {
    pub fn seat(self) -> Option<PlayerSeat> {
        match self {
            ActionSource::Host => None,
            ActionSource::Player(seat) => Some(seat),
        }
    }
}

impl fmt::Display for ActionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSource::Host => f.write_str("host"),
            ActionSource::Player(seat) => write!(f, "player-{seat}"),
        }
    }
}

impl TryFrom<String> for ActionSource {
    type Error = UnknownActionSource;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "host" {
            return Ok(ActionSource::Host);
        }
        value
            .strip_prefix("player-")
            .and_then(PlayerSeat::parse)
            .map(ActionSource::Player)
            .ok_or(UnknownActionSource(value))
    }
}

impl From<ActionSource> for String {
    fn from(source: ActionSource) -> Self {
        source.to_string()
    }
}

/// Closed set of action kinds recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameTableActionType {
    HostStartsSetup,
    HostStartsGame,
    HostDeclaresWinners,
    HostDeclaresDraw,
    HostEliminatesPlayer,
    HostCancelsGame,
    PlayerMove,
    PlayerResigns,
}

impl GameTableActionType {
    pub fn is_host_action(self) -> bool {
        matches!(
            self,
            GameTableActionType::HostStartsSetup
                | GameTableActionType::HostStartsGame
                | GameTableActionType::HostDeclaresWinners
                | GameTableActionType::HostDeclaresDraw
                | GameTableActionType::HostEliminatesPlayer
                | GameTableActionType::HostCancelsGame
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameTableActionType::HostStartsSetup => "host-starts-setup",
            GameTableActionType::HostStartsGame => "host-starts-game",
            GameTableActionType::HostDeclaresWinners => "host-declares-winners",
            GameTableActionType::HostDeclaresDraw => "host-declares-draw",
            GameTableActionType::HostEliminatesPlayer => "host-eliminates-player",
            GameTableActionType::HostCancelsGame => "host-cancels-game",
            GameTableActionType::PlayerMove => "player-move",
            GameTableActionType::PlayerResigns => "player-resigns",
        }
    }
}

impl fmt::Display for GameTableActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted action and the full encoded state it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbGameTableAction {
    pub id: GameTableActionId,
    pub game_table_id: GameTableId,
    pub created_at: DateTime<Utc>,
    pub source: ActionSource,
    pub action_type: GameTableActionType,
    pub action_str: EncodedString,
    pub next_game_state_str: EncodedString,
}

impl DbGameTableAction {
    pub fn new(
        game_table_id: GameTableId,
        created_at: DateTime<Utc>,
        source: ActionSource,
        action_type: GameTableActionType,
        action_str: EncodedString,
        next_game_state_str: EncodedString,
    ) -> Self {
        Self {
            id: GameTableActionId::new(),
            game_table_id,
            created_at,
            source,
            action_type,
            action_str,
            next_game_state_str,
        }
    }
}
