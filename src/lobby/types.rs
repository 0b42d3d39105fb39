use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::GameTitle;
use crate::ids::{GameLobbyId, GameTableId, PlayerProfileId};
use crate::profile::PublicPlayerProfile;
use crate::table::MAX_SEATS;

use super::validation::compute_validity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLobby {
    pub id: GameLobbyId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub game_host_player_profile: PublicPlayerProfile,
    pub lobby_name: String,
    pub game_title: Option<GameTitle>,
    pub player_pool: Vec<PlayerProfileId>,
    pub min_num_players: usize,
    pub max_num_players: usize,
    pub is_lobby_valid: bool,
    pub game_table_id: Option<GameTableId>,
    pub game_link: Option<String>,
}

impl GameLobby {
    pub fn new(
        host: PublicPlayerProfile,
        lobby_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GameLobbyId::new(),
            created_at: now,
            updated_at: now,
            game_host_player_profile: host,
            lobby_name: lobby_name.into(),
            game_title: None,
            player_pool: Vec::new(),
            min_num_players: 1,
            max_num_players: MAX_SEATS,
            is_lobby_valid: false,
            game_table_id: None,
            game_link: None,
        }
    }

    /// Overrides the player-count bounds used until a game is chosen.
    pub fn with_player_bounds(mut self, min: usize, max: usize) -> Self {
        self.min_num_players = min;
        self.max_num_players = max;
        self.is_lobby_valid = compute_validity(&self);
        self
    }

    pub fn host_id(&self) -> &PlayerProfileId {
        &self.game_host_player_profile.id
    }

    /// A lobby that has produced a table never changes again.
    pub fn is_frozen(&self) -> bool {
        self.game_table_id.is_some()
    }

    pub fn has_player(&self, profile: &PlayerProfileId) -> bool {
        self.player_pool.contains(profile)
    }
}

/// Host-side UI configuration. Broadcast with the lobby but never part of
/// its validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyOptions {
    pub game_choices: Vec<GameTitle>,
    pub max_players: usize,
}

impl Default for LobbyOptions {
    fn default() -> Self {
        Self {
            game_choices: Vec::new(),
            max_players: MAX_SEATS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LobbyMove {
    SetGameChoice {
        #[serde(rename = "gameChoice")]
        game_choice: GameTitle,
    },
    TakeSeat,
    LeaveSeat,
}

/// Everything a lobby peer needs, sent whole on every change and every join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySnapshot {
    pub host_profile: PublicPlayerProfile,
    pub options: LobbyOptions,
    pub lobby: GameLobby,
}
