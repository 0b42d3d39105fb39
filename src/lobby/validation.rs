use crate::engine::GameRegistry;
use crate::table::MAX_SEATS;

use super::error::LobbyError;
use super::types::{GameLobby, LobbyOptions};

/// A lobby is valid when a title is chosen and the pool fits its bounds.
pub fn compute_validity(lobby: &GameLobby) -> bool {
    lobby.game_title.is_some()
        && (lobby.min_num_players..=lobby.max_num_players).contains(&lobby.player_pool.len())
}

pub fn validate_options(options: &LobbyOptions, registry: &GameRegistry) -> Result<(), LobbyError> {
    if options.max_players == 0 || options.max_players > MAX_SEATS {
        return Err(LobbyError::invalid_options(format!(
            "max_players must be within 1..={MAX_SEATS}"
        )));
    }
    for title in &options.game_choices {
        registry.definition(title)?;
    }
    Ok(())
}

pub fn ensure_mutable(lobby: &GameLobby) -> Result<(), LobbyError> {
    if lobby.is_frozen() {
        return Err(LobbyError::Frozen(lobby.id.clone()));
    }
    Ok(())
}
