use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::engine::GameRegistry;
use crate::ids::PlayerProfileId;
use crate::ledger::{ActionLog, ActionSource, DbGameTableAction};
use crate::profile::PublicPlayerProfile;
use crate::table::{GameTable, Seats, TablePhase, MAX_SEATS};

use super::error::LobbyError;
use super::types::{GameLobby, LobbyMove, LobbyOptions, LobbySnapshot};
use super::validation::{compute_validity, ensure_mutable, validate_options};

const LOG_TARGET: &str = "p2p_tables::lobby::host";

pub const INITIAL_TABLE_STATUS: &str = "waiting for the host to start the game";

/// Table and first log entry produced by [`LobbyHost::start_game`].
#[derive(Debug, Clone)]
pub struct StartedGame {
    pub table: GameTable,
    pub log: ActionLog,
}

/// Host-side owner of a lobby. The only writer of its [`GameLobby`].
#[derive(Debug)]
pub struct LobbyHost {
    registry: Arc<GameRegistry>,
    host_profile: PublicPlayerProfile,
    options: LobbyOptions,
    lobby: GameLobby,
}

impl LobbyHost {
    pub fn new(
        registry: Arc<GameRegistry>,
        host_profile: PublicPlayerProfile,
        lobby_name: impl Into<String>,
        options: LobbyOptions,
        now: DateTime<Utc>,
    ) -> Result<Self, LobbyError> {
        let lobby = GameLobby::new(host_profile.clone(), lobby_name, now);
        Self::from_lobby(registry, lobby, options)
    }

    /// Resumes hosting a previously persisted lobby.
    pub fn from_lobby(
        registry: Arc<GameRegistry>,
        lobby: GameLobby,
        options: LobbyOptions,
    ) -> Result<Self, LobbyError> {
        validate_options(&options, &registry)?;
        Ok(Self {
            registry,
            host_profile: lobby.game_host_player_profile.clone(),
            options,
            lobby,
        })
    }

    pub fn lobby(&self) -> &GameLobby {
        &self.lobby
    }

    pub fn options(&self) -> &LobbyOptions {
        &self.options
    }

    pub fn host_profile(&self) -> &PublicPlayerProfile {
        &self.host_profile
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        LobbySnapshot {
            host_profile: self.host_profile.clone(),
            options: self.options.clone(),
            lobby: self.lobby.clone(),
        }
    }

    #[instrument(skip(self, now), fields(lobby_id = %self.lobby.id), level = "debug")]
    pub fn apply_move(
        &mut self,
        caller: &PlayerProfileId,
        lobby_move: &LobbyMove,
        now: DateTime<Utc>,
    ) -> Result<(), LobbyError> {
        ensure_mutable(&self.lobby)?;
        match lobby_move {
            LobbyMove::SetGameChoice { game_choice } => {
                if !self.options.game_choices.is_empty()
                    && !self.options.game_choices.contains(game_choice)
                {
                    return Err(LobbyError::GameNotOffered(game_choice.clone()));
                }
                let definition = self.registry.definition(game_choice)?;
                self.lobby.game_title = Some(definition.title);
                self.lobby.min_num_players = definition.min_players;
                self.lobby.max_num_players = definition.max_players;
            }
            LobbyMove::TakeSeat => {
                if self.lobby.has_player(caller) {
                    return Ok(());
                }
                if self.lobby.player_pool.len() >= MAX_SEATS {
                    return Err(LobbyError::LobbyFull);
                }
                self.lobby.player_pool.push(caller.clone());
            }
            LobbyMove::LeaveSeat => {
                if !self.lobby.has_player(caller) {
                    return Ok(());
                }
                self.lobby.player_pool.retain(|id| id != caller);
            }
        }
        self.touch(now);
        debug!(
            target: LOG_TARGET,
            caller = %caller,
            pool = self.lobby.player_pool.len(),
            valid = self.lobby.is_lobby_valid,
            "applied lobby move"
        );
        Ok(())
    }

    pub fn set_options(&mut self, options: LobbyOptions, now: DateTime<Utc>) -> Result<(), LobbyError> {
        ensure_mutable(&self.lobby)?;
        validate_options(&options, &self.registry)?;
        self.options = options;
        self.touch(now);
        Ok(())
    }

    pub fn rename(&mut self, lobby_name: impl Into<String>, now: DateTime<Utc>) -> Result<(), LobbyError> {
        ensure_mutable(&self.lobby)?;
        self.lobby.lobby_name = lobby_name.into();
        self.touch(now);
        Ok(())
    }

    /// Turns the lobby into a table: seats the pool in order, writes the
    /// title's initial entry and freezes the lobby.
    pub fn start_game(
        &mut self,
        caller: &PlayerProfileId,
        now: DateTime<Utc>,
    ) -> Result<StartedGame, LobbyError> {
        let started = self.prepare_game(caller, now)?;
        self.commit_game(&started, now)?;
        Ok(started)
    }

    /// Builds the table and its initial entry without touching the lobby.
    /// Nothing changes until [`LobbyHost::commit_game`] is called with the
    /// result, so the caller can persist the table first.
    #[instrument(skip(self, now), fields(lobby_id = %self.lobby.id))]
    pub fn prepare_game(
        &self,
        caller: &PlayerProfileId,
        now: DateTime<Utc>,
    ) -> Result<StartedGame, LobbyError> {
        ensure_mutable(&self.lobby)?;
        if caller != self.lobby.host_id() {
            return Err(LobbyError::HostOnly(caller.clone()));
        }
        let title = match (&self.lobby.game_title, self.lobby.is_lobby_valid) {
            (Some(title), true) => title.clone(),
            _ => return Err(LobbyError::NotStartable),
        };
        let processor = self.registry.get(&title)?;

        let table = GameTable {
            id: crate::ids::GameTableId::new(),
            created_at: now,
            last_updated_at: now,
            game_title: title,
            game_host_player_profile_id: self.lobby.host_id().clone(),
            table_phase: TablePhase::Lobby,
            current_status_description: INITIAL_TABLE_STATUS.to_string(),
            seats: Seats::from_pool(&self.lobby.player_pool)?,
        };
        let initial = processor.initial_entry(&table)?;
        let mut log = ActionLog::new(table.id.clone());
        log.append(DbGameTableAction::new(
            table.id.clone(),
            now,
            ActionSource::Host,
            initial.action_type,
            initial.action_str,
            initial.state_str,
        ))?;
        Ok(StartedGame { table, log })
    }

    /// Links the lobby to a prepared table and freezes it.
    pub fn commit_game(
        &mut self,
        started: &StartedGame,
        now: DateTime<Utc>,
    ) -> Result<(), LobbyError> {
        ensure_mutable(&self.lobby)?;
        let table = &started.table;
        self.lobby.game_link = Some(format!("/table/{}", table.id));
        self.lobby.game_table_id = Some(table.id.clone());
        self.lobby.updated_at = now;

        info!(
            target: LOG_TARGET,
            table_id = %table.id,
            game_title = %table.game_title,
            players = table.player_count(),
            "lobby started a table"
        );
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.lobby.is_lobby_valid = compute_validity(&self.lobby);
        self.lobby.updated_at = now;
    }
}
