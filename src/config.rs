use std::env;

use thiserror::Error;
use tracing::debug;

use crate::ids::{GameLobbyId, GameTableId};

const LOG_TARGET: &str = "p2p_tables::config";

pub const ROOM_PREFIX_ENV: &str = "P2P_TABLES_ROOM_PREFIX";
pub const UPDATE_CAPACITY_ENV: &str = "P2P_TABLES_UPDATE_CAPACITY";
pub const REBROADCAST_ON_JOIN_ENV: &str = "P2P_TABLES_REBROADCAST_ON_JOIN";

const DEFAULT_ROOM_PREFIX: &str = "p2p-tables";
const DEFAULT_UPDATE_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {var}")]
    InvalidValue { var: &'static str, value: String },
}

/// Knobs shared by every lobby and table session on a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Namespace prepended to every room name so unrelated apps sharing a
    /// transport never meet.
    pub room_prefix: String,
    /// Capacity of the host-side broadcast channel of accepted snapshots.
    pub update_channel_capacity: usize,
    /// Send the full snapshot to every peer that joins.
    pub rebroadcast_on_join: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room_prefix: DEFAULT_ROOM_PREFIX.to_string(),
            update_channel_capacity: DEFAULT_UPDATE_CAPACITY,
            rebroadcast_on_join: true,
        }
    }
}

impl SessionConfig {
    /// Reads overrides from the environment (and a `.env` file if present),
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let mut cfg = Self::default();

        if let Ok(prefix) = env::var(ROOM_PREFIX_ENV) {
            if prefix.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    var: ROOM_PREFIX_ENV,
                    value: prefix,
                });
            }
            cfg.room_prefix = prefix;
        }
        if let Ok(raw) = env::var(UPDATE_CAPACITY_ENV) {
            cfg.update_channel_capacity = raw
                .parse::<usize>()
                .ok()
                .filter(|capacity| *capacity > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: UPDATE_CAPACITY_ENV,
                    value: raw,
                })?;
        }
        if let Ok(raw) = env::var(REBROADCAST_ON_JOIN_ENV) {
            cfg.rebroadcast_on_join = raw.parse::<bool>().map_err(|_| ConfigError::InvalidValue {
                var: REBROADCAST_ON_JOIN_ENV,
                value: raw,
            })?;
        }

        debug!(target: LOG_TARGET, ?cfg, "loaded session config");
        Ok(cfg)
    }

    pub fn lobby_room(&self, lobby_id: &GameLobbyId) -> String {
        format!("{}/lobby/{}", self.room_prefix, lobby_id)
    }

    pub fn table_room(&self, table_id: &GameTableId) -> String {
        format!("{}/table/{}", self.room_prefix, table_id)
    }
}
