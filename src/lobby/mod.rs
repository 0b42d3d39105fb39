//! Pre-game lobby: player pool, game choice and the hand-off to a table.

pub mod error;
mod host;
mod mirror;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;

pub use error::LobbyError;
pub use host::{LobbyHost, StartedGame, INITIAL_TABLE_STATUS};
pub use mirror::LobbyMirror;
pub use types::{GameLobby, LobbyMove, LobbyOptions, LobbySnapshot};
pub use validation::compute_validity;
