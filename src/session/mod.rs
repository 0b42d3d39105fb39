//! Long-running lobby and table sessions.
//!
//! A session joins one room, runs an event pump that feeds the room into the
//! matching synchronizer and publishes what changed. Host sessions also
//! persist every accepted change through [`TableStorage`](crate::storage::TableStorage).

mod error;
mod lobby;
mod pump;
mod table;


pub use error::SessionError;
pub use lobby::{HostLobbySession, PlayerLobbySession};
pub use table::{HostTableSession, PlayerTableSession};
