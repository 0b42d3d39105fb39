//! Game tables: the host-side synchronizer and the read-only peer mirror.

mod error;
mod host;
mod mirror;
mod types;

#[cfg(test)]
mod tests;

pub use error::TableSyncError;
pub use host::{TableHost, TableSnapshot};
pub use mirror::{TableMirror, TableView};
pub use types::{GameTable, PlayerSeat, Seats, SeatingError, TablePhase, MAX_SEATS};
