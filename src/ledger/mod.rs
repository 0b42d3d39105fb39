//! Per-table action log: ordered, append-only, full-state checkpoints.

pub mod hash;
mod log;
pub mod types;

pub use hash::StateHash;
pub use log::{ActionLog, ActionLogError};
pub use types::{ActionSource, DbGameTableAction, GameTableActionType, UnknownActionSource};
