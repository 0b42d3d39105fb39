//! Payloads carried on the table channels that are not already domain types.

use serde::{Deserialize, Serialize};

/// Sent by a player on `table-player-move`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerActionSubmission {
    pub action_str: String,
}

/// Sent on `table-host-action`. The host applies its own actions directly,
/// so one arriving over the room is always dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostActionSubmission {
    pub action_str: String,
}
