use tracing::warn;

use crate::ids::{GameLobbyId, GameTableId, PlayerProfileId};

use super::types::{GameLobby, LobbySnapshot};

const LOG_TARGET: &str = "p2p_tables::lobby::mirror";

/// Read-only copy of a lobby held by a non-host peer.
#[derive(Debug, Clone)]
pub struct LobbyMirror {
    me: PlayerProfileId,
    lobby_id: GameLobbyId,
    snapshot: Option<LobbySnapshot>,
}

impl LobbyMirror {
    pub fn new(me: PlayerProfileId, lobby_id: GameLobbyId) -> Self {
        Self {
            me,
            lobby_id,
            snapshot: None,
        }
    }

    /// Replaces the mirror with `snapshot`. Snapshots of other lobbies are ignored.
    pub fn apply(&mut self, snapshot: LobbySnapshot) -> bool {
        if snapshot.lobby.id != self.lobby_id {
            warn!(
                target: LOG_TARGET,
                expected = %self.lobby_id,
                received = %snapshot.lobby.id,
                "ignoring snapshot for another lobby"
            );
            return false;
        }
        self.snapshot = Some(snapshot);
        true
    }

    pub fn snapshot(&self) -> Option<&LobbySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn lobby(&self) -> Option<&GameLobby> {
        self.snapshot.as_ref().map(|snapshot| &snapshot.lobby)
    }

    pub fn am_seated(&self) -> bool {
        self.lobby().is_some_and(|lobby| lobby.has_player(&self.me))
    }

    pub fn am_host(&self) -> bool {
        self.lobby().is_some_and(|lobby| lobby.host_id() == &self.me)
    }

    /// Only the host can start, and only a valid lobby that has not started yet.
    pub fn can_start(&self) -> bool {
        self.am_host()
            && self
                .lobby()
                .is_some_and(|lobby| lobby.is_lobby_valid && !lobby.is_frozen())
    }

    pub fn table_id(&self) -> Option<&GameTableId> {
        self.lobby().and_then(|lobby| lobby.game_table_id.as_ref())
    }
}
