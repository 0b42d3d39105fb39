//! Room abstraction over the peer-to-peer transport.
//!
//! A room is a named channel: peers join and leave, and every message carries
//! one of the fixed [`ChannelTag`]s plus a JSON payload.

mod local;
pub mod wire;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::ids::PeerId;

pub use local::{LocalRoom, LocalRoomHub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelTag {
    LobbyDetails,
    LobbyPlayerProfile,
    LobbyPlayerMove,
    TableData,
    TableActions,
    TablePlayerProfile,
    TablePlayerMove,
    TableHostAction,
}

impl ChannelTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelTag::LobbyDetails => "lobby-details",
            ChannelTag::LobbyPlayerProfile => "lobby-player-profile",
            ChannelTag::LobbyPlayerMove => "lobby-player-move",
            ChannelTag::TableData => "table-data",
            ChannelTag::TableActions => "table-actions",
            ChannelTag::TablePlayerProfile => "table-player-profile",
            ChannelTag::TablePlayerMove => "table-player-move",
            ChannelTag::TableHostAction => "table-host-action",
        }
    }
}

impl fmt::Display for ChannelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer {peer} already joined room `{room}`")]
    AlreadyJoined { room: String, peer: PeerId },
    #[error("peer is not a member of room `{0}`")]
    NotMember(String),
    #[error("peer {0} is not in the room")]
    UnknownPeer(PeerId),
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomMessage {
    pub from: PeerId,
    pub tag: ChannelTag,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    Message(RoomMessage),
}

#[async_trait]
pub trait Room: Send + Sync {
    fn room_id(&self) -> &str;

    fn local_peer(&self) -> &PeerId;

    /// Sends to `target` only, or to every other member when `None`.
    async fn send(
        &self,
        tag: ChannelTag,
        payload: serde_json::Value,
        target: Option<&PeerId>,
    ) -> Result<(), TransportError>;

    /// Leaves the room. Calling it again is a no-op.
    async fn leave(&self) -> Result<(), TransportError>;
}

/// Membership handle plus the event stream, handed out together so no event
/// between joining and subscribing can be missed.
pub struct JoinedRoom {
    pub room: Arc<dyn Room>,
    pub events: mpsc::UnboundedReceiver<RoomEvent>,
}

#[async_trait]
pub trait RoomConnector: Send + Sync {
    async fn join(&self, room_id: &str, peer: PeerId) -> Result<JoinedRoom, TransportError>;
}

/// Serializes `payload` and sends it on `tag`.
pub async fn send_json<T: Serialize + Sync>(
    room: &dyn Room,
    tag: ChannelTag,
    payload: &T,
    target: Option<&PeerId>,
) -> Result<(), TransportError> {
    let value = serde_json::to_value(payload)?;
    room.send(tag, value, target).await
}
