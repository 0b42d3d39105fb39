use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::ids::PeerId;

use super::{ChannelTag, JoinedRoom, Room, RoomConnector, RoomEvent, RoomMessage, TransportError};

const LOG_TARGET: &str = "p2p_tables::transport::local";

type Members = HashMap<PeerId, mpsc::UnboundedSender<RoomEvent>>;

/// In-process transport: every room is a map of member channels.
///
/// Clones share the same rooms, so one hub can stand in for the whole network
/// in tests and the demo.
#[derive(Clone, Default)]
pub struct LocalRoomHub {
    rooms: Arc<DashMap<String, Members>>,
}

impl LocalRoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self, room_id: &str) -> Vec<PeerId> {
        self.rooms
            .get(room_id)
            .map(|members| members.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn remove_member(&self, room_id: &str, peer: &PeerId) -> bool {
        let removed = match self.rooms.get_mut(room_id) {
            Some(mut members) => {
                let removed = members.remove(peer).is_some();
                if removed {
                    for tx in members.values() {
                        let _ = tx.send(RoomEvent::PeerLeft(peer.clone()));
                    }
                }
                removed
            }
            None => false,
        };
        self.rooms.remove_if(room_id, |_, members| members.is_empty());
        removed
    }
}

#[async_trait]
impl RoomConnector for LocalRoomHub {
    async fn join(&self, room_id: &str, peer: PeerId) -> Result<JoinedRoom, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut members = self.rooms.entry(room_id.to_string()).or_default();
            if members.contains_key(&peer) {
                return Err(TransportError::AlreadyJoined {
                    room: room_id.to_string(),
                    peer,
                });
            }
            for (existing, existing_tx) in members.iter() {
                let _ = existing_tx.send(RoomEvent::PeerJoined(peer.clone()));
                let _ = tx.send(RoomEvent::PeerJoined(existing.clone()));
            }
            members.insert(peer.clone(), tx);
        }
        debug!(target: LOG_TARGET, room = room_id, peer = %peer, "joined room");

        let room = LocalRoom {
            hub: self.clone(),
            room_id: room_id.to_string(),
            peer,
            left: AtomicBool::new(false),
        };
        Ok(JoinedRoom {
            room: Arc::new(room),
            events: rx,
        })
    }
}

pub struct LocalRoom {
    hub: LocalRoomHub,
    room_id: String,
    peer: PeerId,
    left: AtomicBool,
}

impl LocalRoom {
    fn leave_now(&self) {
        if self.left.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.hub.remove_member(&self.room_id, &self.peer) {
            debug!(target: LOG_TARGET, room = %self.room_id, peer = %self.peer, "left room");
        }
    }
}

#[async_trait]
impl Room for LocalRoom {
    fn room_id(&self) -> &str {
        &self.room_id
    }

    fn local_peer(&self) -> &PeerId {
        &self.peer
    }

    async fn send(
        &self,
        tag: ChannelTag,
        payload: serde_json::Value,
        target: Option<&PeerId>,
    ) -> Result<(), TransportError> {
        let members = self
            .hub
            .rooms
            .get(&self.room_id)
            .filter(|members| members.contains_key(&self.peer))
            .ok_or_else(|| TransportError::NotMember(self.room_id.clone()))?;

        let message = RoomMessage {
            from: self.peer.clone(),
            tag,
            payload,
        };
        match target {
            Some(target) => {
                let tx = members
                    .get(target)
                    .ok_or_else(|| TransportError::UnknownPeer(target.clone()))?;
                let _ = tx.send(RoomEvent::Message(message));
            }
            None => {
                for (peer, tx) in members.iter().filter(|(peer, _)| **peer != self.peer) {
                    trace!(target: LOG_TARGET, room = %self.room_id, to = %peer, %tag, "delivering");
                    let _ = tx.send(RoomEvent::Message(message.clone()));
                }
            }
        }
        Ok(())
    }

    async fn leave(&self) -> Result<(), TransportError> {
        self.leave_now();
        Ok(())
    }
}

impl Drop for LocalRoom {
    fn drop(&mut self) {
        self.leave_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next(events: &mut mpsc::UnboundedReceiver<RoomEvent>) -> RoomEvent {
        tokio::time::timeout(std::time::Duration::from_secs(1), events.recv())
            .await
            .expect("event arrives")
            .expect("channel open")
    }

    #[tokio::test]
    async fn joins_are_announced_both_ways() {
        let hub = LocalRoomHub::new();
        let mut a = hub.join("room", PeerId::from("a")).await.unwrap();
        let mut b = hub.join("room", PeerId::from("b")).await.unwrap();

        assert_eq!(next(&mut a.events).await, RoomEvent::PeerJoined(PeerId::from("b")));
        assert_eq!(next(&mut b.events).await, RoomEvent::PeerJoined(PeerId::from("a")));
        assert!(matches!(
            hub.join("room", PeerId::from("a")).await,
            Err(TransportError::AlreadyJoined { .. })
        ));
    }

    #[tokio::test]
    async fn broadcast_skips_sender_and_targeted_send_reaches_one_peer() {
        let hub = LocalRoomHub::new();
        let mut a = hub.join("room", PeerId::from("a")).await.unwrap();
        let mut b = hub.join("room", PeerId::from("b")).await.unwrap();
        let mut c = hub.join("room", PeerId::from("c")).await.unwrap();
        // Drain join notifications.
        for _ in 0..2 {
            next(&mut a.events).await;
            next(&mut b.events).await;
            next(&mut c.events).await;
        }

        a.room
            .send(ChannelTag::LobbyDetails, serde_json::json!({"n": 1}), None)
            .await
            .unwrap();
        for events in [&mut b.events, &mut c.events] {
            match next(events).await {
                RoomEvent::Message(message) => {
                    assert_eq!(message.from, PeerId::from("a"));
                    assert_eq!(message.tag, ChannelTag::LobbyDetails);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(a.events.try_recv().is_err());

        let target = PeerId::from("c");
        b.room
            .send(ChannelTag::TablePlayerMove, serde_json::json!({}), Some(&target))
            .await
            .unwrap();
        assert!(matches!(next(&mut c.events).await, RoomEvent::Message(_)));
        assert!(a.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn leaving_notifies_and_is_idempotent() {
        let hub = LocalRoomHub::new();
        let mut a = hub.join("room", PeerId::from("a")).await.unwrap();
        let b = hub.join("room", PeerId::from("b")).await.unwrap();
        next(&mut a.events).await;

        b.room.leave().await.unwrap();
        b.room.leave().await.unwrap();
        assert_eq!(next(&mut a.events).await, RoomEvent::PeerLeft(PeerId::from("b")));
        assert!(a.events.try_recv().is_err());
        assert_eq!(hub.members("room"), vec![PeerId::from("a")]);
        assert!(matches!(
            b.room.send(ChannelTag::TableData, serde_json::json!({}), None).await,
            Err(TransportError::NotMember(_))
        ));

        drop(a);
        assert!(hub.members("room").is_empty());
    }
}
