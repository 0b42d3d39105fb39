use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::config::SessionConfig;
use crate::engine::{GameRegistry, GameTitle};
use crate::ids::{GameLobbyId, GameTableId, PeerId, PlayerProfileId};
use crate::lobby::{LobbyHost, LobbyMirror, LobbyMove, LobbyOptions, LobbySnapshot};
use crate::profile::{PeerProfiles, ProfileAnnouncement, PublicPlayerProfile};
use crate::storage::{StorageError, TableStorage};
use crate::transport::{send_json, ChannelTag, Room, RoomConnector, RoomEvent, RoomMessage};

use super::error::SessionError;
use super::pump::{decode_payload, PumpHandle, RoomEventHandler};
use super::table::HostTableSession;

const LOG_TARGET: &str = "p2p_tables::session::lobby";

fn log_failure(what: &'static str, err: &SessionError) {
    if err.is_rejection() {
        warn!(target: LOG_TARGET, error = %err, "{what} rejected");
    } else {
        error!(target: LOG_TARGET, error = %err, "{what} failed");
    }
}

struct HostLobbyState {
    host: LobbyHost,
    profiles: PeerProfiles,
}

struct HostLobbyShared {
    config: SessionConfig,
    registry: Arc<GameRegistry>,
    storage: Arc<dyn TableStorage>,
    connector: Arc<dyn RoomConnector>,
    room: Arc<dyn Room>,
    state: Mutex<HostLobbyState>,
    snapshots: watch::Sender<LobbySnapshot>,
}

impl HostLobbyShared {
    /// Persists the lobby, then pushes the whole snapshot to every peer. The
    /// in-memory lobby is authoritative, so peers get the snapshot even when
    /// storage fails; the storage error is still returned.
    async fn publish(&self, host: &LobbyHost) -> Result<LobbySnapshot, SessionError> {
        let snapshot = host.snapshot();
        let persisted = self.storage.set_lobby(&snapshot.lobby).await;
        if let Err(err) = &persisted {
            error!(
                target: LOG_TARGET,
                lobby_id = %snapshot.lobby.id,
                error = %err,
                "failed to persist lobby"
            );
        }
        self.snapshots.send_replace(snapshot.clone());
        send_json(self.room.as_ref(), ChannelTag::LobbyDetails, &snapshot, None).await?;
        persisted?;
        Ok(snapshot)
    }

    async fn apply_move(
        &self,
        state: &mut HostLobbyState,
        caller: &PlayerProfileId,
        lobby_move: &LobbyMove,
    ) -> Result<LobbySnapshot, SessionError> {
        state.host.apply_move(caller, lobby_move, Utc::now())?;
        self.publish(&state.host).await
    }

    async fn greet(&self, peer: &PeerId) -> Result<(), SessionError> {
        let state = self.state.lock().await;
        let announcement = ProfileAnnouncement::lobby(state.profiles.local().clone());
        send_json(
            self.room.as_ref(),
            ChannelTag::LobbyPlayerProfile,
            &announcement,
            Some(peer),
        )
        .await?;
        if self.config.rebroadcast_on_join {
            send_json(
                self.room.as_ref(),
                ChannelTag::LobbyDetails,
                &state.host.snapshot(),
                Some(peer),
            )
            .await?;
        }
        Ok(())
    }

    async fn on_player_move(&self, message: RoomMessage) {
        let Some(lobby_move) = decode_payload::<LobbyMove>(&message) else {
            return;
        };
        let mut state = self.state.lock().await;
        let Some(caller) = state
            .profiles
            .profile_for_peer(&message.from)
            .map(|profile| profile.id.clone())
        else {
            warn!(
                target: LOG_TARGET,
                peer = %message.from,
                "dropping lobby move from a peer that has not announced a profile"
            );
            return;
        };
        if let Err(err) = self.apply_move(&mut state, &caller, &lobby_move).await {
            log_failure("lobby move", &err);
        }
    }
}

#[async_trait]
impl RoomEventHandler for HostLobbyShared {
    async fn handle(&self, event: RoomEvent) {
        match event {
            RoomEvent::PeerJoined(peer) => {
                if let Err(err) = self.greet(&peer).await {
                    log_failure("lobby greeting", &err);
                }
            }
            RoomEvent::PeerLeft(peer) => {
                self.state.lock().await.profiles.on_peer_left(&peer);
            }
            RoomEvent::Message(message) => match message.tag {
                ChannelTag::LobbyPlayerProfile => {
                    if let Some(announcement) = decode_payload::<ProfileAnnouncement>(&message) {
                        let mut state = self.state.lock().await;
                        state.profiles.on_profile_received(message.from, announcement);
                    }
                }
                ChannelTag::LobbyPlayerMove => self.on_player_move(message).await,
                tag => debug!(target: LOG_TARGET, %tag, "ignoring message on lobby room"),
            },
        }
    }
}

/// The host's side of a lobby room.
///
/// Owns the [`LobbyHost`], answers every joining peer with its profile and the
/// current snapshot, and applies inbound `lobby-player-move`s one at a time.
pub struct HostLobbySession {
    lobby_id: GameLobbyId,
    shared: Arc<HostLobbyShared>,
    pump: PumpHandle,
}

impl HostLobbySession {
    #[instrument(skip_all, fields(host = %host_profile.id))]
    pub async fn open(
        connector: Arc<dyn RoomConnector>,
        storage: Arc<dyn TableStorage>,
        registry: Arc<GameRegistry>,
        config: SessionConfig,
        host_profile: PublicPlayerProfile,
        lobby_name: impl Into<String>,
        options: LobbyOptions,
    ) -> Result<Self, SessionError> {
        let host = LobbyHost::new(
            registry.clone(),
            host_profile,
            lobby_name,
            options,
            Utc::now(),
        )?;
        Self::host(connector, storage, registry, config, host).await
    }

    /// Hosts a lobby that was persisted by an earlier session.
    #[instrument(skip(connector, storage, registry, config, options))]
    pub async fn resume(
        connector: Arc<dyn RoomConnector>,
        storage: Arc<dyn TableStorage>,
        registry: Arc<GameRegistry>,
        config: SessionConfig,
        lobby_id: GameLobbyId,
        options: LobbyOptions,
    ) -> Result<Self, SessionError> {
        let lobby = storage
            .get_lobby(&lobby_id)
            .await?
            .ok_or_else(|| StorageError::not_found("lobby", &lobby_id))?;
        let host = LobbyHost::from_lobby(registry.clone(), lobby, options)?;
        Self::host(connector, storage, registry, config, host).await
    }

    async fn host(
        connector: Arc<dyn RoomConnector>,
        storage: Arc<dyn TableStorage>,
        registry: Arc<GameRegistry>,
        config: SessionConfig,
        host: LobbyHost,
    ) -> Result<Self, SessionError> {
        let lobby_id = host.lobby().id.clone();
        storage.set_lobby(host.lobby()).await?;

        let joined = connector
            .join(&config.lobby_room(&lobby_id), PeerId::random())
            .await?;
        let (snapshots, _) = watch::channel(host.snapshot());
        let profiles = PeerProfiles::new(host.host_profile().clone());
        let shared = Arc::new(HostLobbyShared {
            config,
            registry,
            storage,
            connector,
            room: joined.room,
            state: Mutex::new(HostLobbyState { host, profiles }),
            snapshots,
        });
        let pump = PumpHandle::spawn(
            format!("host-lobby-{lobby_id}"),
            joined.events,
            shared.clone(),
        );
        info!(
            target: LOG_TARGET,
            lobby_id = %lobby_id,
            peer = %shared.room.local_peer(),
            "hosting lobby"
        );
        Ok(Self {
            lobby_id,
            shared,
            pump,
        })
    }

    pub fn lobby_id(&self) -> &GameLobbyId {
        &self.lobby_id
    }

    pub fn peer_id(&self) -> &PeerId {
        self.shared.room.local_peer()
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Follows every snapshot the host publishes.
    pub fn subscribe(&self) -> watch::Receiver<LobbySnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Applies a move on behalf of the host's own profile.
    pub async fn apply_own_move(&self, lobby_move: LobbyMove) -> Result<LobbySnapshot, SessionError> {
        let mut state = self.shared.state.lock().await;
        let host_id = state.host.host_profile().id.clone();
        self.shared.apply_move(&mut state, &host_id, &lobby_move).await
    }

    pub async fn set_options(&self, options: LobbyOptions) -> Result<LobbySnapshot, SessionError> {
        let mut state = self.shared.state.lock().await;
        state.host.set_options(options, Utc::now())?;
        self.shared.publish(&state.host).await
    }

    pub async fn rename(&self, lobby_name: impl Into<String>) -> Result<LobbySnapshot, SessionError> {
        let mut state = self.shared.state.lock().await;
        state.host.rename(lobby_name, Utc::now())?;
        self.shared.publish(&state.host).await
    }

    /// Starts the table, persists it with its first entry, broadcasts the
    /// frozen lobby and opens the host's table session.
    ///
    /// The lobby is only frozen once the table is in storage; if storing the
    /// table fails the lobby stays open and the call can be retried. The
    /// lobby session stays up so late joiners still learn the table id.
    #[instrument(skip(self), fields(lobby_id = %self.lobby_id))]
    pub async fn start_game(&self) -> Result<HostTableSession, SessionError> {
        let shared = &self.shared;
        let mut state = shared.state.lock().await;
        let host_profile = state.host.host_profile().clone();
        let now = Utc::now();
        let started = state.host.prepare_game(&host_profile.id, now)?;

        shared.storage.set_table(&started.table).await?;
        for entry in started.log.iter() {
            shared.storage.append_action(entry).await?;
        }
        state.host.commit_game(&started, now)?;
        // The table is stored; a failed lobby write is only logged.
        if let Err(err) = shared.publish(&state.host).await {
            log_failure("frozen lobby publish", &err);
        }
        drop(state);

        HostTableSession::open(
            shared.connector.as_ref(),
            shared.storage.clone(),
            &shared.registry,
            shared.config.clone(),
            host_profile,
            started.table,
            started.log,
        )
        .await
    }

    pub async fn leave(&self) -> Result<(), SessionError> {
        self.pump.stop().await;
        self.shared.room.leave().await?;
        info!(target: LOG_TARGET, lobby_id = %self.lobby_id, "host left lobby");
        Ok(())
    }
}

struct PlayerLobbyState {
    mirror: LobbyMirror,
    profiles: PeerProfiles,
    host_peer: Option<PeerId>,
}

struct PlayerLobbyShared {
    room: Arc<dyn Room>,
    local: PublicPlayerProfile,
    state: parking_lot::Mutex<PlayerLobbyState>,
    snapshots: watch::Sender<Option<LobbySnapshot>>,
}

impl PlayerLobbyShared {
    fn on_details(&self, message: &RoomMessage) {
        let Some(snapshot) = decode_payload::<LobbySnapshot>(message) else {
            return;
        };
        let mut state = self.state.lock();
        let host_id = state
            .mirror
            .lobby()
            .map(|known| known.host_id().clone())
            .unwrap_or_else(|| snapshot.lobby.host_id().clone());
        let from_host = state
            .profiles
            .profile_for_peer(&message.from)
            .is_some_and(|profile| profile.id == host_id);
        if !from_host {
            warn!(
                target: LOG_TARGET,
                peer = %message.from,
                "ignoring lobby details from a peer that is not the lobby host"
            );
            return;
        }
        if state.mirror.apply(snapshot) {
            state.host_peer = Some(message.from.clone());
            self.snapshots.send_replace(state.mirror.snapshot().cloned());
        }
    }
}

#[async_trait]
impl RoomEventHandler for PlayerLobbyShared {
    async fn handle(&self, event: RoomEvent) {
        match event {
            RoomEvent::PeerJoined(peer) => {
                let announcement = ProfileAnnouncement::lobby(self.local.clone());
                let sent = send_json(
                    self.room.as_ref(),
                    ChannelTag::LobbyPlayerProfile,
                    &announcement,
                    Some(&peer),
                )
                .await;
                if let Err(err) = sent {
                    warn!(target: LOG_TARGET, peer = %peer, error = %err, "failed to announce profile");
                }
            }
            RoomEvent::PeerLeft(peer) => {
                let mut state = self.state.lock();
                state.profiles.on_peer_left(&peer);
                if state.host_peer.as_ref() == Some(&peer) {
                    warn!(target: LOG_TARGET, peer = %peer, "lobby host left the room");
                    state.host_peer = None;
                }
            }
            RoomEvent::Message(message) => match message.tag {
                ChannelTag::LobbyPlayerProfile => {
                    if let Some(announcement) = decode_payload::<ProfileAnnouncement>(&message) {
                        self.state
                            .lock()
                            .profiles
                            .on_profile_received(message.from, announcement);
                    }
                }
                ChannelTag::LobbyDetails => self.on_details(&message),
                tag => debug!(target: LOG_TARGET, %tag, "ignoring message on lobby room"),
            },
        }
    }
}

/// A non-host peer in a lobby room: a [`LobbyMirror`] kept current by the
/// host's snapshots, plus a way to send moves back.
pub struct PlayerLobbySession {
    lobby_id: GameLobbyId,
    shared: Arc<PlayerLobbyShared>,
    pump: PumpHandle,
}

impl PlayerLobbySession {
    #[instrument(skip(connector, config, profile), fields(profile = %profile.id))]
    pub async fn open(
        connector: &dyn RoomConnector,
        config: &SessionConfig,
        profile: PublicPlayerProfile,
        lobby_id: GameLobbyId,
    ) -> Result<Self, SessionError> {
        let joined = connector
            .join(&config.lobby_room(&lobby_id), PeerId::random())
            .await?;
        let (snapshots, _) = watch::channel(None);
        let shared = Arc::new(PlayerLobbyShared {
            room: joined.room,
            state: parking_lot::Mutex::new(PlayerLobbyState {
                mirror: LobbyMirror::new(profile.id.clone(), lobby_id.clone()),
                profiles: PeerProfiles::new(profile.clone()),
                host_peer: None,
            }),
            local: profile,
            snapshots,
        });
        let pump = PumpHandle::spawn(
            format!("player-lobby-{lobby_id}"),
            joined.events,
            shared.clone(),
        );
        debug!(target: LOG_TARGET, lobby_id = %lobby_id, "joined lobby");
        Ok(Self {
            lobby_id,
            shared,
            pump,
        })
    }

    pub fn lobby_id(&self) -> &GameLobbyId {
        &self.lobby_id
    }

    pub fn snapshot(&self) -> Option<LobbySnapshot> {
        self.shared.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LobbySnapshot>> {
        self.shared.snapshots.subscribe()
    }

    pub fn am_seated(&self) -> bool {
        self.shared.state.lock().mirror.am_seated()
    }

    pub fn can_start(&self) -> bool {
        self.shared.state.lock().mirror.can_start()
    }

    /// Set once the host has started the game.
    pub fn table_id(&self) -> Option<GameTableId> {
        self.shared.state.lock().mirror.table_id().cloned()
    }

    /// Sends `lobby_move` to the host. Before the host is known it goes to
    /// the whole room, where only the host acts on it.
    pub async fn send_move(&self, lobby_move: &LobbyMove) -> Result<(), SessionError> {
        if self.pump.is_stopped() {
            return Err(SessionError::Closed);
        }
        let host_peer = self.shared.state.lock().host_peer.clone();
        send_json(
            self.shared.room.as_ref(),
            ChannelTag::LobbyPlayerMove,
            lobby_move,
            host_peer.as_ref(),
        )
        .await?;
        Ok(())
    }

    pub async fn take_seat(&self) -> Result<(), SessionError> {
        self.send_move(&LobbyMove::TakeSeat).await
    }

    pub async fn leave_seat(&self) -> Result<(), SessionError> {
        self.send_move(&LobbyMove::LeaveSeat).await
    }

    pub async fn choose_game(&self, game_choice: GameTitle) -> Result<(), SessionError> {
        self.send_move(&LobbyMove::SetGameChoice { game_choice })
            .await
    }

    pub async fn leave(&self) -> Result<(), SessionError> {
        self.pump.stop().await;
        self.shared.room.leave().await?;
        debug!(target: LOG_TARGET, lobby_id = %self.lobby_id, "left lobby");
        Ok(())
    }
}
