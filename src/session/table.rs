use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::config::SessionConfig;
use crate::engine::{GameProcessor, GameRegistry};
use crate::ids::{GameTableId, PeerId, PlayerProfileId};
use crate::ledger::{ActionLog, DbGameTableAction};
use crate::profile::{PeerProfiles, ProfileAnnouncement, PublicPlayerProfile, TableRole};
use crate::storage::TableStorage;
use crate::table::{GameTable, TableHost, TableMirror, TableSnapshot, TableSyncError, TableView};
use crate::transport::wire::{HostActionSubmission, PlayerActionSubmission};
use crate::transport::{send_json, ChannelTag, Room, RoomConnector, RoomEvent, RoomMessage};

use super::error::SessionError;
use super::pump::{decode_payload, PumpHandle, RoomEventHandler};

const LOG_TARGET: &str = "p2p_tables::session::table";

struct HostTableState {
    host: TableHost,
    profiles: PeerProfiles,
    /// Log entries known to be in storage.
    persisted: usize,
}

struct HostTableShared {
    config: SessionConfig,
    storage: Arc<dyn TableStorage>,
    room: Arc<dyn Room>,
    state: Mutex<HostTableState>,
    updates: broadcast::Sender<TableSnapshot>,
}

impl HostTableShared {
    /// Appends every entry past `persisted`, advancing it as each one lands,
    /// so an earlier failed write is retried instead of leaving a gap.
    async fn persist(
        &self,
        persisted: &mut usize,
        snapshot: &TableSnapshot,
    ) -> Result<(), SessionError> {
        for entry in snapshot.actions.iter().skip(*persisted) {
            self.storage.append_action(entry).await?;
            *persisted += 1;
        }
        self.storage.set_table(&snapshot.table).await?;
        Ok(())
    }

    async fn send_snapshot(
        &self,
        snapshot: &TableSnapshot,
        target: Option<&PeerId>,
    ) -> Result<(), SessionError> {
        send_json(self.room.as_ref(), ChannelTag::TableData, &snapshot.table, target).await?;
        send_json(
            self.room.as_ref(),
            ChannelTag::TableActions,
            &snapshot.actions,
            target,
        )
        .await?;
        Ok(())
    }

    /// Persists and broadcasts an accepted change. The in-memory log is
    /// authoritative, so peers get the snapshot even when storage fails.
    async fn publish(
        &self,
        persisted: &mut usize,
        snapshot: &TableSnapshot,
    ) -> Result<(), SessionError> {
        let persisted = self.persist(persisted, snapshot).await;
        if let Err(err) = &persisted {
            error!(
                target: LOG_TARGET,
                table_id = %snapshot.table.id,
                error = %err,
                "failed to persist accepted table action"
            );
        }
        self.send_snapshot(snapshot, None).await?;
        // No receivers is fine.
        let _ = self.updates.send(snapshot.clone());
        persisted
    }

    async fn greet(&self, peer: &PeerId) -> Result<(), SessionError> {
        let state = self.state.lock().await;
        let announcement = ProfileAnnouncement::table(state.profiles.local().clone(), TableRole::Host);
        send_json(
            self.room.as_ref(),
            ChannelTag::TablePlayerProfile,
            &announcement,
            Some(peer),
        )
        .await?;
        if self.config.rebroadcast_on_join {
            self.send_snapshot(&state.host.snapshot(), Some(peer)).await?;
        }
        Ok(())
    }

    async fn on_player_move(&self, message: RoomMessage) {
        let Some(submission) = decode_payload::<PlayerActionSubmission>(&message) else {
            return;
        };
        let mut state = self.state.lock().await;
        let Some(profile_id) = state
            .profiles
            .profile_for_peer(&message.from)
            .map(|profile| profile.id.clone())
        else {
            warn!(
                target: LOG_TARGET,
                peer = %message.from,
                "dropping table action from a peer that has not announced a profile"
            );
            return;
        };
        let Ok(snapshot) = state
            .host
            .submit_player_action(&profile_id, &submission.action_str, Utc::now())
            .await
        else {
            // TableHost already logged the rejection.
            return;
        };
        if let Err(err) = self.publish(&mut state.persisted, &snapshot).await {
            error!(target: LOG_TARGET, error = %err, "failed to publish table action");
        }
    }
}

#[async_trait]
impl RoomEventHandler for HostTableShared {
    async fn handle(&self, event: RoomEvent) {
        match event {
            RoomEvent::PeerJoined(peer) => {
                if let Err(err) = self.greet(&peer).await {
                    warn!(target: LOG_TARGET, peer = %peer, error = %err, "failed to greet peer");
                }
            }
            RoomEvent::PeerLeft(peer) => {
                self.state.lock().await.profiles.on_peer_left(&peer);
            }
            RoomEvent::Message(message) => match message.tag {
                ChannelTag::TablePlayerProfile => {
                    if let Some(announcement) = decode_payload::<ProfileAnnouncement>(&message) {
                        let mut state = self.state.lock().await;
                        state.profiles.on_profile_received(message.from, announcement);
                    }
                }
                ChannelTag::TablePlayerMove => self.on_player_move(message).await,
                ChannelTag::TableHostAction => {
                    let submitted = decode_payload::<HostActionSubmission>(&message);
                    warn!(
                        target: LOG_TARGET,
                        peer = %message.from,
                        action = ?submitted.map(|submission| submission.action_str),
                        error = %TableSyncError::HostOnly,
                        "dropping host action sent by another peer"
                    );
                }
                tag => debug!(target: LOG_TARGET, %tag, "ignoring message on table room"),
            },
        }
    }
}

/// The host's side of a table room: the only place actions are validated,
/// applied and appended.
pub struct HostTableSession {
    table_id: GameTableId,
    shared: Arc<HostTableShared>,
    pump: PumpHandle,
}

impl HostTableSession {
    /// Hosts `table`. Every entry of `log` must already be in `storage`.
    #[instrument(skip_all, fields(table_id = %table.id))]
    pub async fn open(
        connector: &dyn RoomConnector,
        storage: Arc<dyn TableStorage>,
        registry: &GameRegistry,
        config: SessionConfig,
        host_profile: PublicPlayerProfile,
        table: GameTable,
        log: ActionLog,
    ) -> Result<Self, SessionError> {
        if table.game_host_player_profile_id != host_profile.id {
            return Err(TableSyncError::HostOnly.into());
        }
        let persisted = log.len();
        let host = TableHost::new(registry, table, log)?;
        let table_id = host.table().id.clone();

        let joined = connector
            .join(&config.table_room(&table_id), PeerId::random())
            .await?;
        let (updates, _) = broadcast::channel(config.update_channel_capacity.max(1));
        let shared = Arc::new(HostTableShared {
            config,
            storage,
            room: joined.room,
            state: Mutex::new(HostTableState {
                host,
                profiles: PeerProfiles::new(host_profile),
                persisted,
            }),
            updates,
        });
        let pump = PumpHandle::spawn(
            format!("host-table-{table_id}"),
            joined.events,
            shared.clone(),
        );
        info!(
            target: LOG_TARGET,
            table_id = %table_id,
            peer = %shared.room.local_peer(),
            "hosting table"
        );
        Ok(Self {
            table_id,
            shared,
            pump,
        })
    }

    /// Rebuilds the host from storage, e.g. after the host's app restarted.
    #[instrument(skip(connector, storage, registry, config, host_profile))]
    pub async fn resume(
        connector: &dyn RoomConnector,
        storage: Arc<dyn TableStorage>,
        registry: &GameRegistry,
        config: SessionConfig,
        host_profile: PublicPlayerProfile,
        table_id: GameTableId,
    ) -> Result<Self, SessionError> {
        let table = storage
            .get_table(&table_id)
            .await?
            .ok_or_else(|| SessionError::NothingToResume(table_id.clone()))?;
        let entries = storage.get_actions(&table_id).await?;
        let log = ActionLog::from_entries(table_id, entries).map_err(TableSyncError::from)?;
        Self::open(connector, storage, registry, config, host_profile, table, log).await
    }

    pub fn table_id(&self) -> &GameTableId {
        &self.table_id
    }

    pub fn peer_id(&self) -> &PeerId {
        self.shared.room.local_peer()
    }

    pub async fn snapshot(&self) -> TableSnapshot {
        self.shared.state.lock().await.host.snapshot()
    }

    /// Every snapshot the host accepts from now on, in order.
    pub fn updates(&self) -> broadcast::Receiver<TableSnapshot> {
        self.shared.updates.subscribe()
    }

    pub async fn submit_host_action(&self, action_str: &str) -> Result<TableSnapshot, SessionError> {
        let mut state = self.shared.state.lock().await;
        let snapshot = state
            .host
            .submit_host_action(action_str, Utc::now())
            .await?;
        self.shared.publish(&mut state.persisted, &snapshot).await?;
        Ok(snapshot)
    }

    /// Submits an action for the host's own seat, when the host also plays.
    pub async fn submit_own_action(&self, action_str: &str) -> Result<TableSnapshot, SessionError> {
        let mut state = self.shared.state.lock().await;
        let host_id: PlayerProfileId = state.profiles.local().id.clone();
        let snapshot = state
            .host
            .submit_player_action(&host_id, action_str, Utc::now())
            .await?;
        self.shared.publish(&mut state.persisted, &snapshot).await?;
        Ok(snapshot)
    }

    pub async fn leave(&self) -> Result<(), SessionError> {
        self.pump.stop().await;
        self.shared.room.leave().await?;
        info!(target: LOG_TARGET, table_id = %self.table_id, "host left table");
        Ok(())
    }
}

struct PlayerTableState {
    mirror: TableMirror,
    profiles: PeerProfiles,
}

impl PlayerTableState {
    /// Only the table's host may replace the mirror. Before the table is
    /// known, the peer that announced itself as host is trusted.
    fn sent_by_host(&self, from: &PeerId, host_id: Option<&PlayerProfileId>) -> bool {
        let Some(profile) = self.profiles.profile_for_peer(from) else {
            return false;
        };
        match host_id {
            Some(host_id) => &profile.id == host_id,
            None => self.profiles.role_of(from) == Some(TableRole::Host),
        }
    }
}

struct PlayerTableShared {
    registry: Arc<GameRegistry>,
    room: Arc<dyn Room>,
    announcement: ProfileAnnouncement,
    state: parking_lot::Mutex<PlayerTableState>,
    views: watch::Sender<Option<TableView>>,
}

impl PlayerTableShared {
    fn refresh(&self, state: &PlayerTableState) {
        let view = state.mirror.view(&self.registry);
        self.views.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }

    fn on_table(&self, message: &RoomMessage) {
        let Some(table) = decode_payload::<GameTable>(message) else {
            return;
        };
        let mut state = self.state.lock();
        let host_id = state
            .mirror
            .table()
            .map(|known| known.game_host_player_profile_id.clone())
            .unwrap_or_else(|| table.game_host_player_profile_id.clone());
        if !state.sent_by_host(&message.from, Some(&host_id)) {
            warn!(target: LOG_TARGET, peer = %message.from, "ignoring table data from a non-host peer");
            return;
        }
        if state.mirror.apply_table(table) {
            self.refresh(&state);
        }
    }

    fn on_actions(&self, message: &RoomMessage) {
        let Some(actions) = decode_payload::<Vec<DbGameTableAction>>(message) else {
            return;
        };
        let mut state = self.state.lock();
        let host_id = state
            .mirror
            .table()
            .map(|known| known.game_host_player_profile_id.clone());
        if !state.sent_by_host(&message.from, host_id.as_ref()) {
            warn!(target: LOG_TARGET, peer = %message.from, "ignoring table actions from a non-host peer");
            return;
        }
        if state.mirror.apply_actions(actions) {
            self.refresh(&state);
        }
    }
}

#[async_trait]
impl RoomEventHandler for PlayerTableShared {
    async fn handle(&self, event: RoomEvent) {
        match event {
            RoomEvent::PeerJoined(peer) => {
                let sent = send_json(
                    self.room.as_ref(),
                    ChannelTag::TablePlayerProfile,
                    &self.announcement,
                    Some(&peer),
                )
                .await;
                if let Err(err) = sent {
                    warn!(target: LOG_TARGET, peer = %peer, error = %err, "failed to announce profile");
                }
            }
            RoomEvent::PeerLeft(peer) => {
                let mut state = self.state.lock();
                if state.profiles.role_of(&peer) == Some(TableRole::Host) {
                    warn!(target: LOG_TARGET, peer = %peer, "table host left the room");
                }
                state.profiles.on_peer_left(&peer);
            }
            RoomEvent::Message(message) => match message.tag {
                ChannelTag::TablePlayerProfile => {
                    if let Some(announcement) = decode_payload::<ProfileAnnouncement>(&message) {
                        self.state
                            .lock()
                            .profiles
                            .on_profile_received(message.from, announcement);
                    }
                }
                ChannelTag::TableData => self.on_table(&message),
                ChannelTag::TableActions => self.on_actions(&message),
                tag => debug!(target: LOG_TARGET, %tag, "ignoring message on table room"),
            },
        }
    }
}

/// A player or observer at a table: a [`TableMirror`] kept current by the
/// host, with the derived [`TableView`] published on a `watch` channel.
pub struct PlayerTableSession {
    table_id: GameTableId,
    shared: Arc<PlayerTableShared>,
    pump: PumpHandle,
}

impl PlayerTableSession {
    #[instrument(skip(connector, registry, config, profile), fields(profile = %profile.id))]
    pub async fn open(
        connector: &dyn RoomConnector,
        registry: Arc<GameRegistry>,
        config: &SessionConfig,
        profile: PublicPlayerProfile,
        table_id: GameTableId,
        role: TableRole,
    ) -> Result<Self, SessionError> {
        let joined = connector
            .join(&config.table_room(&table_id), PeerId::random())
            .await?;
        let (views, _) = watch::channel(None);
        let shared = Arc::new(PlayerTableShared {
            registry,
            room: joined.room,
            announcement: ProfileAnnouncement::table(profile.clone(), role),
            state: parking_lot::Mutex::new(PlayerTableState {
                mirror: TableMirror::new(profile.id.clone(), table_id.clone()),
                profiles: PeerProfiles::new(profile),
            }),
            views,
        });
        let pump = PumpHandle::spawn(
            format!("player-table-{table_id}"),
            joined.events,
            shared.clone(),
        );
        debug!(target: LOG_TARGET, table_id = %table_id, ?role, "joined table");
        Ok(Self {
            table_id,
            shared,
            pump,
        })
    }

    pub fn table_id(&self) -> &GameTableId {
        &self.table_id
    }

    pub fn view(&self) -> Option<TableView> {
        self.shared.views.borrow().clone()
    }

    /// Changes whenever the derived view does.
    pub fn subscribe(&self) -> watch::Receiver<Option<TableView>> {
        self.shared.views.subscribe()
    }

    pub fn mirror(&self) -> TableMirror {
        self.shared.state.lock().mirror.clone()
    }

    /// Latest state decoded with the title's own encoder.
    pub fn latest_state<P: GameProcessor>(&self, processor: &P) -> Option<P::State> {
        self.shared.state.lock().mirror.latest_state(processor)
    }

    /// Sends an encoded action to the host. The outcome arrives as the next
    /// snapshot; rejected actions produce none.
    pub async fn submit_action(&self, action_str: impl Into<String>) -> Result<(), SessionError> {
        if self.pump.is_stopped() {
            return Err(SessionError::Closed);
        }
        let host_peer = {
            let state = self.shared.state.lock();
            let host_id = state
                .mirror
                .table()
                .map(|table| &table.game_host_player_profile_id);
            state.profiles.host_peer(host_id).cloned()
        };
        let submission = PlayerActionSubmission {
            action_str: action_str.into(),
        };
        send_json(
            self.shared.room.as_ref(),
            ChannelTag::TablePlayerMove,
            &submission,
            host_peer.as_ref(),
        )
        .await?;
        Ok(())
    }

    pub async fn leave(&self) -> Result<(), SessionError> {
        self.pump.stop().await;
        self.shared.room.leave().await?;
        debug!(target: LOG_TARGET, table_id = %self.table_id, "left table");
        Ok(())
    }
}
