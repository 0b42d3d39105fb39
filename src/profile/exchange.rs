use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ids::{PeerId, PlayerProfileId};

use super::types::PublicPlayerProfile;

const LOG_TARGET: &str = "p2p_tables::profile";

/// Role a peer announces when it joins a table room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableRole {
    Host,
    Player,
    Observer,
}

/// Payload pushed to the other side of a peer join.
///
/// Lobby rooms leave `role` unset; table rooms fill it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAnnouncement {
    pub profile: PublicPlayerProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<TableRole>,
}

impl ProfileAnnouncement {
    pub fn lobby(profile: PublicPlayerProfile) -> Self {
        Self {
            profile,
            role: None,
        }
    }

    pub fn table(profile: PublicPlayerProfile, role: TableRole) -> Self {
        Self {
            profile,
            role: Some(role),
        }
    }
}

/// Peer profiles known for the lifetime of one room session.
///
/// Entries are dropped as peers leave and nothing outlives the session.
#[derive(Debug, Clone)]
pub struct PeerProfiles {
    local: PublicPlayerProfile,
    peers: HashMap<PeerId, PublicPlayerProfile>,
    roles: HashMap<PeerId, TableRole>,
}

impl PeerProfiles {
    pub fn new(local: PublicPlayerProfile) -> Self {
        Self {
            local,
            peers: HashMap::new(),
            roles: HashMap::new(),
        }
    }

    pub fn local(&self) -> &PublicPlayerProfile {
        &self.local
    }

    pub fn on_profile_received(&mut self, peer: PeerId, announcement: ProfileAnnouncement) {
        if announcement.profile.id == self.local.id {
            warn!(
                target: LOG_TARGET,
                peer = %peer,
                profile_id = %announcement.profile.id,
                "peer announced the local profile id; ignoring"
            );
            return;
        }
        debug!(
            target: LOG_TARGET,
            peer = %peer,
            profile_id = %announcement.profile.id,
            role = ?announcement.role,
            "recorded peer profile"
        );
        match announcement.role {
            Some(role) => {
                self.roles.insert(peer.clone(), role);
            }
            None => {
                self.roles.remove(&peer);
            }
        }
        self.peers.insert(peer, announcement.profile);
    }

    pub fn on_peer_left(&mut self, peer: &PeerId) -> Option<PublicPlayerProfile> {
        self.roles.remove(peer);
        let removed = self.peers.remove(peer);
        if let Some(profile) = &removed {
            debug!(target: LOG_TARGET, peer = %peer, profile_id = %profile.id, "peer left");
        }
        removed
    }

    pub fn profile_for_peer(&self, peer: &PeerId) -> Option<&PublicPlayerProfile> {
        self.peers.get(peer)
    }

    pub fn role_of(&self, peer: &PeerId) -> Option<TableRole> {
        self.roles.get(peer).copied()
    }

    pub fn peer_for_profile(&self, profile_id: &PlayerProfileId) -> Option<&PeerId> {
        self.peers
            .iter()
            .find(|(_, profile)| &profile.id == profile_id)
            .map(|(peer, _)| peer)
    }

    /// Peer to route host-bound messages to. With a known host profile id,
    /// the peer carrying that profile; otherwise the single peer that
    /// announced itself as host. Several self-declared hosts resolve to none.
    pub fn host_peer(&self, host_id: Option<&PlayerProfileId>) -> Option<&PeerId> {
        if let Some(host_id) = host_id {
            return self.peer_for_profile(host_id);
        }
        let mut hosts = self
            .roles
            .iter()
            .filter(|(_, role)| **role == TableRole::Host)
            .map(|(peer, _)| peer);
        match (hosts.next(), hosts.next()) {
            (Some(peer), None) => Some(peer),
            _ => None,
        }
    }

    /// Every known profile keyed by profile id, the local one included.
    pub fn all_player_profiles(&self) -> HashMap<PlayerProfileId, PublicPlayerProfile> {
        let mut all: HashMap<_, _> = self
            .peers
            .values()
            .map(|profile| (profile.id.clone(), profile.clone()))
            .collect();
        all.insert(self.local.id.clone(), self.local.clone());
        all
    }
}
