//! Player profiles and the per-room profile exchange.

mod exchange;
mod types;

pub use exchange::{PeerProfiles, ProfileAnnouncement, TableRole};
pub use types::{
    PlayerKeyMaterial, PrivatePlayerProfile, PublicKeys, PublicPlayerProfile, SecretKeys,
};
