use std::fmt;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::ids::PlayerProfileId;

const SECRET_KEY_LEN: usize = 32;

/// Public halves of a player's keys, hex encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeys {
    pub signing_key: String,
    pub encryption_key: String,
}

/// Secret key bytes. Wiped on drop and never serialized.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKeys {
    signing: Vec<u8>,
    encryption: Vec<u8>,
}

impl SecretKeys {
    pub fn new(signing: Vec<u8>, encryption: Vec<u8>) -> Self {
        Self {
            signing,
            encryption,
        }
    }

    pub fn signing(&self) -> &[u8] {
        &self.signing
    }

    pub fn encryption(&self) -> &[u8] {
        &self.encryption
    }
}

impl fmt::Debug for SecretKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKeys").finish_non_exhaustive()
    }
}

/// Key material handed over by the wallet when a profile is created.
#[derive(Clone, Debug)]
pub struct PlayerKeyMaterial {
    pub public: PublicKeys,
    pub secret: SecretKeys,
}

impl PlayerKeyMaterial {
    /// Random, unrelated public/secret bytes for local demos and tests. Real
    /// key pairs come from the wallet.
    pub fn ephemeral<R: RngCore>(rng: &mut R) -> Self {
        let mut draw = || {
            let mut bytes = vec![0u8; SECRET_KEY_LEN];
            rng.fill_bytes(&mut bytes);
            bytes
        };
        let signing_secret = draw();
        let encryption_secret = draw();
        let public = PublicKeys {
            signing_key: hex::encode(draw()),
            encryption_key: hex::encode(draw()),
        };
        Self {
            public,
            secret: SecretKeys::new(signing_secret, encryption_secret),
        }
    }
}

/// Profile record shared freely between peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayerProfile {
    pub id: PlayerProfileId,
    pub handle: String,
    pub public_keys: PublicKeys,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile owned by the local device. Holds secret keys, so it has no serde
/// impls and only leaves the device through [`PrivatePlayerProfile::to_public`].
#[derive(Clone, Debug)]
pub struct PrivatePlayerProfile {
    pub id: PlayerProfileId,
    pub handle: String,
    pub public_keys: PublicKeys,
    secret_keys: SecretKeys,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrivatePlayerProfile {
    pub fn new(handle: impl Into<String>, keys: PlayerKeyMaterial, now: DateTime<Utc>) -> Self {
        Self {
            id: PlayerProfileId::new(),
            handle: handle.into(),
            public_keys: keys.public,
            secret_keys: keys.secret,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn secret_keys(&self) -> &SecretKeys {
        &self.secret_keys
    }

    pub fn rename(&mut self, handle: impl Into<String>, now: DateTime<Utc>) {
        self.handle = handle.into();
        self.updated_at = now;
    }

    pub fn to_public(&self) -> PublicPlayerProfile {
        PublicPlayerProfile {
            id: self.id.clone(),
            handle: self.handle.clone(),
            public_keys: self.public_keys.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
