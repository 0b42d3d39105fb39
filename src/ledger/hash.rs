use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ids::GameTableId;

use super::types::DbGameTableAction;

const DOMAIN_INITIAL: &[u8] = b"p2p-tables/log/init/v1";
const DOMAIN_ENTRY: &[u8] = b"p2p-tables/log/entry/v1";
const DOMAIN_CHAIN: &[u8] = b"p2p-tables/log/chain/v1";

/// Digest of a table's action history. Two peers holding the same log agree
/// on this value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateHash(#[serde(with = "hex_bytes")] [u8; 32]);

impl StateHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for StateHash {
    fn from(bytes: [u8; 32]) -> Self {
        StateHash::new(bytes)
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateHash({self})")
    }
}

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&raw, &mut bytes).map_err(de::Error::custom)?;
        Ok(bytes)
    }
}

fn finalize_hash(hasher: Sha256) -> StateHash {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    StateHash::from(bytes)
}

fn write_len(hasher: &mut Sha256, len: usize) {
    let len_u32 = u32::try_from(len).unwrap_or(u32::MAX);
    hasher.update(len_u32.to_be_bytes());
}

fn write_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    write_len(hasher, bytes.len());
    hasher.update(bytes);
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_bytes(hasher, value.as_bytes());
}

/// Hash of an empty log for `table_id`.
pub fn initial_hash(table_id: &GameTableId) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_INITIAL);
    write_str(&mut hasher, table_id.as_str());
    finalize_hash(hasher)
}

pub fn hash_entry(entry: &DbGameTableAction) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_ENTRY);
    write_str(&mut hasher, entry.id.as_str());
    write_str(&mut hasher, entry.game_table_id.as_str());
    hasher.update(entry.created_at.timestamp_micros().to_be_bytes());
    write_str(&mut hasher, &entry.source.to_string());
    write_str(&mut hasher, entry.action_type.as_str());
    write_str(&mut hasher, entry.action_str.as_str());
    write_str(&mut hasher, entry.next_game_state_str.as_str());
    finalize_hash(hasher)
}

pub fn chain_hash(previous: &StateHash, entry_hash: &StateHash) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_CHAIN);
    hasher.update(previous.as_bytes());
    hasher.update(entry_hash.as_bytes());
    finalize_hash(hasher)
}

/// Folds every entry into the chain, starting from [`initial_hash`].
pub fn hash_log<'a>(
    table_id: &GameTableId,
    entries: impl IntoIterator<Item = &'a DbGameTableAction>,
) -> StateHash {
    entries
        .into_iter()
        .fold(initial_hash(table_id), |acc, entry| {
            chain_hash(&acc, &hash_entry(entry))
        })
}
