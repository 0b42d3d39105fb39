//! Opaque string encodings for per-title payloads.
//!
//! The action log and the synchronizers only ever see [`EncodedString`]s. Each
//! title picks one of the strategies below for its state and action types; the
//! log never depends on the payload's shape.

mod error;
mod strategies;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use error::{DecodeError, EncodeError, ValidationError};
pub use strategies::{CustomStringEncoder, RawStringEncoder, SchemaEncoder, UntypedObjectEncoder};

const LOG_TARGET: &str = "p2p_tables::encoding";

/// Output of an [`Encoder`]. Carried verbatim through the log and the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedString(String);

impl EncodedString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EncodedString> for String {
    fn from(value: EncodedString) -> Self {
        value.0
    }
}

/// Structural check run on decode (and on encode, for symmetry).
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

pub trait Encoder<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<EncodedString, EncodeError>;

    fn decode(&self, encoded: &str) -> Result<T, DecodeError>;

    /// Decode, logging and discarding any failure.
    fn decode_or_log(&self, encoded: &str) -> Option<T> {
        match self.decode(encoded) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(target: LOG_TARGET, %error, len = encoded.len(), "dropping undecodable payload");
                None
            }
        }
    }
}
