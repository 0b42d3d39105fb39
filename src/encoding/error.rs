use thiserror::Error;

/// Structural violation reported by a [`super::Validate`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not well-formed: {0}")]
    Malformed(String),
    #[error("payload failed validation: {0}")]
    Validation(#[from] ValidationError),
    #[error("payload rejected: {0}")]
    Rejected(String),
}

impl DecodeError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("value failed validation before encoding: {0}")]
    Validation(#[from] ValidationError),
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("value cannot be encoded: {0}")]
    Unsupported(String),
}
