//! # Error Types
//!
//! Errors raised while decoding remote data: room metadata, data-channel
//! packets and access tokens.

use thiserror::Error;

/// Room metadata could not be decoded; prior state must be kept.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid metadata JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("metadata root is not a JSON object")]
    NotAnObject,

    #[error("invalid entry {index} under key `{key}`: {reason}")]
    InvalidField {
        key: String,
        index: usize,
        reason: String,
    },
}

impl MetadataError {
    pub(crate) fn field(key: &str, index: usize, reason: impl Into<String>) -> Self {
        MetadataError::InvalidField {
            key: key.to_string(),
            index,
            reason: reason.into(),
        }
    }
}

/// A data-channel packet could not be decoded.
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("packet is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid packet JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// An access token could not be read.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token does not have three segments")]
    Malformed,

    #[error("token payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
