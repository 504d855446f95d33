//! # Client Errors

use thiserror::Error;

use tilespace_shared::{MetadataError, TokenError};

/// Errors surfaced by the client engine
#[derive(Debug, Error)]
pub enum ClientError {
    /// Unrecoverable misconfiguration; raised at startup
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("room metadata rejected: {0}")]
    Metadata(#[from] MetadataError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),

    #[error("not connected to a room")]
    NotConnected,
}

/// Token acquisition failures
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token service answered with an error message
    #[error("token request rejected: {0}")]
    Rejected(String),

    #[error("token has expired")]
    Expired,

    #[error("token request failed: {0}")]
    Request(String),

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),
}
