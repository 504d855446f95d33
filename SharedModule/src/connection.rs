//! # Connection Types
//!
//! Request and response bodies of the token and participant endpoints, and
//! the claims carried by a room access token.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::player::CharacterName;

/// Body posted to the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub room: String,
    pub user: String,
    pub character: CharacterName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Successful token endpoint response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    pub token: String,
    pub ws_url: String,
}

/// Token endpoint response: details or an error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenResponse {
    Details(ConnectionDetails),
    Error { error: String },
}

/// Room permissions granted by a token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoGrant {
    pub room_list: bool,
    pub room_join: bool,
    /// Allows saving room metadata
    pub room_admin: bool,
    pub can_update_own_metadata: bool,
    pub room: Option<String>,
}

/// Claims of a room access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Participant identity
    pub sub: String,

    /// Expiry (unix seconds)
    pub exp: u64,

    #[serde(default)]
    pub iat: Option<u64>,

    #[serde(default)]
    pub iss: Option<String>,

    #[serde(default)]
    pub video: VideoGrant,

    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

impl TokenClaims {
    /// Read the claims of a JWT without verifying its signature; the media
    /// server is the party that verifies.
    pub fn from_jwt(token: &str) -> Result<Self, TokenError> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return Err(TokenError::Malformed),
        };
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Whether the token is still usable at `now`, keeping `margin_secs` spare.
    pub fn is_fresh(&self, now: u64, margin_secs: u64) -> bool {
        self.exp > now.saturating_add(margin_secs)
    }
}

/// Summary returned by the participant listing endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomParticipantsInfo {
    pub num_participants: u32,
    /// Whether listing is allowed without a password
    pub list: bool,
    /// Whether joining is allowed without a password
    pub join: bool,
    /// Whether admin rights are available without a password
    pub admin: bool,
}

impl RoomParticipantsInfo {
    /// 0: open, 1: admin password needed for editing, 2: password protected
    pub fn security_level(&self) -> u8 {
        if !self.list {
            2
        } else if !self.admin {
            1
        } else {
            0
        }
    }
}

/// Unsigned token carrying `claims`, for tests of token consumers.
#[cfg(any(test, feature = "test-util"))]
pub fn unsigned_jwt(claims: &serde_json::Value) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.{}",
        engine.encode(br#"{"typ":"JWT","alg":"HS256"}"#),
        engine.encode(claims.to_string()),
        engine.encode(b"signature")
    )
}
