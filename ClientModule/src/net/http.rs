//! HTTP clients for the token and participant listing endpoints.

use log::{debug, warn};

use tilespace_shared::{RoomParticipantsInfo, TokenRequest, TokenResponse};

use crate::auth::TokenService;
use crate::error::AuthError;

/// Token service reached with an HTTP POST of the JSON request body
#[derive(Debug, Clone)]
pub struct HttpTokenService {
    url: String,
}

impl HttpTokenService {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl TokenService for HttpTokenService {
    fn request_token(&self, request: &TokenRequest) -> Result<TokenResponse, AuthError> {
        debug!("Requesting token for {} in room {}", request.user, request.room);
        let response = ureq::post(&self.url)
            .set("Content-Type", "application/json")
            .send_json(request);

        match response {
            Ok(response) => response
                .into_json::<TokenResponse>()
                .map_err(|e| AuthError::Request(format!("Failed to parse token response: {}", e))),
            // Refusals come back as an error status carrying `{error}`
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                match serde_json::from_str::<TokenResponse>(&body) {
                    Ok(TokenResponse::Error { error }) => Err(AuthError::Rejected(error)),
                    _ => Err(AuthError::Request(format!("HTTP {}: {}", code, body))),
                }
            }
            Err(other) => Err(AuthError::Request(other.to_string())),
        }
    }
}

/// Room participant summary lookup
pub trait ParticipantsService {
    fn participants(&self, room: &str) -> Result<RoomParticipantsInfo, String>;
}

/// Participant listing reached with an HTTP GET `?room=<name>`
#[derive(Debug, Clone)]
pub struct HttpParticipantsService {
    url: String,
}

impl HttpParticipantsService {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl ParticipantsService for HttpParticipantsService {
    fn participants(&self, room: &str) -> Result<RoomParticipantsInfo, String> {
        let response = ureq::get(&self.url)
            .query("room", room)
            .call()
            .map_err(|e| format!("Failed to fetch participants: {}", e))?;
        response
            .into_json::<RoomParticipantsInfo>()
            .map_err(|e| format!("Failed to parse participants: {}", e))
    }
}

/// Participant summary for gating the UI; a failed lookup yields the default.
pub fn room_info(service: &dyn ParticipantsService, room: &str) -> RoomParticipantsInfo {
    match service.participants(room) {
        Ok(info) => info,
        Err(e) => {
            warn!("{}", e);
            RoomParticipantsInfo::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    impl ParticipantsService for Offline {
        fn participants(&self, _room: &str) -> Result<RoomParticipantsInfo, String> {
            Err("connection refused".into())
        }
    }

    #[test]
    fn failed_lookup_falls_back_to_default() {
        let info = room_info(&Offline, "Dark");
        assert_eq!(info, RoomParticipantsInfo::default());
        assert_eq!(info.security_level(), 2);
    }
}
