//! # Authentication
//!
//! Room access tokens, cached per room for the session and reused until they
//! get close to expiry.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tilespace_shared::{ConnectionDetails, TokenClaims, TokenRequest, TokenResponse};

use crate::error::AuthError;

/// Issues room access tokens
pub trait TokenService {
    fn request_token(&self, request: &TokenRequest) -> Result<TokenResponse, AuthError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    details: ConnectionDetails,
    claims: TokenClaims,
}

/// Session-scoped token cache keyed by room name
#[derive(Debug, Clone)]
pub struct TokenCache {
    /// Tokens expiring within this many seconds are refreshed
    margin_secs: u64,
    tokens: HashMap<String, CachedToken>,
}

impl TokenCache {
    pub fn new(margin_secs: u64) -> Self {
        Self {
            margin_secs,
            tokens: HashMap::new(),
        }
    }

    /// Connection details for `request.room`, from the cache when the cached
    /// token is still fresh at `now`, otherwise from `service`.
    ///
    /// Any failure drops the cached entry for that room, so the next call
    /// asks the service again.
    pub fn connection(
        &mut self,
        service: &dyn TokenService,
        request: &TokenRequest,
        now: u64,
    ) -> Result<(ConnectionDetails, TokenClaims), AuthError> {
        if let Some(cached) = self.tokens.get(&request.room) {
            if cached.claims.is_fresh(now, self.margin_secs) {
                debug!("Reusing cached token for room {}", request.room);
                return Ok((cached.details.clone(), cached.claims.clone()));
            }
        }

        match self.fetch(service, request, now) {
            Ok(token) => {
                info!("Obtained token for room {} (expires at {})", request.room, token.claims.exp);
                let result = (token.details.clone(), token.claims.clone());
                self.tokens.insert(request.room.clone(), token);
                Ok(result)
            }
            Err(e) => {
                warn!("Token request for room {} failed: {}", request.room, e);
                self.invalidate(&request.room);
                Err(e)
            }
        }
    }

    fn fetch(&self, service: &dyn TokenService, request: &TokenRequest, now: u64) -> Result<CachedToken, AuthError> {
        let details = match service.request_token(request)? {
            TokenResponse::Details(details) => details,
            TokenResponse::Error { error } => return Err(AuthError::Rejected(error)),
        };
        let claims = TokenClaims::from_jwt(&details.token)?;
        if !claims.is_fresh(now, 0) {
            return Err(AuthError::Expired);
        }
        Ok(CachedToken { details, claims })
    }

    /// Claims of the cached token for `room`, fresh or not.
    pub fn claims(&self, room: &str) -> Option<&TokenClaims> {
        self.tokens.get(room).map(|t| &t.claims)
    }

    pub fn invalidate(&mut self, room: &str) {
        if self.tokens.remove(room).is_some() {
            debug!("Dropped cached token for room {}", room);
        }
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Current unix time in milliseconds.
pub fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use tilespace_shared::connection::unsigned_jwt;

    pub fn details(sub: &str, exp: u64, admin: bool) -> TokenResponse {
        TokenResponse::Details(ConnectionDetails {
            token: unsigned_jwt(&serde_json::json!({"sub": sub, "exp": exp, "video": {"roomJoin": true, "roomAdmin": admin}})),
            ws_url: "wss://media.example.org".into(),
        })
    }

    /// Answers requests from a scripted queue and counts calls
    #[derive(Default)]
    pub struct ScriptedTokenService {
        pub responses: RefCell<VecDeque<Result<TokenResponse, AuthError>>>,
        pub calls: RefCell<usize>,
    }

    impl ScriptedTokenService {
        pub fn push(&self, response: Result<TokenResponse, AuthError>) {
            self.responses.borrow_mut().push_back(response);
        }
    }

    impl TokenService for ScriptedTokenService {
        fn request_token(&self, _request: &TokenRequest) -> Result<TokenResponse, AuthError> {
            *self.calls.borrow_mut() += 1;
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(AuthError::Request("no scripted response".into())))
        }
    }
}
