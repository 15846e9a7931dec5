use std::sync::{Arc, RwLock};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

use shared_api::ApiError;
use shared_models::auth::JwtClaims;

/// Holder of the caller's bearer token.
///
/// Every authenticated request reads the token from here; nothing else stores it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::default();
        session.set_token(token);
        session
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut guard = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = if token.trim().is_empty() { None } else { Some(token) };
    }

    pub fn clear_token(&self) {
        let mut guard = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.take().is_some() {
            info!("Session token cleared");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Unverified claims of the current token.
    pub fn claims(&self) -> Option<JwtClaims> {
        let token = self.token()?;
        decode_claims(&token)
    }

    /// A token without a readable `exp` is left for the API to judge.
    pub fn is_expired(&self, now: DateTime<FixedOffset>) -> bool {
        match self.claims().and_then(|c| c.exp) {
            Some(exp) => exp <= now.timestamp(),
            None => false,
        }
    }

    /// Token usable for an authenticated call at `now`.
    pub fn valid_token(&self, now: DateTime<FixedOffset>) -> Option<String> {
        if self.is_expired(now) {
            debug!("Session token expired");
            self.clear_token();
            return None;
        }
        self.token()
    }

    /// Clears the token when the API refused it, passing the result through.
    pub fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(err) = &result {
            if err.is_unauthorized() {
                self.clear_token();
            }
        }
        result
    }
}

fn decode_claims(token: &str) -> Option<JwtClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}
