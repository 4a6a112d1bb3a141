use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::OpaqueCodec;
use tracing::{debug, info, warn};

use super::{local_path, AuthError, PolicySlot, SESSION_COOKIE};
use crate::application::deadline::Deadline;
use crate::application::ports::{IdentityProvider, ProviderError};
use crate::domain::entities::{Policy, User};
use crate::domain::value_objects::Email;

/// Authorization links older than this are refused at the callback.
pub const STATE_TIMEOUT_SECS: i64 = 60 * 60;

pub const SESSION_LENGTH_DAYS: i64 = 14;

/// Upper bound for each provider round trip during the callback.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sealed into the `token` cookie.
#[derive(Debug, Serialize, Deserialize)]
struct SessionToken {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Expiry")]
    expiry: DateTime<Utc>,
}

/// Sealed into the OAuth `state` parameter.
#[derive(Debug, Serialize, Deserialize)]
struct LoginState {
    #[serde(rename = "CurrentURL")]
    current_url: String,
    #[serde(rename = "Time")]
    time: DateTime<Utc>,
}

/// Google OAuth2 login with a sealed session cookie.
pub struct GoogleAuthenticator {
    provider: Arc<dyn IdentityProvider>,
    codec: Arc<OpaqueCodec>,
    allowed_domains: Vec<String>,
    secure_cookie: bool,
    policy: PolicySlot,
}

impl GoogleAuthenticator {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        codec: Arc<OpaqueCodec>,
        allowed_domains: Vec<String>,
        allow_unencrypted_traffic: bool,
        policy: Option<Policy>,
    ) -> Self {
        Self {
            provider,
            codec,
            allowed_domains,
            secure_cookie: !allow_unencrypted_traffic,
            policy: PolicySlot::new(policy),
        }
    }

    pub fn set_policy(&self, policy: Option<Policy>) {
        self.policy.set(policy);
    }

    /// The provider's authorization URL, with `current_path` and the time
    /// sealed into `state`.
    pub fn login_url(&self, current_path: &str) -> Result<String, AuthError> {
        let state = LoginState {
            current_url: local_path(current_path).to_string(),
            time: Utc::now(),
        };
        let json = serde_json::to_vec(&state).map_err(|e| AuthError::Internal(e.to_string()))?;
        let sealed = self
            .codec
            .seal(&json)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(self.provider.authorization_url(&sealed))
    }

    pub fn authenticate(&self, jar: &CookieJar, requested: &str) -> Result<User, AuthError> {
        let must_login = || AuthError::MustLogin {
            next: requested.to_string(),
        };
        let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) else {
            return Err(must_login());
        };
        let token: SessionToken = match self
            .codec
            .open(cookie.value())
            .ok()
            .and_then(|plain| serde_json::from_slice(&plain).ok())
        {
            Some(token) => token,
            None => {
                debug!("[auth] discarding unreadable session cookie");
                return Err(must_login());
            }
        };
        if Utc::now() > token.expiry {
            debug!("[auth] session of {} expired at {}", token.id, token.expiry);
            return Err(must_login());
        }

        let permitted = Email::new(token.id.clone())
            .map(|email| email.in_domains(&self.allowed_domains))
            .unwrap_or(false);
        if !permitted {
            return Err(AuthError::ForceLogout { id: token.id });
        }
        // Re-resolved every request so policy changes apply to live sessions.
        self.policy.resolve(&token.id)
    }

    /// Handles the provider's redirect back to us. Nothing is written to the
    /// jar unless every step succeeds.
    pub async fn callback(
        &self,
        state: &str,
        code: &str,
        deadline: &Deadline,
        jar: CookieJar,
    ) -> Result<(CookieJar, String), AuthError> {
        let state = self.open_state(state)?;

        let access_token = tokio::time::timeout(
            deadline.budget(EXCHANGE_TIMEOUT),
            self.provider.exchange_code(code),
        )
        .await
        .map_err(|_| ProviderError::Timeout)??;
        let identity = tokio::time::timeout(
            deadline.budget(EXCHANGE_TIMEOUT),
            self.provider.fetch_identity(&access_token),
        )
        .await
        .map_err(|_| ProviderError::Timeout)??;

        if !identity.verified {
            return Err(AuthError::EmailNotVerified(identity.email));
        }
        let email = Email::new(identity.email.clone())
            .map_err(|_| AuthError::DomainNotAllowed(identity.email))?;
        if !email.in_domains(&self.allowed_domains) {
            warn!("[auth] rejected login from {email}: domain not allowed");
            return Err(AuthError::DomainNotAllowed(email.to_string()));
        }
        self.policy.resolve(email.as_str())?;

        let expiry = Utc::now() + chrono::Duration::days(SESSION_LENGTH_DAYS);
        let token = SessionToken {
            id: email.to_string(),
            expiry,
        };
        let json = serde_json::to_vec(&token).map_err(|e| AuthError::Internal(e.to_string()))?;
        let sealed = self
            .codec
            .seal(&json)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let expires = time::OffsetDateTime::from_unix_timestamp(expiry.timestamp())
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let cookie = Cookie::build((SESSION_COOKIE, sealed))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .expires(expires);

        info!("[auth] {email} logged in");
        Ok((jar.add(cookie), local_path(&state.current_url).to_string()))
    }

    fn open_state(&self, sealed: &str) -> Result<LoginState, AuthError> {
        let plain = self
            .codec
            .open(sealed)
            .map_err(|e| AuthError::InvalidState(e.to_string()))?;
        let state: LoginState =
            serde_json::from_slice(&plain).map_err(|e| AuthError::InvalidState(e.to_string()))?;
        if Utc::now().signed_duration_since(state.time) > chrono::Duration::seconds(STATE_TIMEOUT_SECS) {
            return Err(AuthError::StateExpired);
        }
        Ok(state)
    }
}
