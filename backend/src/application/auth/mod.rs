//! Request authentication.
//!
//! One [`Authenticator`] is chosen at startup. Every failure is an
//! [`AuthError`] that already knows the response it should produce (a 401
//! challenge, a 403, or a redirect), so handlers return it and stop.

use std::sync::{Arc, Mutex, PoisonError};

use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use thiserror::Error;
use tracing::debug;

use super::deadline::Deadline;
use super::ports::ProviderError;
use crate::domain::entities::{Policy, User};

pub mod basic;
pub mod google;
pub mod noop;

pub use basic::BasicAuthenticator;
pub use google::GoogleAuthenticator;
pub use noop::NoopAuthenticator;

/// Name of the session cookie set by the OAuth flow.
pub const SESSION_COOKIE: &str = "token";

/// Fatal authenticator misconfiguration, found at startup or reload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthSetupError {
    #[error("basic auth is enabled but no users are configured")]
    NoBasicUsers,

    #[error("basic auth user with an empty name")]
    EmptyUsername,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credentials supplied")]
    NoCredentials { realm: String },

    #[error("invalid username or password for {username:?}")]
    InvalidCredentials { username: String },

    #[error("login required to reach {next}")]
    MustLogin { next: String },

    #[error("session of {id} is no longer permitted, logging out")]
    ForceLogout { id: String },

    #[error("invalid login state: {0}")]
    InvalidState(String),

    #[error("login state expired")]
    StateExpired,

    #[error("login callback is missing the {0} parameter")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("email {0} is not verified")]
    EmailNotVerified(String),

    #[error("email {0} is not in an allowed domain")]
    DomainNotAllowed(String),

    #[error("{id} is not a member of any policy group")]
    NotInPolicy { id: String },

    #[error("the {0} scheme has no login callback")]
    CallbackUnsupported(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::NoCredentials { realm } => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, format!("Basic realm=\"{realm}\""))],
                "authentication required",
            )
                .into_response(),
            AuthError::MustLogin { next } => Redirect::to(&login_path(next)).into_response(),
            AuthError::ForceLogout { .. } => {
                (clear_session(CookieJar::new()), Redirect::to("/")).into_response()
            }
            AuthError::MissingParameter(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            AuthError::CallbackUnsupported(_) => StatusCode::NOT_FOUND.into_response(),
            AuthError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()).into_response()
            }
            _ => (StatusCode::FORBIDDEN, "forbidden".to_string()).into_response(),
        }
    }
}

/// The authentication scheme, selected once from configuration.
pub enum Authenticator {
    Noop(NoopAuthenticator),
    Basic(BasicAuthenticator),
    Google(GoogleAuthenticator),
}

impl Authenticator {
    pub fn scheme(&self) -> &'static str {
        match self {
            Authenticator::Noop(_) => "noop",
            Authenticator::Basic(_) => "basic",
            Authenticator::Google(_) => "google",
        }
    }

    /// Resolves the request's identity to a [`User`]. Writes nothing on
    /// success; on failure the returned error is the response.
    pub fn authenticate(&self, parts: &Parts) -> Result<User, AuthError> {
        match self {
            Authenticator::Noop(a) => Ok(a.authenticate()),
            Authenticator::Basic(a) => a.authenticate(&parts.headers),
            Authenticator::Google(a) => {
                let jar = CookieJar::from_headers(&parts.headers);
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|p| p.as_str())
                    .unwrap_or("/");
                a.authenticate(&jar, next)
            }
        }
    }

    /// Where `/auth/login` sends the browser.
    pub fn login_redirect(&self, next: &str) -> Result<String, AuthError> {
        match self {
            Authenticator::Google(a) => a.login_url(next),
            _ => Ok(local_path(next).to_string()),
        }
    }

    /// Completes an external login; returns the jar holding the new session
    /// and the local path to send the browser to.
    pub async fn callback(
        &self,
        state: Option<&str>,
        code: Option<&str>,
        deadline: &Deadline,
        jar: CookieJar,
    ) -> Result<(CookieJar, String), AuthError> {
        match self {
            Authenticator::Google(a) => {
                let state = state.ok_or(AuthError::MissingParameter("state"))?;
                let code = code.ok_or(AuthError::MissingParameter("code"))?;
                a.callback(state, code, deadline, jar).await
            }
            other => Err(AuthError::CallbackUnsupported(other.scheme())),
        }
    }

    /// Clears session state. Schemes without sessions return the jar as is.
    pub fn logout(&self, jar: CookieJar) -> CookieJar {
        match self {
            Authenticator::Google(_) => clear_session(jar),
            _ => jar,
        }
    }

    /// Swaps the policy used for subsequent requests.
    pub fn set_policy(&self, policy: Option<Policy>) {
        match self {
            Authenticator::Noop(_) => debug!("[auth] noop scheme ignores policy updates"),
            Authenticator::Basic(a) => a.set_policy(policy),
            Authenticator::Google(a) => a.set_policy(policy),
        }
    }
}

/// Mutex-guarded policy reference owned by one authenticator.
///
/// Readers clone the `Arc` out under the lock and work on their copy, so a
/// concurrent swap is seen entirely or not at all.
#[derive(Debug)]
pub(crate) struct PolicySlot(Mutex<Option<Arc<Policy>>>);

impl PolicySlot {
    pub(crate) fn new(policy: Option<Policy>) -> Self {
        Self(Mutex::new(policy.map(Arc::new)))
    }

    pub(crate) fn set(&self, policy: Option<Policy>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = policy.map(Arc::new);
    }

    pub(crate) fn current(&self) -> Option<Arc<Policy>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Maps an authenticated identity to its capabilities. Without a policy,
    /// or with an empty one, everyone is unrestricted.
    pub(crate) fn resolve(&self, id: &str) -> Result<User, AuthError> {
        let Some(policy) = self.current().filter(|p| !p.is_empty()) else {
            return Ok(User::unrestricted());
        };
        match policy.lookup(id) {
            Ok((user, exact)) => {
                if !exact {
                    debug!("[auth] {id} resolved through the default group");
                }
                Ok(user)
            }
            Err(e) => {
                debug!("[auth] policy lookup failed: {e}");
                Err(AuthError::NotInPolicy { id: id.to_string() })
            }
        }
    }
}

/// Keeps redirects on this host: anything but an absolute local path
/// becomes `/`.
pub(crate) fn local_path(candidate: &str) -> &str {
    let local = candidate.starts_with('/')
        && !candidate.starts_with("//")
        && !candidate.starts_with("/\\");
    if local {
        candidate
    } else {
        "/"
    }
}

fn login_path(next: &str) -> String {
    let next: String = url::form_urlencoded::byte_serialize(local_path(next).as_bytes()).collect();
    format!("/auth/login?next={next}")
}

pub(crate) fn clear_session(jar: CookieJar) -> CookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .max_age(time::Duration::seconds(-1)),
    )
}
