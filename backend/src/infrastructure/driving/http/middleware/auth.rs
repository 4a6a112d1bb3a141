use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::{debug, info};

use crate::application::auth::AuthError;
use crate::domain::entities::User;
use crate::infrastructure::AppState;

/// The capabilities of whoever sent the request. Rejects with the
/// authenticator's own response (challenge, redirect or 403).
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match state.authenticator.authenticate(parts) {
            Ok(user) => Ok(Self(user)),
            Err(e @ (AuthError::NoCredentials { .. } | AuthError::MustLogin { .. })) => {
                debug!("[auth] {} {}: {e}", parts.method, parts.uri.path());
                Err(e)
            }
            Err(e) => {
                info!("[auth] rejected {} {}: {e}", parts.method, parts.uri.path());
                Err(e)
            }
        }
    }
}
