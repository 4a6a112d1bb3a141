use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use super::middleware::RequestDeadline;
use crate::application::auth::AuthError;
use crate::application::ports::ProviderError;
use crate::infrastructure::AppState;

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    /// Set by the provider when the user declines consent.
    pub error: Option<String>,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", get(logout).post(logout))
}

async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, AuthError> {
    let next = query.next.as_deref().unwrap_or("/");
    let target = state.authenticator.login_redirect(next)?;
    Ok(Redirect::to(&target))
}

async fn callback(
    State(state): State<AppState>,
    RequestDeadline(deadline): RequestDeadline,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(CookieJar, Redirect), AuthError> {
    if let Some(error) = query.error {
        warn!("[auth] provider refused the login: {error}");
        return Err(ProviderError::Exchange(format!("provider returned {error}")).into());
    }
    let (jar, next) = state
        .authenticator
        .callback(query.state.as_deref(), query.code.as_deref(), &deadline, jar)
        .await
        .map_err(|e| {
            warn!("[auth] login callback failed: {e}");
            e
        })?;
    info!("[auth] login complete, continuing to {next}");
    Ok((jar, Redirect::to(&next)))
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    (state.authenticator.logout(jar), Redirect::to("/"))
}
