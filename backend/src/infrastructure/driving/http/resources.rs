use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::middleware::{AuthenticatedUser, RequestDeadline};
use crate::application::viewer::{Listing, ViewerError};
use crate::domain::views::{to_json, View};
use crate::infrastructure::AppState;

#[derive(Deserialize)]
pub struct PageQuery {
    /// Opaque cursor from a previous listing.
    pub next: Option<String>,
}

pub fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/messages", get(list_messages))
        .route("/api/messages/:sid", get(get_message))
        .route("/api/calls", get(list_calls))
        .route("/api/calls/:sid", get(get_call))
        .route("/api/calls/:sid/recordings", get(list_call_recordings))
        .route("/api/conferences", get(list_conferences))
        .route("/api/conferences/:sid", get(get_conference))
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/:sid", get(get_alert))
        .route("/api/phone-numbers", get(list_phone_numbers))
}

fn listing_json<V: View + 'static>(listing: Listing<V>) -> Result<Json<Value>, ViewerError> {
    let items = listing
        .page
        .items()
        .iter()
        .map(to_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(json!({ "items": items, "next": listing.next })))
}

fn record_json<V: View + 'static>(view: V) -> Result<Json<Value>, ViewerError> {
    Ok(Json(to_json(&view)?))
}

async fn me(State(state): State<AppState>, AuthenticatedUser(user): AuthenticatedUser) -> Json<Value> {
    Json(json!({
        "scheme": state.authenticator.scheme(),
        "capabilities": user.capabilities(),
        "max_resource_age_secs": state.viewer.permission().max_resource_age().num_seconds(),
    }))
}

async fn list_messages(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ViewerError> {
    let listing = state.viewer.messages(query.next.as_deref(), &user, &deadline).await?;
    listing_json(listing)
}

async fn get_message(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Path(sid): Path<String>,
) -> Result<Json<Value>, ViewerError> {
    record_json(state.viewer.message(&sid, &user, &deadline).await?)
}

async fn list_calls(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ViewerError> {
    let listing = state.viewer.calls(query.next.as_deref(), &user, &deadline).await?;
    listing_json(listing)
}

async fn get_call(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Path(sid): Path<String>,
) -> Result<Json<Value>, ViewerError> {
    record_json(state.viewer.call(&sid, &user, &deadline).await?)
}

async fn list_call_recordings(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Path(sid): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ViewerError> {
    let listing = state
        .viewer
        .call_recordings(&sid, query.next.as_deref(), &user, &deadline)
        .await?;
    listing_json(listing)
}

async fn list_conferences(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ViewerError> {
    let listing = state.viewer.conferences(query.next.as_deref(), &user, &deadline).await?;
    listing_json(listing)
}

async fn get_conference(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Path(sid): Path<String>,
) -> Result<Json<Value>, ViewerError> {
    record_json(state.viewer.conference(&sid, &user, &deadline).await?)
}

async fn list_alerts(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ViewerError> {
    let listing = state.viewer.alerts(query.next.as_deref(), &user, &deadline).await?;
    listing_json(listing)
}

async fn get_alert(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Path(sid): Path<String>,
) -> Result<Json<Value>, ViewerError> {
    record_json(state.viewer.alert(&sid, &user, &deadline).await?)
}

async fn list_phone_numbers(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RequestDeadline(deadline): RequestDeadline,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ViewerError> {
    let listing = state.viewer.phone_numbers(query.next.as_deref(), &user, &deadline).await?;
    listing_json(listing)
}
