use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::application::deadline::Deadline;
use crate::infrastructure::AppState;

/// Stamps each request with the instant its budget runs out.
pub async fn set_deadline(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    req.extensions_mut()
        .insert(Deadline::after(state.request_timeout));
    next.run(req).await
}

/// The deadline set by [`set_deadline`], or none on routes without it.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline(pub Deadline);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestDeadline {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<Deadline>()
                .copied()
                .unwrap_or_else(Deadline::none),
        ))
    }
}
