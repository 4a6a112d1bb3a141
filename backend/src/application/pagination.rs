use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::{OpaqueCodec, OpaqueError};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("cursor could not be opened: {0}")]
    Opaque(#[from] OpaqueError),

    #[error("cursor does not point into {expected}")]
    WrongResource { expected: String },
}

impl IntoResponse for CursorError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, "invalid next cursor".to_string()).into_response()
    }
}

/// Turns upstream continuation URIs into opaque `next` query values and
/// back.
///
/// The upstream URI is path-only and sealed, so clients can neither read the
/// page token nor point the server at another endpoint.
#[derive(Clone)]
pub struct CursorCodec {
    codec: Arc<OpaqueCodec>,
}

impl CursorCodec {
    pub fn new(codec: Arc<OpaqueCodec>) -> Self {
        Self { codec }
    }

    pub fn encode(&self, next_page_uri: &str) -> Result<String, CursorError> {
        Ok(self.codec.seal_str(next_page_uri)?)
    }

    /// Opens `cursor` and checks the URI is a page of `expected_path`: the
    /// path must match exactly, optionally followed by a query string.
    pub fn decode(&self, cursor: &str, expected_path: &str) -> Result<String, CursorError> {
        let uri = self.codec.open_str(cursor)?;
        match uri.strip_prefix(expected_path) {
            Some(rest) if rest.is_empty() || rest.starts_with('?') => Ok(uri),
            _ => Err(CursorError::WrongResource {
                expected: expected_path.to_string(),
            }),
        }
    }
}
