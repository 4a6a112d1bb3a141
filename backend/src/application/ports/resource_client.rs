// Driven port - Upstream log API (output port)

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream request failed: {0}")]
    Transport(String),
}

impl UpstreamError {
    /// HTTP status reported by the upstream, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Fetches raw JSON bodies from the upstream API.
///
/// `path_and_query` is always path-only (`/2010-04-01/...` or `/v1/...`);
/// the implementation owns hosts and credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(&self, path_and_query: &str) -> Result<Vec<u8>, UpstreamError>;
}
