// Driven port - OAuth2 identity provider (output port)

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub verified: bool,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("code exchange failed: {0}")]
    Exchange(String),

    #[error("identity lookup failed: {0}")]
    Identity(String),

    #[error("identity provider timed out")]
    Timeout,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization endpoint URL carrying `state` as the CSRF parameter.
    fn authorization_url(&self, state: &str) -> String;

    /// Trades an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError>;

    async fn fetch_identity(&self, access_token: &str) -> Result<Identity, ProviderError>;
}
