use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::{ResourceClient, UpstreamError};
use crate::infrastructure::config::TwilioSettings;

/// Error body of both the 2010 REST API and the v1 monitor API.
#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Read-only client for the Twilio REST APIs, authenticated with the
/// account SID and auth token.
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    api_base: String,
    monitor_base: String,
}

impl TwilioClient {
    pub fn new(settings: &TwilioSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("logview/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            account_sid: settings.account_sid.clone(),
            auth_token: settings.auth_token.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            monitor_base: settings.monitor_base.trim_end_matches('/').to_string(),
        })
    }

    /// Alerts live on the monitor host, everything else on the main API.
    fn url_for(&self, path_and_query: &str) -> String {
        let base = if path_and_query.starts_with("/v1/") {
            &self.monitor_base
        } else {
            &self.api_base
        };
        format!("{base}{path_and_query}")
    }
}

#[async_trait]
impl ResourceClient for TwilioClient {
    async fn get(&self, path_and_query: &str) -> Result<Vec<u8>, UpstreamError> {
        let url = self.url_for(path_and_query);
        debug!("[twilio] GET {path_and_query}");
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.without_url().to_string()))?;
        if status.is_success() {
            return Ok(body.to_vec());
        }

        let message = serde_json::from_slice::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
        Err(UpstreamError::Status {
            status: status.as_u16(),
            message,
        })
    }
}
