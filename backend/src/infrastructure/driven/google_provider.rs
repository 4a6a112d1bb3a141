use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::application::ports::{Identity, IdentityProvider, ProviderError};
use crate::infrastructure::config::GoogleSettings;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

/// Google's OAuth2 endpoints, overridable for tests.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth: String,
    pub token: String,
    pub userinfo: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth: AUTH_ENDPOINT.to_string(),
            token: TOKEN_ENDPOINT.to_string(),
            userinfo: USERINFO_ENDPOINT.to_string(),
        }
    }
}

pub struct GoogleProvider {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    auth_endpoint: Url,
    endpoints: GoogleEndpoints,
}

impl GoogleProvider {
    pub fn new(settings: &GoogleSettings, endpoints: GoogleEndpoints) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_url: settings.redirect_url.clone(),
            auth_endpoint: Url::parse(&endpoints.auth)?,
            endpoints,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, state: &str) -> String {
        let mut url = self.auth_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email")
            .append_pair("state", state);
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        let resp = self
            .client
            .post(&self.endpoints.token)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Exchange(e.without_url().to_string()))?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Exchange(e.to_string()))?;
        Ok(token.access_token)
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<Identity, ProviderError> {
        let info: UserInfo = self
            .client
            .get(&self.endpoints.userinfo)
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Identity(e.without_url().to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::Identity(e.to_string()))?;
        let email = info
            .email
            .ok_or_else(|| ProviderError::Identity("no email in profile".to_string()))?;
        Ok(Identity {
            email,
            verified: info.email_verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Form;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn settings() -> GoogleSettings {
        GoogleSettings {
            client_id: "client-1".to_string(),
            client_secret: "shh".to_string(),
            redirect_url: "https://logs.example.com/auth/callback".to_string(),
            allowed_domains: vec![],
        }
    }

    async fn fake_google() -> GoogleEndpoints {
        async fn token(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<serde_json::Value>) {
            if form.get("code").map(String::as_str) == Some("good-code")
                && form.get("grant_type").map(String::as_str) == Some("authorization_code")
            {
                (StatusCode::OK, Json(json!({ "access_token": "at-1", "token_type": "Bearer" })))
            } else {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" })))
            }
        }
        async fn userinfo(headers: HeaderMap) -> (StatusCode, Json<serde_json::Value>) {
            match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
                Some("Bearer at-1") => (
                    StatusCode::OK,
                    Json(json!({ "sub": "1", "email": "kim@example.com", "email_verified": true })),
                ),
                _ => (StatusCode::UNAUTHORIZED, Json(json!({}))),
            }
        }

        let app = Router::new()
            .route("/token", post(token))
            .route("/userinfo", get(userinfo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        GoogleEndpoints {
            auth: format!("http://{addr}/auth"),
            token: format!("http://{addr}/token"),
            userinfo: format!("http://{addr}/userinfo"),
        }
    }

    #[test]
    fn test_authorization_url() {
        let provider = GoogleProvider::new(&settings(), GoogleEndpoints::default()).unwrap();
        let url = Url::parse(&provider.authorization_url("sealed-state_1")).unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client-1");
        assert_eq!(params["redirect_uri"], "https://logs.example.com/auth/callback");
        assert_eq!(params["scope"], "openid email");
        assert_eq!(params["state"], "sealed-state_1");
    }

    #[tokio::test]
    async fn test_exchange_and_identity() {
        let provider = GoogleProvider::new(&settings(), fake_google().await).unwrap();
        let token = provider.exchange_code("good-code").await.unwrap();
        assert_eq!(token, "at-1");

        let identity = provider.fetch_identity(&token).await.unwrap();
        assert_eq!(
            identity,
            Identity {
                email: "kim@example.com".to_string(),
                verified: true
            }
        );
    }

    #[tokio::test]
    async fn test_failures() {
        let provider = GoogleProvider::new(&settings(), fake_google().await).unwrap();
        assert!(matches!(
            provider.exchange_code("bad-code").await,
            Err(ProviderError::Exchange(_))
        ));
        assert!(matches!(
            provider.fetch_identity("stolen").await,
            Err(ProviderError::Identity(_))
        ));
    }
}
