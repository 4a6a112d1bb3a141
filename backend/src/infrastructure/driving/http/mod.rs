//! HTTP surface: login flow routes plus the read-only JSON API.

use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::infrastructure::AppState;

pub mod auth;
pub mod middleware;
pub mod resources;

pub use auth::auth_routes;
pub use resources::resource_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(resource_routes())
        .layer(from_fn_with_state(state.clone(), middleware::set_deadline))
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use chrono::{Duration as Age, Utc};
    use serde_json::{json, Value};
    use shared::{OpaqueCodec, SecretKey};
    use tower::ServiceExt;

    use crate::application::auth::{
        Authenticator, BasicAuthenticator, GoogleAuthenticator, NoopAuthenticator,
    };
    use crate::application::ports::identity_provider::MockIdentityProvider;
    use crate::application::ports::resource_client::MockResourceClient;
    use crate::application::ports::UpstreamError;
    use crate::application::viewer::Viewer;
    use crate::domain::entities::{Group, Policy, UserSettings};
    use crate::domain::value_objects::Permission;
    use crate::infrastructure::driven::TracingReporter;

    const ACCOUNT: &str = "AC0123456789abcdef0123456789abcdef";
    const MESSAGE_SID: &str = "SM0123456789abcdef0123456789abcdef";
    const GOOD: &str = "Basic dGVzdDp0aGVwYXNzd29yZA==";
    const WRONG: &str = "Basic dGVzdDp3cm9uZ3Bhc3N3b3Jk";

    fn state(authenticator: Authenticator, client: MockResourceClient) -> AppState {
        let codec = Arc::new(OpaqueCodec::new(&SecretKey::generate()));
        AppState {
            authenticator: Arc::new(authenticator),
            viewer: Arc::new(Viewer::new(
                Arc::new(client),
                codec,
                Arc::new(TracingReporter),
                Permission::new(Age::hours(1)),
                ACCOUNT,
                50,
            )),
            request_timeout: Duration::from_secs(10),
        }
    }

    fn basic(policy: Option<Policy>) -> Authenticator {
        let users = HashMap::from([("test".to_string(), "thepassword".to_string())]);
        Authenticator::Basic(BasicAuthenticator::new("logs", users, policy).unwrap())
    }

    fn offline() -> MockResourceClient {
        let mut client = MockResourceClient::new();
        client.expect_get().never();
        client
    }

    async fn send(app: Router, uri: &str, auth: Option<&str>) -> Response {
        let mut req = Request::builder().uri(uri);
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn message_json(sid: &str, age: Age) -> Value {
        json!({
            "sid": sid,
            "date_created": (Utc::now() - age).to_rfc2822(),
            "from": "+14105551234",
            "to": "+14105556789",
            "body": "see you at noon",
            "status": "delivered",
            "direction": "outbound-api",
            "num_media": "0",
            "num_segments": "1",
            "price": "-0.00750",
            "price_unit": "USD"
        })
    }

    #[tokio::test]
    async fn test_basic_auth_end_to_end() {
        let app = router(state(basic(None), offline()));

        let response = send(app.clone(), "/api/me", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Basic realm=\"logs\"");

        let response = send(app.clone(), "/api/me", Some(WRONG)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(app, "/api/me", Some(GOOD)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["scheme"], "basic");
        assert_eq!(body["max_resource_age_secs"], 3600);
        let capabilities = body["capabilities"].as_object().unwrap();
        assert!(capabilities.values().all(|v| v == &Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_listing_redacts_by_policy_and_hides_old_records() {
        let policy = Policy::new(vec![Group {
            name: "support".to_string(),
            permissions: UserSettings {
                can_view_message_body: false,
                ..UserSettings::default()
            },
            users: vec!["test".to_string()],
            default: false,
        }])
        .unwrap();
        let page = serde_json::to_vec(&json!({
            "messages": [
                message_json(MESSAGE_SID, Age::minutes(5)),
                message_json("SM1", Age::hours(2)),
            ],
            "next_page_uri": null,
        }))
        .unwrap();
        let mut client = MockResourceClient::new();
        client
            .expect_get()
            .times(1)
            .returning(move |_| Ok(page.clone()));

        let response = send(router(state(basic(Some(policy)), client)), "/api/messages", Some(GOOD)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["sid"], MESSAGE_SID);
        assert_eq!(items[0]["from"], "+14105551234");
        assert_eq!(items[0]["body"], Value::Null);
        assert_eq!(body["next"], Value::Null);
    }

    #[tokio::test]
    async fn test_bad_input_is_rejected_before_fetching() {
        let app = router(state(Authenticator::Noop(NoopAuthenticator::new(None)), offline()));

        let response = send(app.clone(), "/api/calls?next=not-a-cursor", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(app, "/api/messages/CA0123456789abcdef0123456789abcdef", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_errors_keep_client_status() {
        let mut client = MockResourceClient::new();
        client.expect_get().returning(|path| {
            if path.contains("/Messages/") {
                Err(UpstreamError::Status {
                    status: 404,
                    message: "not found".to_string(),
                })
            } else {
                Err(UpstreamError::Status {
                    status: 500,
                    message: "boom".to_string(),
                })
            }
        });
        let app = router(state(Authenticator::Noop(NoopAuthenticator::new(None)), client));

        let response = send(app.clone(), &format!("/api/messages/{MESSAGE_SID}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(app, "/api/conferences", None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"upstream error");
    }

    #[tokio::test]
    async fn test_oauth_routes() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_authorization_url()
            .returning(|state| format!("https://accounts.example.com/auth?state={state}"));
        let google = GoogleAuthenticator::new(
            Arc::new(provider),
            Arc::new(OpaqueCodec::new(&SecretKey::generate())),
            vec!["example.com".to_string()],
            false,
            None,
        );
        let app = router(state(Authenticator::Google(google), offline()));

        let response = send(app.clone(), "/api/calls", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/auth/login?next=%2Fapi%2Fcalls");

        let response = send(app.clone(), "/auth/login?next=%2Fapi%2Fcalls", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://accounts.example.com/auth?state="));

        let response = send(app.clone(), "/auth/callback?code=abc", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(app, "/auth/logout", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("token=;"));
    }

    #[tokio::test]
    async fn test_callback_without_oauth_is_not_found() {
        let app = router(state(basic(None), offline()));
        let response = send(app, "/auth/callback?state=a&code=b", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
