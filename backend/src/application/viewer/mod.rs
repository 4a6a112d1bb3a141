//! Fetches upstream log pages and turns them into per-user views.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use shared::records::{self, RecordPage};
use shared::OpaqueCodec;
use thiserror::Error;
use tracing::{debug, warn};

use super::deadline::Deadline;
use super::pagination::{CursorCodec, CursorError};
use super::ports::{ErrorReporter, ResourceClient, UpstreamError};
use crate::domain::entities::User;
use crate::domain::value_objects::{Permission, Sid};
use crate::domain::views::{
    Alert, Call, Conference, IncomingNumber, Message, Page, Recording, View, ViewError,
};

pub mod cache;

pub use cache::PageCache;

/// Time kept back from the request deadline for each upstream fetch.
pub const FETCH_RESERVE: Duration = Duration::from_secs(3);

/// Background page-ahead fetches are not tied to any request.
pub const PREFETCH_TIMEOUT: Duration = Duration::from_secs(30);

const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const CACHE_CAPACITY: usize = 256;

const API_VERSION: &str = "/2010-04-01";

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error("invalid sid {0:?}")]
    InvalidSid(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("upstream sent an unreadable body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    View(#[from] ViewError),
}

impl IntoResponse for ViewerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ViewerError::Cursor(_) | ViewerError::InvalidSid(_) => StatusCode::BAD_REQUEST,
            ViewerError::NotFound(_) => StatusCode::NOT_FOUND,
            ViewerError::Upstream(e) => e
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ViewerError::Decode(_) | ViewerError::View(_) => StatusCode::BAD_GATEWAY,
        };
        let body = if status.is_client_error() {
            self.to_string()
        } else {
            "upstream error".to_string()
        };
        (status, body).into_response()
    }
}

/// One page of visible records plus the cursor for the next one.
#[derive(Debug)]
pub struct Listing<V> {
    pub page: Page<V>,
    pub next: Option<String>,
}

/// Read-only access to the account's logs on behalf of a user.
pub struct Viewer {
    client: Arc<dyn ResourceClient>,
    cursors: CursorCodec,
    cache: Arc<PageCache>,
    reporter: Arc<dyn ErrorReporter>,
    permission: Permission,
    account_sid: String,
    page_size: u32,
}

impl Viewer {
    pub fn new(
        client: Arc<dyn ResourceClient>,
        codec: Arc<OpaqueCodec>,
        reporter: Arc<dyn ErrorReporter>,
        permission: Permission,
        account_sid: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            cursors: CursorCodec::new(codec),
            cache: Arc::new(PageCache::new(CACHE_TTL, CACHE_CAPACITY)),
            reporter,
            permission,
            account_sid: account_sid.into(),
            page_size,
        }
    }

    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    #[cfg(test)]
    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub async fn messages(
        &self,
        cursor: Option<&str>,
        user: &User,
        deadline: &Deadline,
    ) -> Result<Listing<Message>, ViewerError> {
        self.list::<Message, records::MessagePage>(self.account_path("Messages.json"), cursor, user, deadline)
            .await
    }

    pub async fn message(&self, sid: &str, user: &User, deadline: &Deadline) -> Result<Message, ViewerError> {
        let sid = parse_sid(sid, &["SM", "MM"])?;
        self.one(self.account_path(&format!("Messages/{sid}.json")), "message", user, deadline)
            .await
    }

    pub async fn calls(
        &self,
        cursor: Option<&str>,
        user: &User,
        deadline: &Deadline,
    ) -> Result<Listing<Call>, ViewerError> {
        self.list::<Call, records::CallPage>(self.account_path("Calls.json"), cursor, user, deadline)
            .await
    }

    pub async fn call(&self, sid: &str, user: &User, deadline: &Deadline) -> Result<Call, ViewerError> {
        let sid = parse_sid(sid, &["CA"])?;
        self.one(self.account_path(&format!("Calls/{sid}.json")), "call", user, deadline)
            .await
    }

    pub async fn call_recordings(
        &self,
        call_sid: &str,
        cursor: Option<&str>,
        user: &User,
        deadline: &Deadline,
    ) -> Result<Listing<Recording>, ViewerError> {
        let sid = parse_sid(call_sid, &["CA"])?;
        let path = self.account_path(&format!("Calls/{sid}/Recordings.json"));
        self.list::<Recording, records::RecordingPage>(path, cursor, user, deadline)
            .await
    }

    pub async fn conferences(
        &self,
        cursor: Option<&str>,
        user: &User,
        deadline: &Deadline,
    ) -> Result<Listing<Conference>, ViewerError> {
        self.list::<Conference, records::ConferencePage>(
            self.account_path("Conferences.json"),
            cursor,
            user,
            deadline,
        )
        .await
    }

    pub async fn conference(
        &self,
        sid: &str,
        user: &User,
        deadline: &Deadline,
    ) -> Result<Conference, ViewerError> {
        let sid = parse_sid(sid, &["CF"])?;
        self.one(self.account_path(&format!("Conferences/{sid}.json")), "conference", user, deadline)
            .await
    }

    pub async fn alerts(
        &self,
        cursor: Option<&str>,
        user: &User,
        deadline: &Deadline,
    ) -> Result<Listing<Alert>, ViewerError> {
        self.list::<Alert, records::AlertPage>("/v1/Alerts".to_string(), cursor, user, deadline)
            .await
    }

    pub async fn alert(&self, sid: &str, user: &User, deadline: &Deadline) -> Result<Alert, ViewerError> {
        let sid = parse_sid(sid, &["NO"])?;
        self.one(format!("/v1/Alerts/{sid}"), "alert", user, deadline).await
    }

    pub async fn phone_numbers(
        &self,
        cursor: Option<&str>,
        user: &User,
        deadline: &Deadline,
    ) -> Result<Listing<IncomingNumber>, ViewerError> {
        self.list::<IncomingNumber, records::IncomingNumberPage>(
            self.account_path("IncomingPhoneNumbers.json"),
            cursor,
            user,
            deadline,
        )
        .await
    }

    fn account_path(&self, resource: &str) -> String {
        format!("{API_VERSION}/Accounts/{}/{resource}", self.account_sid)
    }

    async fn list<V, P>(
        &self,
        path: String,
        cursor: Option<&str>,
        user: &User,
        deadline: &Deadline,
    ) -> Result<Listing<V>, ViewerError>
    where
        V: View,
        P: RecordPage<Record = V::Raw> + DeserializeOwned,
    {
        let uri = match cursor.filter(|c| !c.is_empty()) {
            Some(cursor) => self.cursors.decode(cursor, &path)?,
            None => format!("{path}?PageSize={}", self.page_size),
        };
        let body = self.fetch(&uri, deadline).await?;
        let (records, next_page_uri) = serde_json::from_slice::<P>(&body)?.into_parts();
        let page = Page::<V>::from_raw(records, next_page_uri, &self.permission, user)?;

        let next = match page.next_page_uri() {
            Some(next_uri) => {
                self.prefetch(next_uri);
                Some(self.cursors.encode(next_uri)?)
            }
            None => None,
        };
        Ok(Listing { page, next })
    }

    async fn one<V>(&self, path: String, kind: &str, user: &User, deadline: &Deadline) -> Result<V, ViewerError>
    where
        V: View,
        V::Raw: DeserializeOwned,
    {
        let body = self.fetch(&path, deadline).await?;
        let raw: V::Raw = serde_json::from_slice(&body)?;
        match V::new(raw, &self.permission, user) {
            Ok(view) => Ok(view),
            Err(e) if e.is_hidden() => Err(ViewerError::NotFound(kind.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch(&self, uri: &str, deadline: &Deadline) -> Result<Vec<u8>, ViewerError> {
        if let Some(body) = self.cache.get(uri) {
            debug!("[viewer] serving {uri} from page cache");
            return Ok(body);
        }
        let result = tokio::time::timeout(deadline.budget(FETCH_RESERVE), self.client.get(uri))
            .await
            .unwrap_or(Err(UpstreamError::Timeout));
        result.map_err(|e| {
            if e.status() != Some(404) {
                warn!("[viewer] upstream fetch failed: {e}");
                self.reporter
                    .report_error(&anyhow::anyhow!("fetching {uri}: {e}"));
            }
            ViewerError::Upstream(e)
        })
    }

    /// Warms the cache with the next page. Runs detached with its own
    /// timeout; failures are logged and otherwise ignored.
    fn prefetch(&self, uri: &str) {
        if self.cache.contains(uri) {
            return;
        }
        let client = Arc::clone(&self.client);
        let cache = Arc::clone(&self.cache);
        let uri = uri.to_string();
        tokio::spawn(async move {
            match tokio::time::timeout(PREFETCH_TIMEOUT, client.get(&uri)).await {
                Ok(Ok(body)) => cache.insert(uri, body),
                Ok(Err(e)) => warn!("[viewer] prefetch of next page failed: {e}"),
                Err(_) => warn!("[viewer] prefetch of next page timed out"),
            }
        });
    }
}

fn parse_sid(raw: &str, prefixes: &[&str]) -> Result<Sid, ViewerError> {
    let sid = Sid::parse(raw).map_err(|_| ViewerError::InvalidSid(raw.to_string()))?;
    if prefixes.contains(&sid.prefix()) {
        Ok(sid)
    } else {
        Err(ViewerError::InvalidSid(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::error_reporter::MockErrorReporter;
    use crate::application::ports::resource_client::MockResourceClient;
    use crate::domain::entities::UserSettings;
    use chrono::{Duration as Age, Utc};
    use mockall::predicate::eq;
    use serde_json::json;
    use shared::SecretKey;

    const ACCOUNT: &str = "AC0123456789abcdef0123456789abcdef";
    const CALL_SID: &str = "CA0123456789abcdef0123456789abcdef";

    fn calls_path() -> String {
        format!("/2010-04-01/Accounts/{ACCOUNT}/Calls.json")
    }

    fn rfc2822_ago(age: Age) -> String {
        (Utc::now() - age).to_rfc2822()
    }

    fn call_json(sid: &str, age: Age) -> serde_json::Value {
        json!({
            "sid": sid,
            "date_created": rfc2822_ago(age),
            "from": "+14105551234",
            "to": "+14105556789",
            "status": "completed",
            "direction": "inbound",
            "duration": "42",
            "price": "-0.01300",
            "price_unit": "USD"
        })
    }

    fn quiet_reporter() -> Arc<dyn ErrorReporter> {
        let mut reporter = MockErrorReporter::new();
        reporter.expect_report_error().never();
        Arc::new(reporter)
    }

    fn viewer(client: MockResourceClient, reporter: Arc<dyn ErrorReporter>, permission: Permission) -> Viewer {
        Viewer::new(
            Arc::new(client),
            Arc::new(OpaqueCodec::new(&SecretKey::generate())),
            reporter,
            permission,
            ACCOUNT,
            50,
        )
    }

    #[tokio::test]
    async fn test_calls_page_filters_and_links_next() {
        let next_uri = format!("{}?PageSize=50&Page=1&PageToken=PACA3", calls_path());
        let body = serde_json::to_vec(&json!({
            "calls": [
                call_json("CA1", Age::minutes(30)),
                call_json("CA2", Age::hours(3)),
                call_json("CA3", Age::minutes(50)),
            ],
            "next_page_uri": next_uri,
        }))
        .unwrap();
        let next_body = serde_json::to_vec(&json!({ "calls": [], "next_page_uri": null })).unwrap();

        let mut client = MockResourceClient::new();
        client
            .expect_get()
            .with(eq(format!("{}?PageSize=50", calls_path())))
            .times(1)
            .returning(move |_| Ok(body.clone()));
        client
            .expect_get()
            .with(eq(next_uri.clone()))
            .times(1)
            .returning(move |_| Ok(next_body.clone()));

        let viewer = viewer(client, quiet_reporter(), Permission::new(Age::hours(1)));
        let listing = viewer
            .calls(None, &User::unrestricted(), &Deadline::none())
            .await
            .unwrap();

        let sids: Vec<_> = listing.page.items().iter().map(|c| c.sid().unwrap()).collect();
        assert_eq!(sids, vec!["CA1", "CA3"]);
        let cursor = listing.next.expect("next cursor");
        assert!(!cursor.contains("PageToken"));

        for _ in 0..20 {
            if viewer.cache().contains(&next_uri) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(viewer.cache().contains(&next_uri));

        // Served from the prefetched body; the mock allows one upstream call.
        let second = viewer
            .calls(Some(&cursor), &User::unrestricted(), &Deadline::none())
            .await
            .unwrap();
        assert!(second.page.is_empty());
        assert_eq!(second.next, None);
    }

    #[tokio::test]
    async fn test_cursor_for_other_resource_is_rejected() {
        let mut client = MockResourceClient::new();
        client.expect_get().never();
        let codec = Arc::new(OpaqueCodec::new(&SecretKey::generate()));
        let viewer = Viewer::new(
            Arc::new(client),
            codec.clone(),
            quiet_reporter(),
            Permission::all_history(),
            ACCOUNT,
            50,
        );
        let foreign = CursorCodec::new(codec)
            .encode(&format!("/2010-04-01/Accounts/{ACCOUNT}/Messages.json?Page=1"))
            .unwrap();

        let err = viewer
            .calls(Some(&foreign), &User::unrestricted(), &Deadline::none())
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Cursor(CursorError::WrongResource { .. })));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_hidden_single_record_is_not_found() {
        let body = serde_json::to_vec(&call_json(CALL_SID, Age::minutes(5))).unwrap();
        let mut client = MockResourceClient::new();
        client
            .expect_get()
            .with(eq(format!("/2010-04-01/Accounts/{ACCOUNT}/Calls/{CALL_SID}.json")))
            .returning(move |_| Ok(body.clone()));
        let viewer = viewer(client, quiet_reporter(), Permission::all_history());

        let no_calls = User::new(Some(UserSettings {
            can_view_calls: false,
            ..UserSettings::default()
        }));
        let err = viewer.call(CALL_SID, &no_calls, &Deadline::none()).await.unwrap_err();
        assert!(matches!(err, ViewerError::NotFound(_)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let call = viewer
            .call(CALL_SID, &User::unrestricted(), &Deadline::none())
            .await
            .unwrap();
        assert_eq!(call.duration().unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_sid_is_validated_before_fetching() {
        let mut client = MockResourceClient::new();
        client.expect_get().never();
        let viewer = viewer(client, quiet_reporter(), Permission::all_history());

        for sid in ["../../Messages", "SM0123456789abcdef0123456789abcdef"] {
            let err = viewer
                .call(sid, &User::unrestricted(), &Deadline::none())
                .await
                .unwrap_err();
            assert!(matches!(err, ViewerError::InvalidSid(_)));
        }
    }

    #[tokio::test]
    async fn test_upstream_errors_map_and_report() {
        let mut client = MockResourceClient::new();
        client.expect_get().times(1).returning(|_| {
            Err(UpstreamError::Status {
                status: 404,
                message: "not found".into(),
            })
        });
        let viewer_404 = viewer(client, quiet_reporter(), Permission::all_history());
        let err = viewer_404
            .call(CALL_SID, &User::unrestricted(), &Deadline::none())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let mut client = MockResourceClient::new();
        client.expect_get().times(1).returning(|_| {
            Err(UpstreamError::Status {
                status: 500,
                message: "boom".into(),
            })
        });
        let mut reporter = MockErrorReporter::new();
        reporter.expect_report_error().times(1).return_const(());
        let viewer_500 = viewer(client, Arc::new(reporter), Permission::all_history());
        let err = viewer_500
            .messages(None, &User::unrestricted(), &Deadline::none())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_phone_numbers_ignore_age_window() {
        let body = serde_json::to_vec(&json!({
            "incoming_phone_numbers": [{
                "sid": "PN1",
                "phone_number": "+14105550000",
                "date_created": rfc2822_ago(Age::days(2000)),
                "voice_url": "https://hooks.example.com/voice",
                "capabilities": { "voice": true, "SMS": true, "MMS": false }
            }],
            "next_page_uri": null
        }))
        .unwrap();
        let mut client = MockResourceClient::new();
        client.expect_get().returning(move |_| Ok(body.clone()));
        let viewer = viewer(client, quiet_reporter(), Permission::new(Age::hours(1)));

        let no_callbacks = User::new(Some(UserSettings {
            can_view_callback_urls: false,
            ..UserSettings::default()
        }));
        let listing = viewer
            .phone_numbers(None, &no_callbacks, &Deadline::none())
            .await
            .unwrap();
        let number = &listing.page.items()[0];
        assert_eq!(number.phone_number().unwrap(), "+14105550000");
        assert!(number.voice_url().is_err());
        assert!(number.sms_capable().unwrap());
    }
}
