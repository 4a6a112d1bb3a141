mod application;
mod domain;
mod infrastructure;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use shared::OpaqueCodec;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use application::auth::{Authenticator, BasicAuthenticator, GoogleAuthenticator, NoopAuthenticator};
use application::viewer::Viewer;
use domain::entities::Policy;
use infrastructure::config::{AuthScheme, Settings};
use infrastructure::driven::{GoogleEndpoints, GoogleProvider, TracingReporter, TwilioClient};
use infrastructure::driving::http::router;
use infrastructure::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let settings = Settings::load().context("loading configuration")?;
    let codec = Arc::new(OpaqueCodec::new(&settings.secret_key()?));

    let policy = settings.policy()?;
    if policy.is_none() {
        warn!("[config] no policy configured, every authenticated user can see every record");
    }
    let authenticator = Arc::new(build_authenticator(&settings, codec.clone(), policy)?);

    let client = TwilioClient::new(&settings.twilio).context("building upstream client")?;
    let viewer = Viewer::new(
        Arc::new(client),
        codec,
        Arc::new(TracingReporter),
        settings.permission(),
        settings.twilio.account_sid.clone(),
        settings.page_size,
    );

    let state = AppState {
        authenticator: authenticator.clone(),
        viewer: Arc::new(viewer),
        request_timeout: Duration::from_secs(settings.server.request_timeout_secs),
    };

    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(authenticator.clone()));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(
        "[server] listening on {addr} with {} authentication",
        authenticator.scheme()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_authenticator(
    settings: &Settings,
    codec: Arc<OpaqueCodec>,
    policy: Option<Policy>,
) -> anyhow::Result<Authenticator> {
    let auth = &settings.auth;
    let authenticator = match auth.scheme {
        AuthScheme::Noop => {
            warn!("[auth] authentication is disabled");
            Authenticator::Noop(NoopAuthenticator::new(None))
        }
        AuthScheme::Basic => Authenticator::Basic(BasicAuthenticator::new(
            auth.realm.clone(),
            auth.basic.users.clone(),
            policy,
        )?),
        AuthScheme::Google => {
            let google = auth
                .google
                .as_ref()
                .context("auth.google is required for the google scheme")?;
            let provider = GoogleProvider::new(google, GoogleEndpoints::default())?;
            Authenticator::Google(GoogleAuthenticator::new(
                Arc::new(provider),
                codec,
                google.allowed_domains.clone(),
                settings.server.allow_unencrypted_traffic,
                policy,
            ))
        }
    };
    Ok(authenticator)
}

/// Re-reads the configuration on SIGHUP and swaps in the new policy and
/// basic-auth passwords. A bad file keeps the running configuration.
#[cfg(unix)]
async fn reload_on_hangup(authenticator: Arc<Authenticator>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("[config] cannot listen for SIGHUP, reload disabled: {e}");
            return;
        }
    };
    while hangups.recv().await.is_some() {
        match reload(&authenticator) {
            Ok(()) => info!("[config] reloaded policy"),
            Err(e) => warn!("[config] reload failed, keeping the current policy: {e:#}"),
        }
    }
}

#[cfg(unix)]
fn reload(authenticator: &Authenticator) -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let policy = settings.policy()?;
    if let Authenticator::Basic(basic) = authenticator {
        basic.set_passwords(settings.auth.basic.users)?;
    }
    authenticator.set_policy(policy);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("[server] cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("[server] shutting down");
}
