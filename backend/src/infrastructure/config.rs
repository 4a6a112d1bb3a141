// Infrastructure - configuration loading
//
// Layers: optional TOML file (LOGVIEW_CONFIG, default logview.toml), then
// LOGVIEW__SECTION__KEY environment variables. `.env` is read by main first.

use std::collections::HashMap;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use shared::{OpaqueError, SecretKey};
use thiserror::Error;
use tracing::warn;

use crate::application::auth::AuthSetupError;
use crate::domain::entities::{Group, Policy, PolicyError};
use crate::domain::value_objects::{Permission, Sid};

pub const CONFIG_PATH_VAR: &str = "LOGVIEW_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "logview.toml";
const ENV_PREFIX: &str = "LOGVIEW";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid secret_key: {0}")]
    Key(#[from] OpaqueError),

    #[error("invalid auth configuration: {0}")]
    Auth(#[from] AuthSetupError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    /// 64 hex characters. Random per process when unset.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Oldest record anyone may see; unset means all history.
    #[serde(default)]
    pub max_resource_age_secs: Option<i64>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub twilio: TwilioSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub policy: Vec<Group>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    /// Drops the `Secure` cookie attribute; only for plain-HTTP local runs.
    pub allow_unencrypted_traffic: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            allow_unencrypted_traffic: false,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_monitor_base")]
    pub monitor_base: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    #[default]
    Noop,
    Basic,
    Google,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub scheme: AuthScheme,
    pub realm: String,
    pub basic: BasicSettings,
    pub google: Option<GoogleSettings>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            scheme: AuthScheme::Noop,
            realm: "logview".to_string(),
            basic: BasicSettings::default(),
            google: None,
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct BasicSettings {
    /// username -> password
    pub users: HashMap<String, String>,
}

#[derive(Clone, Deserialize)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

fn default_page_size() -> u32 {
    50
}

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_monitor_base() -> String {
    "https://monitor.twilio.com".to_string()
}

impl Settings {
    /// Loads from the file named by `LOGVIEW_CONFIG` plus the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let raw = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.google.allowed_domains"),
            )
            .build()?;
        let settings: Settings = raw.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let account = Sid::parse(&self.twilio.account_sid).map_err(|reason| ConfigError::Invalid {
            key: "twilio.account_sid",
            reason,
        })?;
        if account.prefix() != "AC" {
            return Err(ConfigError::Invalid {
                key: "twilio.account_sid",
                reason: "account sids start with AC".to_string(),
            });
        }
        if !(1..=1000).contains(&self.page_size) {
            return Err(ConfigError::Invalid {
                key: "page_size",
                reason: "must be between 1 and 1000".to_string(),
            });
        }
        if matches!(self.max_resource_age_secs, Some(secs) if secs <= 0) {
            return Err(ConfigError::Invalid {
                key: "max_resource_age_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.auth.scheme == AuthScheme::Google && self.auth.google.is_none() {
            return Err(ConfigError::Invalid {
                key: "auth.google",
                reason: "required when auth.scheme is google".to_string(),
            });
        }
        self.policy()?;
        Ok(())
    }

    /// The validated policy; an empty group list means no policy.
    pub fn policy(&self) -> Result<Option<Policy>, ConfigError> {
        if self.policy.is_empty() {
            return Ok(None);
        }
        Ok(Some(Policy::new(self.policy.clone())?))
    }

    pub fn secret_key(&self) -> Result<SecretKey, ConfigError> {
        match self.secret_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(hex) => Ok(SecretKey::from_hex(hex)?),
            None => {
                warn!("[config] no secret_key configured, generated a random one; sessions and cursors will not survive a restart");
                Ok(SecretKey::generate())
            }
        }
    }

    pub fn permission(&self) -> Permission {
        match self.max_resource_age_secs {
            Some(secs) => Permission::new(chrono::Duration::seconds(secs)),
            None => Permission::all_history(),
        }
    }
}

#[cfg(test)]
impl Settings {
    pub(crate) fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let raw = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        let settings: Settings = raw.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}
