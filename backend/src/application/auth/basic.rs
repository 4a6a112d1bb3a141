use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use axum::http::HeaderMap;
use axum_extra::headers::{authorization::Basic, Authorization, HeaderMapExt};
use subtle::ConstantTimeEq;
use tracing::info;

use super::{AuthError, AuthSetupError, PolicySlot};
use crate::domain::entities::{Policy, User};

/// HTTP Basic authentication against a small administrator-managed set of
/// plaintext passwords.
#[derive(Debug)]
pub struct BasicAuthenticator {
    realm: String,
    passwords: Mutex<HashMap<String, String>>,
    policy: PolicySlot,
}

impl BasicAuthenticator {
    pub fn new(
        realm: impl Into<String>,
        passwords: HashMap<String, String>,
        policy: Option<Policy>,
    ) -> Result<Self, AuthSetupError> {
        check_passwords(&passwords)?;
        Ok(Self {
            realm: realm.into(),
            passwords: Mutex::new(passwords),
            policy: PolicySlot::new(policy),
        })
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<User, AuthError> {
        let Some(Authorization(credentials)) = headers.typed_get::<Authorization<Basic>>() else {
            return Err(AuthError::NoCredentials {
                realm: self.realm.clone(),
            });
        };
        let username = credentials.username();
        if username.is_empty() {
            return Err(AuthError::NoCredentials {
                realm: self.realm.clone(),
            });
        }

        if !self.password_matches(username, credentials.password()) {
            return Err(AuthError::InvalidCredentials {
                username: username.to_string(),
            });
        }
        self.policy.resolve(username)
    }

    fn password_matches(&self, username: &str, supplied: &str) -> bool {
        let passwords = self.passwords.lock().unwrap_or_else(PoisonError::into_inner);
        match passwords.get(username) {
            Some(expected) => expected.as_bytes().ct_eq(supplied.as_bytes()).into(),
            None => false,
        }
    }

    pub fn set_passwords(&self, passwords: HashMap<String, String>) -> Result<(), AuthSetupError> {
        check_passwords(&passwords)?;
        let count = passwords.len();
        *self.passwords.lock().unwrap_or_else(PoisonError::into_inner) = passwords;
        info!("[auth] basic auth now has {count} users");
        Ok(())
    }

    pub fn set_policy(&self, policy: Option<Policy>) {
        self.policy.set(policy);
    }
}

fn check_passwords(passwords: &HashMap<String, String>) -> Result<(), AuthSetupError> {
    if passwords.is_empty() {
        return Err(AuthSetupError::NoBasicUsers);
    }
    if passwords.keys().any(|u| u.is_empty()) {
        return Err(AuthSetupError::EmptyUsername);
    }
    Ok(())
}
