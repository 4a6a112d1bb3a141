use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream resource identifier: two uppercase letters followed by 32 hex
/// digits (`SM...`, `CA...`, `CF...`). Validated before it is ever placed in an
/// upstream request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sid(String);

impl Sid {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let bytes = raw.as_bytes();
        if bytes.len() != 34 {
            return Err(format!("invalid sid length: {}", bytes.len()));
        }
        if !bytes[..2].iter().all(u8::is_ascii_uppercase) {
            return Err("sid must start with two uppercase letters".to_string());
        }
        if !bytes[2..].iter().all(u8::is_ascii_hexdigit) {
            return Err("sid must end with 32 hex digits".to_string());
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        &self.0[..2]
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
