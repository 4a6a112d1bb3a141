use serde::{Deserialize, Serialize};
use std::fmt;

/// A verified email address as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn new(email: String) -> Result<Self, String> {
        let email = email.trim().to_lowercase();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err("Invalid email format".to_string()),
        }
        if email.len() > 255 {
            return Err("Email too long".to_string());
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `allowed` is empty or the address ends in `@<domain>` for
    /// one of the listed domains.
    pub fn in_domains(&self, allowed: &[String]) -> bool {
        if allowed.is_empty() {
            return true;
        }
        allowed.iter().any(|domain| {
            let domain = domain.trim().trim_start_matches('@').to_lowercase();
            !domain.is_empty() && self.0.ends_with(&format!("@{domain}"))
        })
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalised() {
        let email = Email::new(" Kevin@Example.COM ".to_string()).unwrap();
        assert_eq!(email.as_str(), "kevin@example.com");
        assert!(Email::new("no-at-sign".to_string()).is_err());
        assert!(Email::new("@example.com".to_string()).is_err());
    }

    #[test]
    fn test_domain_allow_list() {
        let email = Email::new("a@example.com".to_string()).unwrap();
        assert!(email.in_domains(&[]));
        assert!(email.in_domains(&["example.com".to_string()]));
        assert!(email.in_domains(&["other.org".to_string(), "@Example.com".to_string()]));
        assert!(!email.in_domains(&["ample.com".to_string()]));
        assert!(!email.in_domains(&["other.org".to_string()]));
    }
}
