use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::user::{User, UserSettings};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("policy group at position {0} has no name")]
    EmptyName(usize),

    #[error("group name {0:?} appears twice in policy")]
    DuplicateName(String),

    #[error("more than one default group in policy: {first:?} and {second:?}")]
    MultipleDefaults { first: String, second: String },

    #[error("user {user:?} appears in more than one group: {first:?} and {second:?}")]
    DuplicateUser {
        user: String,
        first: String,
        second: String,
    },

    #[error("user {0:?} is not in any group and the policy has no default group")]
    UnknownUser(String),
}

/// A named set of identities sharing one capability set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub permissions: UserSettings,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub default: bool,
}

/// Ordered list of groups mapping identities to capabilities.
///
/// Validated once on construction; a `Policy` value always satisfies its
/// invariants, so lookups never re-check them.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Vec<Group>")]
pub struct Policy {
    groups: Vec<Group>,
    members: HashMap<String, usize>,
    default: Option<usize>,
}

impl Policy {
    pub fn new(groups: Vec<Group>) -> Result<Self, PolicyError> {
        let mut names: HashMap<&str, usize> = HashMap::new();
        let mut members: HashMap<String, usize> = HashMap::new();
        let mut default: Option<usize> = None;

        for (idx, group) in groups.iter().enumerate() {
            if group.name.trim().is_empty() {
                return Err(PolicyError::EmptyName(idx));
            }
            if names.insert(group.name.as_str(), idx).is_some() {
                return Err(PolicyError::DuplicateName(group.name.clone()));
            }
            if group.default {
                if let Some(first) = default {
                    return Err(PolicyError::MultipleDefaults {
                        first: groups[first].name.clone(),
                        second: group.name.clone(),
                    });
                }
                default = Some(idx);
            }
            for user in &group.users {
                if let Some(first) = members.insert(member_key(user), idx) {
                    return Err(PolicyError::DuplicateUser {
                        user: user.clone(),
                        first: groups[first].name.clone(),
                        second: group.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            groups,
            members,
            default,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Resolves an identity to its user.
    ///
    /// Returns `(user, true)` for an exact member, `(default_user, false)` when
    /// only the default group applies, and `UnknownUser` otherwise.
    pub fn lookup(&self, id: &str) -> Result<(User, bool), PolicyError> {
        if let Some(&idx) = self.members.get(&member_key(id)) {
            return Ok((self.user_for(idx), true));
        }
        match self.default {
            Some(idx) => Ok((self.user_for(idx), false)),
            None => Err(PolicyError::UnknownUser(id.to_string())),
        }
    }

    fn user_for(&self, idx: usize) -> User {
        User::new(Some(self.groups[idx].permissions))
    }
}

/// Identities compare case-insensitively; OAuth emails arrive lowercased.
fn member_key(id: &str) -> String {
    id.trim().to_lowercase()
}

impl TryFrom<Vec<Group>> for Policy {
    type Error = PolicyError;

    fn try_from(groups: Vec<Group>) -> Result<Self, Self::Error> {
        Policy::new(groups)
    }
}
