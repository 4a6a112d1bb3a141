//! Per-request, per-identity wrappers around raw upstream records.
//!
//! A view pairs one raw record with the requesting [`User`]. Construction
//! enforces presence of the creation time, the [`Permission`] age window and
//! the family's coarse capability; every field accessor re-checks the
//! canonical `can_view_property` predicate and returns
//! [`ViewError::PermissionDenied`] on denial. Views are bound to one identity
//! and must never be cached; cache raw records instead.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use shared::Timestamp;
use thiserror::Error;

use super::entities::User;
use super::value_objects::Permission;

pub mod alert;
pub mod call;
pub mod conference;
pub mod incoming_number;
pub mod message;
pub mod page;
pub mod recording;

pub use alert::Alert;
pub use call::Call;
pub use conference::Conference;
pub use incoming_number::IncomingNumber;
pub use message::Message;
pub use page::{AlertPage, CallPage, ConferencePage, IncomingNumberPage, MessagePage, Page, RecordingPage};
pub use recording::Recording;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("resource is older than the maximum resource age")]
    TooOld,

    #[error("resource {sid:?} has a missing or invalid creation time")]
    InvalidCreatedAt { sid: String },
}

impl ViewError {
    /// Hidden records are skipped silently instead of failing a page.
    pub fn is_hidden(&self) -> bool {
        matches!(self, ViewError::PermissionDenied | ViewError::TooOld)
    }
}

/// A single rendered field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(i64),
    Time(DateTime<Utc>),
    Flag(bool),
    Empty,
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(s: Option<&str>) -> Self {
        s.map(FieldValue::from).unwrap_or(FieldValue::Empty)
    }
}

impl From<Option<u32>> for FieldValue {
    fn from(n: Option<u32>) -> Self {
        n.map(|n| FieldValue::Number(n.into())).unwrap_or(FieldValue::Empty)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(n: Option<i64>) -> Self {
        n.map(FieldValue::Number).unwrap_or(FieldValue::Empty)
    }
}

impl From<Option<DateTime<Utc>>> for FieldValue {
    fn from(t: Option<DateTime<Utc>>) -> Self {
        t.map(FieldValue::Time).unwrap_or(FieldValue::Empty)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Time(t)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Flag(b)
    }
}

/// Typed accessor as stored in a view's field table.
pub type Accessor<V> = fn(&V) -> Result<FieldValue, ViewError>;

/// `(property name, accessor)` pairs, built once per view type.
pub type FieldTable<V> = &'static [(&'static str, Accessor<V>)];

/// Outcome of reading one field through the redaction adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Value(FieldValue),
    Redacted,
}

pub trait View: Sized {
    type Raw;

    /// Wraps `raw` for `user`, enforcing presence, age and family gate.
    fn new(raw: Self::Raw, permission: &Permission, user: &User) -> Result<Self, ViewError>;

    /// Canonical capability check for a property of this view.
    ///
    /// # Panics
    ///
    /// Panics on a property name the view does not define; that is a schema
    /// mismatch between the view and its caller, not bad input.
    fn can_view_property(&self, name: &str) -> bool;

    fn fields() -> FieldTable<Self>;

    fn guard(&self, name: &str) -> Result<(), ViewError> {
        if self.can_view_property(name) {
            Ok(())
        } else {
            Err(ViewError::PermissionDenied)
        }
    }
}

/// Reads a field, turning a permission denial into a redaction marker.
/// Any other error propagates.
pub fn render_field<V>(view: &V, accessor: Accessor<V>) -> Result<Rendered, ViewError> {
    match accessor(view) {
        Ok(value) => Ok(Rendered::Value(value)),
        Err(ViewError::PermissionDenied) => Ok(Rendered::Redacted),
        Err(e) => Err(e),
    }
}

/// Renders every field in the view's table. Redacted fields come out as
/// `null`, the same as fields the upstream record simply does not have.
pub fn to_json<V: View + 'static>(view: &V) -> Result<Value, ViewError> {
    let mut out = Map::new();
    for (name, accessor) in V::fields() {
        let value = match render_field(view, *accessor)? {
            Rendered::Value(v) => serde_json::to_value(v).unwrap_or(Value::Null),
            Rendered::Redacted => Value::Null,
        };
        out.insert((*name).to_string(), value);
    }
    Ok(Value::Object(out))
}

/// Presence and age checks shared by every constructor.
pub(crate) fn check_created(
    sid: &str,
    created: &Timestamp,
    permission: Option<&Permission>,
) -> Result<DateTime<Utc>, ViewError> {
    let created = created.get().ok_or_else(|| ViewError::InvalidCreatedAt {
        sid: sid.to_string(),
    })?;
    if let Some(permission) = permission {
        if !permission.allows(created, Utc::now()) {
            return Err(ViewError::TooOld);
        }
    }
    Ok(created)
}

pub(crate) fn gate(allowed: bool) -> Result<(), ViewError> {
    if allowed {
        Ok(())
    } else {
        Err(ViewError::PermissionDenied)
    }
}
