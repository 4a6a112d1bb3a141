use super::{Alert, Call, Conference, IncomingNumber, Message, Recording, View, ViewError};
use crate::domain::entities::User;
use crate::domain::value_objects::Permission;

/// The visible part of one upstream page.
///
/// An empty page with a next link means everything on it was filtered; keep
/// fetching. An empty page without one means there is nothing more.
#[derive(Debug, Clone)]
pub struct Page<V> {
    items: Vec<V>,
    next_page_uri: Option<String>,
}

pub type MessagePage = Page<Message>;
pub type CallPage = Page<Call>;
pub type ConferencePage = Page<Conference>;
pub type AlertPage = Page<Alert>;
pub type RecordingPage = Page<Recording>;
pub type IncomingNumberPage = Page<IncomingNumber>;

impl<V: View> Page<V> {
    pub fn from_raw(
        records: Vec<V::Raw>,
        next_page_uri: Option<String>,
        permission: &Permission,
        user: &User,
    ) -> Result<Self, ViewError> {
        let mut items = Vec::with_capacity(records.len());
        for raw in records {
            match V::new(raw, permission, user) {
                Ok(view) => items.push(view),
                Err(e) if e.is_hidden() => continue,
                Err(e) => return Err(e),
            }
        }
        let next_page_uri = if items.is_empty() { None } else { next_page_uri };
        Ok(Self {
            items,
            next_page_uri,
        })
    }
}

impl<V> Page<V> {
    pub fn items(&self) -> &[V] {
        &self.items
    }

    pub fn next_page_uri(&self) -> Option<&str> {
        self.next_page_uri.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
