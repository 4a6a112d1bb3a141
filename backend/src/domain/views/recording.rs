use chrono::{DateTime, Utc};
use shared::records;

use super::{check_created, gate, FieldTable, FieldValue, View, ViewError};
use crate::domain::entities::User;
use crate::domain::value_objects::Permission;

#[derive(Debug, Clone)]
pub struct Recording {
    raw: records::Recording,
    created: DateTime<Utc>,
    user: User,
}

impl Recording {
    pub fn sid(&self) -> Result<&str, ViewError> {
        self.guard("sid")?;
        Ok(&self.raw.sid)
    }

    pub fn call_sid(&self) -> Result<&str, ViewError> {
        self.guard("call_sid")?;
        Ok(&self.raw.call_sid)
    }

    pub fn date_created(&self) -> Result<DateTime<Utc>, ViewError> {
        self.guard("date_created")?;
        Ok(self.created)
    }

    pub fn duration(&self) -> Result<Option<u32>, ViewError> {
        self.guard("duration")?;
        Ok(self.raw.duration)
    }

    pub fn status(&self) -> Result<&str, ViewError> {
        self.guard("status")?;
        Ok(&self.raw.status)
    }

    pub fn price(&self) -> Result<Option<&str>, ViewError> {
        self.guard("price")?;
        Ok(self.raw.price.as_deref())
    }

    pub fn price_unit(&self) -> Result<Option<&str>, ViewError> {
        self.guard("price_unit")?;
        Ok(self.raw.price_unit.as_deref())
    }

    /// Path of the playable audio. The API lists recordings by their JSON
    /// resource URI; the same path with an `.mp3` suffix serves the audio.
    pub fn media_url(&self) -> Result<String, ViewError> {
        self.guard("media_url")?;
        let uri = &self.raw.uri;
        Ok(match uri.strip_suffix(".json") {
            Some(stem) => format!("{stem}.mp3"),
            None => uri.clone(),
        })
    }

    pub fn can_play(&self) -> bool {
        self.user.can_play_recordings()
    }
}

static FIELDS: FieldTable<Recording> = &[
    ("sid", |r| r.sid().map(FieldValue::from)),
    ("call_sid", |r| r.call_sid().map(FieldValue::from)),
    ("date_created", |r| r.date_created().map(FieldValue::from)),
    ("duration", |r| r.duration().map(FieldValue::from)),
    ("status", |r| r.status().map(FieldValue::from)),
    ("price", |r| r.price().map(FieldValue::from)),
    ("price_unit", |r| r.price_unit().map(FieldValue::from)),
    ("media_url", |r| r.media_url().map(FieldValue::Text)),
    ("can_play", |r| Ok(r.can_play().into())),
];

impl View for Recording {
    type Raw = records::Recording;

    fn new(raw: records::Recording, permission: &Permission, user: &User) -> Result<Self, ViewError> {
        let created = check_created(&raw.sid, &raw.date_created, Some(permission))?;
        gate(user.can_view_num_recordings())?;
        Ok(Self {
            raw,
            created,
            user: *user,
        })
    }

    fn can_view_property(&self, name: &str) -> bool {
        match name {
            "sid" | "call_sid" | "date_created" | "duration" | "status" | "can_play" => {
                self.user.can_view_num_recordings()
            }
            "price" | "price_unit" => self.user.can_view_recording_price(),
            "media_url" => self.user.can_play_recordings(),
            _ => panic!("unknown recording property {name:?}"),
        }
    }

    fn fields() -> FieldTable<Self> {
        FIELDS
    }
}
