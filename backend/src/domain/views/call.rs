use chrono::{DateTime, Utc};
use shared::records;

use super::{check_created, gate, FieldTable, FieldValue, View, ViewError};
use crate::domain::entities::User;
use crate::domain::value_objects::Permission;

#[derive(Debug, Clone)]
pub struct Call {
    raw: records::Call,
    created: DateTime<Utc>,
    user: User,
}

impl Call {
    pub fn sid(&self) -> Result<&str, ViewError> {
        self.guard("sid")?;
        Ok(&self.raw.sid)
    }

    pub fn date_created(&self) -> Result<DateTime<Utc>, ViewError> {
        self.guard("date_created")?;
        Ok(self.created)
    }

    pub fn from(&self) -> Result<&str, ViewError> {
        self.guard("from")?;
        Ok(&self.raw.from)
    }

    pub fn to(&self) -> Result<&str, ViewError> {
        self.guard("to")?;
        Ok(&self.raw.to)
    }

    pub fn status(&self) -> Result<&str, ViewError> {
        self.guard("status")?;
        Ok(&self.raw.status)
    }

    pub fn direction(&self) -> Result<&str, ViewError> {
        self.guard("direction")?;
        Ok(&self.raw.direction)
    }

    pub fn duration(&self) -> Result<Option<u32>, ViewError> {
        self.guard("duration")?;
        Ok(self.raw.duration)
    }

    pub fn start_time(&self) -> Result<Option<DateTime<Utc>>, ViewError> {
        self.guard("start_time")?;
        Ok(self.raw.start_time.get())
    }

    pub fn end_time(&self) -> Result<Option<DateTime<Utc>>, ViewError> {
        self.guard("end_time")?;
        Ok(self.raw.end_time.get())
    }

    pub fn price(&self) -> Result<Option<&str>, ViewError> {
        self.guard("price")?;
        Ok(self.raw.price.as_deref())
    }

    pub fn price_unit(&self) -> Result<Option<&str>, ViewError> {
        self.guard("price_unit")?;
        Ok(self.raw.price_unit.as_deref())
    }

    pub fn parent_call_sid(&self) -> Result<Option<&str>, ViewError> {
        self.guard("parent_call_sid")?;
        Ok(self.raw.parent_call_sid.as_deref())
    }

    pub fn can_view_num_recordings(&self) -> bool {
        self.user.can_view_num_recordings()
    }

    /// Whether a play button may be shown for this call's recordings.
    pub fn can_play_recording(&self) -> bool {
        self.user.can_play_recordings()
    }
}

static FIELDS: FieldTable<Call> = &[
    ("sid", |c| c.sid().map(FieldValue::from)),
    ("date_created", |c| c.date_created().map(FieldValue::from)),
    ("from", |c| c.from().map(FieldValue::from)),
    ("to", |c| c.to().map(FieldValue::from)),
    ("status", |c| c.status().map(FieldValue::from)),
    ("direction", |c| c.direction().map(FieldValue::from)),
    ("duration", |c| c.duration().map(FieldValue::from)),
    ("start_time", |c| c.start_time().map(FieldValue::from)),
    ("end_time", |c| c.end_time().map(FieldValue::from)),
    ("price", |c| c.price().map(FieldValue::from)),
    ("price_unit", |c| c.price_unit().map(FieldValue::from)),
    ("parent_call_sid", |c| c.parent_call_sid().map(FieldValue::from)),
    ("can_view_num_recordings", |c| Ok(c.can_view_num_recordings().into())),
    ("can_play_recording", |c| Ok(c.can_play_recording().into())),
];

impl View for Call {
    type Raw = records::Call;

    fn new(raw: records::Call, permission: &Permission, user: &User) -> Result<Self, ViewError> {
        let created = check_created(&raw.sid, &raw.date_created, Some(permission))?;
        gate(user.can_view_calls())?;
        Ok(Self {
            raw,
            created,
            user: *user,
        })
    }

    fn can_view_property(&self, name: &str) -> bool {
        match name {
            "sid" | "date_created" | "status" | "direction" | "duration" | "start_time"
            | "end_time" | "parent_call_sid" | "can_view_num_recordings" | "can_play_recording" => {
                self.user.can_view_calls()
            }
            "from" => self.user.can_view_call_from(),
            "to" => self.user.can_view_call_to(),
            "price" | "price_unit" => self.user.can_view_call_price(),
            _ => panic!("unknown call property {name:?}"),
        }
    }

    fn fields() -> FieldTable<Self> {
        FIELDS
    }
}
