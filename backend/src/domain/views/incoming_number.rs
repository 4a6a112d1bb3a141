use chrono::{DateTime, Utc};
use shared::records;

use super::{check_created, gate, FieldTable, FieldValue, View, ViewError};
use crate::domain::entities::User;
use crate::domain::value_objects::Permission;

/// A phone number owned by the account. Numbers are configuration rather
/// than log entries, so the resource age window does not apply.
#[derive(Debug, Clone)]
pub struct IncomingNumber {
    raw: records::IncomingNumber,
    created: DateTime<Utc>,
    user: User,
}

impl IncomingNumber {
    pub fn sid(&self) -> Result<&str, ViewError> {
        self.guard("sid")?;
        Ok(&self.raw.sid)
    }

    pub fn date_created(&self) -> Result<DateTime<Utc>, ViewError> {
        self.guard("date_created")?;
        Ok(self.created)
    }

    pub fn phone_number(&self) -> Result<&str, ViewError> {
        self.guard("phone_number")?;
        Ok(&self.raw.phone_number)
    }

    pub fn friendly_name(&self) -> Result<&str, ViewError> {
        self.guard("friendly_name")?;
        Ok(&self.raw.friendly_name)
    }

    pub fn voice_capable(&self) -> Result<bool, ViewError> {
        self.guard("voice_capable")?;
        Ok(self.raw.capabilities.voice)
    }

    pub fn sms_capable(&self) -> Result<bool, ViewError> {
        self.guard("sms_capable")?;
        Ok(self.raw.capabilities.sms)
    }

    pub fn mms_capable(&self) -> Result<bool, ViewError> {
        self.guard("mms_capable")?;
        Ok(self.raw.capabilities.mms)
    }

    pub fn voice_url(&self) -> Result<&str, ViewError> {
        self.guard("voice_url")?;
        Ok(&self.raw.voice_url)
    }

    pub fn sms_url(&self) -> Result<&str, ViewError> {
        self.guard("sms_url")?;
        Ok(&self.raw.sms_url)
    }

    pub fn status_callback(&self) -> Result<&str, ViewError> {
        self.guard("status_callback")?;
        Ok(&self.raw.status_callback)
    }
}

static FIELDS: FieldTable<IncomingNumber> = &[
    ("sid", |n| n.sid().map(FieldValue::from)),
    ("date_created", |n| n.date_created().map(FieldValue::from)),
    ("phone_number", |n| n.phone_number().map(FieldValue::from)),
    ("friendly_name", |n| n.friendly_name().map(FieldValue::from)),
    ("voice_capable", |n| n.voice_capable().map(FieldValue::from)),
    ("sms_capable", |n| n.sms_capable().map(FieldValue::from)),
    ("mms_capable", |n| n.mms_capable().map(FieldValue::from)),
    ("voice_url", |n| n.voice_url().map(FieldValue::from)),
    ("sms_url", |n| n.sms_url().map(FieldValue::from)),
    ("status_callback", |n| n.status_callback().map(FieldValue::from)),
];

impl View for IncomingNumber {
    type Raw = records::IncomingNumber;

    fn new(raw: records::IncomingNumber, _permission: &Permission, user: &User) -> Result<Self, ViewError> {
        let created = check_created(&raw.sid, &raw.date_created, None)?;
        gate(user.can_view_phone_numbers())?;
        Ok(Self {
            raw,
            created,
            user: *user,
        })
    }

    fn can_view_property(&self, name: &str) -> bool {
        match name {
            "sid" | "date_created" | "phone_number" | "friendly_name" | "voice_capable"
            | "sms_capable" | "mms_capable" => self.user.can_view_phone_numbers(),
            "voice_url" | "sms_url" | "status_callback" => self.user.can_view_number_callbacks(),
            _ => panic!("unknown phone number property {name:?}"),
        }
    }

    fn fields() -> FieldTable<Self> {
        FIELDS
    }
}
