use chrono::{DateTime, Utc};
use shared::records;

use super::{check_created, gate, FieldTable, FieldValue, View, ViewError};
use crate::domain::entities::User;
use crate::domain::value_objects::Permission;

#[derive(Debug, Clone)]
pub struct Message {
    raw: records::Message,
    created: DateTime<Utc>,
    user: User,
}

impl Message {
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

    pub fn body(&self) -> Result<&str, ViewError> {
        self.guard("body")?;
        Ok(&self.raw.body)
    }

    pub fn status(&self) -> Result<&str, ViewError> {
        self.guard("status")?;
        Ok(&self.raw.status)
    }

    pub fn direction(&self) -> Result<&str, ViewError> {
        self.guard("direction")?;
        Ok(&self.raw.direction)
    }

    pub fn num_media(&self) -> Result<Option<u32>, ViewError> {
        self.guard("num_media")?;
        Ok(self.raw.num_media)
    }

    pub fn num_segments(&self) -> Result<Option<u32>, ViewError> {
        self.guard("num_segments")?;
        Ok(self.raw.num_segments)
    }

    pub fn price(&self) -> Result<Option<&str>, ViewError> {
        self.guard("price")?;
        Ok(self.raw.price.as_deref())
    }

    pub fn price_unit(&self) -> Result<Option<&str>, ViewError> {
        self.guard("price_unit")?;
        Ok(self.raw.price_unit.as_deref())
    }

    pub fn error_code(&self) -> Result<Option<i64>, ViewError> {
        self.guard("error_code")?;
        Ok(self.raw.error_code)
    }

    /// Whether media attachments may be shown for this message.
    pub fn can_view_media(&self) -> bool {
        self.user.can_view_media()
    }
}

static FIELDS: FieldTable<Message> = &[
    ("sid", |m| m.sid().map(FieldValue::from)),
    ("date_created", |m| m.date_created().map(FieldValue::from)),
    ("from", |m| m.from().map(FieldValue::from)),
    ("to", |m| m.to().map(FieldValue::from)),
    ("body", |m| m.body().map(FieldValue::from)),
    ("status", |m| m.status().map(FieldValue::from)),
    ("direction", |m| m.direction().map(FieldValue::from)),
    ("num_media", |m| m.num_media().map(FieldValue::from)),
    ("num_segments", |m| m.num_segments().map(FieldValue::from)),
    ("price", |m| m.price().map(FieldValue::from)),
    ("price_unit", |m| m.price_unit().map(FieldValue::from)),
    ("error_code", |m| m.error_code().map(FieldValue::from)),
    ("can_view_media", |m| Ok(m.can_view_media().into())),
];

impl View for Message {
    type Raw = records::Message;

    fn new(raw: records::Message, permission: &Permission, user: &User) -> Result<Self, ViewError> {
        let created = check_created(&raw.sid, &raw.date_created, Some(permission))?;
        gate(user.can_view_messages())?;
        Ok(Self {
            raw,
            created,
            user: *user,
        })
    }

    fn can_view_property(&self, name: &str) -> bool {
        match name {
            "sid" | "date_created" | "status" | "direction" | "num_segments" | "error_code"
            | "can_view_media" => {
                self.user.can_view_messages()
            }
            "from" => self.user.can_view_message_from(),
            "to" => self.user.can_view_message_to(),
            "body" => self.user.can_view_message_body(),
            "price" | "price_unit" => self.user.can_view_message_price(),
            "num_media" => self.user.can_view_num_media(),
            _ => panic!("unknown message property {name:?}"),
        }
    }

    fn fields() -> FieldTable<Self> {
        FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::UserSettings;
    use crate::domain::views::fixtures;
    use chrono::Duration;

    #[test]
    fn test_accessors_respect_capabilities() {
        let user = User::new(Some(UserSettings {
            can_view_message_body: false,
            can_view_message_to: false,
            ..UserSettings::default()
        }));
        let m = Message::new(fixtures::message("SM1", Duration::minutes(5)), &Permission::all_history(), &user)
            .unwrap();

        assert_eq!(m.from().unwrap(), "+14105551234");
        assert_eq!(m.body().unwrap_err(), ViewError::PermissionDenied);
        assert_eq!(m.to().unwrap_err(), ViewError::PermissionDenied);
        assert_eq!(m.price().unwrap(), Some("-0.00750"));
        assert!(m.can_view_media());

        let no_media = User::new(Some(UserSettings {
            can_view_media: false,
            ..UserSettings::default()
        }));
        let m = Message::new(fixtures::message("SM1", Duration::minutes(5)), &Permission::all_history(), &no_media)
            .unwrap();
        let json = crate::domain::views::to_json(&m).unwrap();
        assert_eq!(json["can_view_media"], false);
        assert_eq!(json["num_media"], 1);
    }

    #[test]
    fn test_too_old_regardless_of_user() {
        let permission = Permission::new(Duration::hours(1));
        for user in [User::unrestricted(), User::new(None)] {
            let err = Message::new(fixtures::message("SM1", Duration::hours(2)), &permission, &user)
                .unwrap_err();
            assert_eq!(err, ViewError::TooOld);
        }
    }

    #[test]
    fn test_missing_created_at_is_data_error() {
        let mut raw = fixtures::message("SM1", Duration::minutes(1));
        raw.date_created = shared::Timestamp::unset();
        let err = Message::new(raw, &Permission::all_history(), &User::unrestricted()).unwrap_err();
        assert_eq!(err, ViewError::InvalidCreatedAt { sid: "SM1".to_string() });
    }

    #[test]
    fn test_coarse_gate_denies_construction() {
        let user = User::new(Some(UserSettings {
            can_view_messages: false,
            ..UserSettings::default()
        }));
        let err = Message::new(fixtures::message("SM1", Duration::minutes(1)), &Permission::all_history(), &user)
            .unwrap_err();
        assert_eq!(err, ViewError::PermissionDenied);
    }

    #[test]
    #[should_panic(expected = "unknown message property")]
    fn test_unknown_property_panics() {
        let m = Message::new(
            fixtures::message("SM1", Duration::minutes(1)),
            &Permission::all_history(),
            &User::unrestricted(),
        )
        .unwrap();
        m.can_view_property("media_urls");
    }

    #[test]
    fn test_every_table_entry_is_a_known_property() {
        let m = Message::new(
            fixtures::message("SM1", Duration::minutes(1)),
            &Permission::all_history(),
            &User::unrestricted(),
        )
        .unwrap();
        for (name, _) in Message::fields() {
            assert!(m.can_view_property(name));
        }
    }
}
