use chrono::{DateTime, Utc};
use shared::records;

use super::{check_created, gate, FieldTable, FieldValue, View, ViewError};
use crate::domain::entities::User;
use crate::domain::value_objects::Permission;

#[derive(Debug, Clone)]
pub struct Conference {
    raw: records::Conference,
    created: DateTime<Utc>,
    user: User,
}

impl Conference {
    pub fn sid(&self) -> Result<&str, ViewError> {
        self.guard("sid")?;
        Ok(&self.raw.sid)
    }

    pub fn date_created(&self) -> Result<DateTime<Utc>, ViewError> {
        self.guard("date_created")?;
        Ok(self.created)
    }

    pub fn date_updated(&self) -> Result<Option<DateTime<Utc>>, ViewError> {
        self.guard("date_updated")?;
        Ok(self.raw.date_updated.get())
    }

    pub fn friendly_name(&self) -> Result<&str, ViewError> {
        self.guard("friendly_name")?;
        Ok(&self.raw.friendly_name)
    }

    pub fn status(&self) -> Result<&str, ViewError> {
        self.guard("status")?;
        Ok(&self.raw.status)
    }

    pub fn region(&self) -> Result<&str, ViewError> {
        self.guard("region")?;
        Ok(&self.raw.region)
    }
}

static FIELDS: FieldTable<Conference> = &[
    ("sid", |c| c.sid().map(FieldValue::from)),
    ("date_created", |c| c.date_created().map(FieldValue::from)),
    ("date_updated", |c| c.date_updated().map(FieldValue::from)),
    ("friendly_name", |c| c.friendly_name().map(FieldValue::from)),
    ("status", |c| c.status().map(FieldValue::from)),
    ("region", |c| c.region().map(FieldValue::from)),
];

impl View for Conference {
    type Raw = records::Conference;

    fn new(raw: records::Conference, permission: &Permission, user: &User) -> Result<Self, ViewError> {
        let created = check_created(&raw.sid, &raw.date_created, Some(permission))?;
        gate(user.can_view_conferences())?;
        Ok(Self {
            raw,
            created,
            user: *user,
        })
    }

    fn can_view_property(&self, name: &str) -> bool {
        match name {
            "sid" | "date_created" | "date_updated" | "status" | "region" => {
                self.user.can_view_conferences()
            }
            "friendly_name" => self.user.can_view_conference_name(),
            _ => panic!("unknown conference property {name:?}"),
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
    use crate::domain::views::{fixtures, to_json};
    use chrono::Duration;

    fn raw(age: Duration) -> records::Conference {
        records::Conference {
            sid: "CF1".to_string(),
            date_created: fixtures::ago(age),
            date_updated: fixtures::ago(age),
            friendly_name: "weekly-standup".to_string(),
            status: "completed".to_string(),
            region: "us1".to_string(),
        }
    }

    #[test]
    fn test_friendly_name_redacted() {
        let user = User::new(Some(UserSettings {
            can_view_conference_name: false,
            ..UserSettings::default()
        }));
        let conf = Conference::new(raw(Duration::minutes(1)), &Permission::all_history(), &user).unwrap();

        assert_eq!(conf.friendly_name().unwrap_err(), ViewError::PermissionDenied);
        assert_eq!(conf.region().unwrap(), "us1");
        let json = to_json(&conf).unwrap();
        assert!(json["friendly_name"].is_null());
        assert_eq!(json["status"], "completed");
    }

    #[test]
    fn test_name_flag_needs_gate() {
        let user = User::new(Some(UserSettings {
            can_view_conferences: false,
            ..UserSettings::default()
        }));
        let err = Conference::new(raw(Duration::minutes(1)), &Permission::all_history(), &user).unwrap_err();
        assert_eq!(err, ViewError::PermissionDenied);
    }

    #[test]
    fn test_too_old() {
        let err = Conference::new(
            raw(Duration::days(3)),
            &Permission::new(Duration::days(2)),
            &User::unrestricted(),
        )
        .unwrap_err();
        assert_eq!(err, ViewError::TooOld);
    }
}
