use chrono::{DateTime, Utc};
use shared::records;

use super::{check_created, gate, FieldTable, FieldValue, View, ViewError};
use crate::domain::entities::User;
use crate::domain::value_objects::Permission;

/// A debugger alert raised by the provider, typically a failed webhook.
///
/// The request URL is the customer's webhook and counts as a callback URL;
/// the request and response payloads are gated together with headers since
/// they routinely echo them.
#[derive(Debug, Clone)]
pub struct Alert {
    raw: records::Alert,
    created: DateTime<Utc>,
    user: User,
}

impl Alert {
    pub fn sid(&self) -> Result<&str, ViewError> {
        self.guard("sid")?;
        Ok(&self.raw.sid)
    }

    pub fn date_created(&self) -> Result<DateTime<Utc>, ViewError> {
        self.guard("date_created")?;
        Ok(self.created)
    }

    pub fn error_code(&self) -> Result<&str, ViewError> {
        self.guard("error_code")?;
        Ok(&self.raw.error_code)
    }

    pub fn log_level(&self) -> Result<&str, ViewError> {
        self.guard("log_level")?;
        Ok(&self.raw.log_level)
    }

    pub fn alert_text(&self) -> Result<&str, ViewError> {
        self.guard("alert_text")?;
        Ok(&self.raw.alert_text)
    }

    pub fn more_info(&self) -> Result<&str, ViewError> {
        self.guard("more_info")?;
        Ok(&self.raw.more_info)
    }

    pub fn request_method(&self) -> Result<&str, ViewError> {
        self.guard("request_method")?;
        Ok(&self.raw.request_method)
    }

    pub fn request_url(&self) -> Result<&str, ViewError> {
        self.guard("request_url")?;
        Ok(&self.raw.request_url)
    }

    pub fn request_variables(&self) -> Result<&str, ViewError> {
        self.guard("request_variables")?;
        Ok(&self.raw.request_variables)
    }

    pub fn resource_sid(&self) -> Result<&str, ViewError> {
        self.guard("resource_sid")?;
        Ok(&self.raw.resource_sid)
    }

    pub fn response_body(&self) -> Result<&str, ViewError> {
        self.guard("response_body")?;
        Ok(&self.raw.response_body)
    }

    pub fn response_headers(&self) -> Result<&str, ViewError> {
        self.guard("response_headers")?;
        Ok(&self.raw.response_headers)
    }
}

static FIELDS: FieldTable<Alert> = &[
    ("sid", |a| a.sid().map(FieldValue::from)),
    ("date_created", |a| a.date_created().map(FieldValue::from)),
    ("error_code", |a| a.error_code().map(FieldValue::from)),
    ("log_level", |a| a.log_level().map(FieldValue::from)),
    ("alert_text", |a| a.alert_text().map(FieldValue::from)),
    ("more_info", |a| a.more_info().map(FieldValue::from)),
    ("request_method", |a| a.request_method().map(FieldValue::from)),
    ("request_url", |a| a.request_url().map(FieldValue::from)),
    ("request_variables", |a| a.request_variables().map(FieldValue::from)),
    ("resource_sid", |a| a.resource_sid().map(FieldValue::from)),
    ("response_body", |a| a.response_body().map(FieldValue::from)),
    ("response_headers", |a| a.response_headers().map(FieldValue::from)),
];

impl View for Alert {
    type Raw = records::Alert;

    fn new(raw: records::Alert, permission: &Permission, user: &User) -> Result<Self, ViewError> {
        let created = check_created(&raw.sid, &raw.date_created, Some(permission))?;
        gate(user.can_view_alerts())?;
        Ok(Self {
            raw,
            created,
            user: *user,
        })
    }

    fn can_view_property(&self, name: &str) -> bool {
        match name {
            "sid" | "date_created" | "error_code" | "log_level" | "alert_text" | "more_info"
            | "request_method" | "resource_sid" => self.user.can_view_alerts(),
            "request_url" => self.user.can_view_alerts() && self.user.can_view_callback_urls(),
            "request_variables" | "response_body" | "response_headers" => {
                self.user.can_view_response_headers()
            }
            _ => panic!("unknown alert property {name:?}"),
        }
    }

    fn fields() -> FieldTable<Self> {
        FIELDS
    }
}
