use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A timestamp as reported by the upstream API.
///
/// The 2010 REST API uses RFC 2822 dates, the monitor v1 API uses RFC 3339.
/// Missing, empty or unparseable values decode to an unset timestamp rather
/// than failing the whole page; views decide what an unset value means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamp(Option<DateTime<Utc>>);

impl Timestamp {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Some(at))
    }

    pub fn unset() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .map(|t| Self(Some(t.with_timezone(&Utc))))
            .unwrap_or_default()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::new(at)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(at) => serializer.serialize_str(&at.to_rfc2822()),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Timestamp::parse).unwrap_or_default())
    }
}

/// Upstream sends `null` for fields it has no value for; those read as the
/// type's default instead of failing the whole page.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Counts and durations arrive as strings ("15"), numbers or null.
mod lenient_u32 {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Signed(i64),
        Float(f64),
        Text(String),
    }

    pub fn serialize<S>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Num(n)) => u32::try_from(n).ok(),
            Some(Raw::Signed(_)) | Some(Raw::Float(_)) => None,
            Some(Raw::Text(s)) => s.trim().parse().ok(),
            None => None,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(deserialize_with = "null_as_default")]
    pub sid: String,
    pub date_created: Timestamp,
    #[serde(deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(deserialize_with = "null_as_default")]
    pub to: String,
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub direction: String,
    #[serde(with = "lenient_u32")]
    pub num_media: Option<u32>,
    #[serde(with = "lenient_u32")]
    pub num_segments: Option<u32>,
    pub price: Option<String>,
    pub price_unit: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Call {
    #[serde(deserialize_with = "null_as_default")]
    pub sid: String,
    pub date_created: Timestamp,
    #[serde(deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(deserialize_with = "null_as_default")]
    pub to: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub direction: String,
    #[serde(with = "lenient_u32")]
    pub duration: Option<u32>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub price: Option<String>,
    pub price_unit: Option<String>,
    pub parent_call_sid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Conference {
    #[serde(deserialize_with = "null_as_default")]
    pub sid: String,
    pub date_created: Timestamp,
    pub date_updated: Timestamp,
    #[serde(deserialize_with = "null_as_default")]
    pub friendly_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub region: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Alert {
    #[serde(deserialize_with = "null_as_default")]
    pub sid: String,
    pub date_created: Timestamp,
    #[serde(deserialize_with = "null_as_default")]
    pub error_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub log_level: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alert_text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub more_info: String,
    #[serde(deserialize_with = "null_as_default")]
    pub request_method: String,
    #[serde(deserialize_with = "null_as_default")]
    pub request_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub request_variables: String,
    #[serde(deserialize_with = "null_as_default")]
    pub resource_sid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub response_body: String,
    #[serde(deserialize_with = "null_as_default")]
    pub response_headers: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Recording {
    #[serde(deserialize_with = "null_as_default")]
    pub sid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub call_sid: String,
    pub date_created: Timestamp,
    #[serde(with = "lenient_u32")]
    pub duration: Option<u32>,
    pub price: Option<String>,
    pub price_unit: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    /// API resource path, e.g. `/2010-04-01/Accounts/AC../Recordings/RE...json`.
    #[serde(deserialize_with = "null_as_default")]
    pub uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NumberCapabilities {
    #[serde(deserialize_with = "null_as_default")]
    pub voice: bool,
    #[serde(rename = "SMS", alias = "sms")]
    #[serde(deserialize_with = "null_as_default")]
    pub sms: bool,
    #[serde(rename = "MMS", alias = "mms")]
    #[serde(deserialize_with = "null_as_default")]
    pub mms: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomingNumber {
    #[serde(deserialize_with = "null_as_default")]
    pub sid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phone_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub friendly_name: String,
    pub date_created: Timestamp,
    #[serde(deserialize_with = "null_as_default")]
    pub voice_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sms_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status_callback: String,
    pub capabilities: NumberCapabilities,
}

/// A page of raw records together with the upstream continuation link.
pub trait RecordPage {
    type Record;

    /// Splits the page into its records and a path-only continuation URI.
    fn into_parts(self) -> (Vec<Self::Record>, Option<String>);
}

fn non_empty(uri: Option<String>) -> Option<String> {
    uri.filter(|u| !u.trim().is_empty())
}

macro_rules! record_page {
    ($page:ident, $record:ty, $field:ident) => {
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $page {
            pub $field: Vec<$record>,
            pub next_page_uri: Option<String>,
        }

        impl RecordPage for $page {
            type Record = $record;

            fn into_parts(self) -> (Vec<$record>, Option<String>) {
                (self.$field, non_empty(self.next_page_uri))
            }
        }
    };
}

record_page!(MessagePage, Message, messages);
record_page!(CallPage, Call, calls);
record_page!(ConferencePage, Conference, conferences);
record_page!(RecordingPage, Recording, recordings);
record_page!(IncomingNumberPage, IncomingNumber, incoming_phone_numbers);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    pub next_page_url: Option<String>,
}

/// Alerts come from the v1 monitor API, which links to the next page with an
/// absolute URL inside `meta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPage {
    pub alerts: Vec<Alert>,
    pub meta: PageMeta,
}

impl RecordPage for AlertPage {
    type Record = Alert;

    fn into_parts(self) -> (Vec<Alert>, Option<String>) {
        let next = non_empty(self.meta.next_page_url).and_then(|u| path_and_query(&u));
        (self.alerts, next)
    }
}

/// Strips scheme and host from an absolute URL, keeping path and query.
/// Relative references are returned unchanged when they start with `/`.
pub fn path_and_query(link: &str) -> Option<String> {
    if link.starts_with('/') && !link.starts_with("//") {
        return Some(link.to_string());
    }
    let parsed = url::Url::parse(link).ok()?;
    let mut out = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        out.push('?');
        out.push_str(query);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_formats() {
        let rfc2822: Timestamp = serde_json::from_str("\"Wed, 18 Aug 2010 20:01:40 +0000\"").unwrap();
        let expected = Utc.with_ymd_and_hms(2010, 8, 18, 20, 1, 40).unwrap();
        assert_eq!(rfc2822.get(), Some(expected));

        let rfc3339: Timestamp = serde_json::from_str("\"2010-08-18T20:01:40Z\"").unwrap();
        assert_eq!(rfc3339.get(), Some(expected));

        let empty: Timestamp = serde_json::from_str("\"\"").unwrap();
        assert_eq!(empty.get(), None);
        let null: Timestamp = serde_json::from_str("null").unwrap();
        assert_eq!(null.get(), None);
        let junk: Timestamp = serde_json::from_str("\"yesterday\"").unwrap();
        assert_eq!(junk.get(), None);
    }

    #[test]
    fn test_message_page_decodes_upstream_shape() {
        let body = r#"{
            "messages": [{
                "sid": "SM00000000000000000000000000000001",
                "date_created": "Wed, 18 Aug 2010 20:01:40 +0000",
                "from": "+14105551234",
                "to": "+14105556789",
                "body": "hello",
                "num_media": "2",
                "num_segments": 1,
                "price": null,
                "error_code": null
            }],
            "next_page_uri": "/2010-04-01/Accounts/AC1/Messages.json?PageToken=PA1&Page=1"
        }"#;
        let page: MessagePage = serde_json::from_str(body).unwrap();
        let (records, next) = page.into_parts();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].num_media, Some(2));
        assert_eq!(records[0].num_segments, Some(1));
        assert!(records[0].price.is_none());
        assert_eq!(
            next.as_deref(),
            Some("/2010-04-01/Accounts/AC1/Messages.json?PageToken=PA1&Page=1")
        );
    }

    #[test]
    fn test_empty_next_page_is_none() {
        let page: CallPage = serde_json::from_str(r#"{"calls": [], "next_page_uri": ""}"#).unwrap();
        assert_eq!(page.into_parts().1, None);
    }

    #[test]
    fn test_alert_page_next_link_is_path_only() {
        let body = r#"{
            "alerts": [],
            "meta": {"next_page_url": "https://monitor.twilio.com/v1/Alerts?PageSize=50&Page=1&PageToken=PA2"}
        }"#;
        let page: AlertPage = serde_json::from_str(body).unwrap();
        assert_eq!(
            page.into_parts().1.as_deref(),
            Some("/v1/Alerts?PageSize=50&Page=1&PageToken=PA2")
        );
    }

    #[test]
    fn test_number_capabilities_casing() {
        let n: IncomingNumber = serde_json::from_str(
            r#"{"sid": "PN1", "capabilities": {"voice": true, "SMS": true, "MMS": false}}"#,
        )
        .unwrap();
        assert!(n.capabilities.voice && n.capabilities.sms && !n.capabilities.mms);
    }

    #[test]
    fn test_nulls_and_negative_counts_do_not_fail_the_page() {
        let alerts = r#"{
            "alerts": [{
                "sid": "NO00000000000000000000000000000001",
                "date_created": "2010-08-18T20:01:40Z",
                "error_code": "11200",
                "more_info": null,
                "request_url": "https://example.com/hook",
                "request_variables": null,
                "response_body": null,
                "response_headers": null
            }],
            "meta": { "next_page_url": null }
        }"#;
        let page: AlertPage = serde_json::from_str(alerts).unwrap();
        let (records, next) = page.into_parts();
        assert_eq!(records[0].response_body, "");
        assert_eq!(records[0].more_info, "");
        assert_eq!(records[0].request_url, "https://example.com/hook");
        assert!(next.is_none());

        let messages = r#"{
            "messages": [{
                "sid": "SM00000000000000000000000000000001",
                "date_created": "Wed, 18 Aug 2010 20:01:40 +0000",
                "from": "+14105551234",
                "to": null,
                "body": null,
                "num_media": -1,
                "num_segments": 1.5
            }]
        }"#;
        let page: MessagePage = serde_json::from_str(messages).unwrap();
        let (records, _) = page.into_parts();
        assert_eq!(records[0].to, "");
        assert_eq!(records[0].num_media, None);
        assert_eq!(records[0].num_segments, None);

        let numbers = r#"{
            "incoming_phone_numbers": [{
                "sid": "PN00000000000000000000000000000001",
                "status_callback": null,
                "capabilities": { "voice": null, "SMS": true }
            }]
        }"#;
        let page: IncomingNumberPage = serde_json::from_str(numbers).unwrap();
        let (records, _) = page.into_parts();
        assert_eq!(records[0].status_callback, "");
        assert!(!records[0].capabilities.voice);
        assert!(records[0].capabilities.sms);
    }
}
