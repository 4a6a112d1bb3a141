use chrono::{DateTime, Duration, TimeZone, Utc};

/// Founding date of the upstream provider (2008-04-01T00:00:00Z). Nothing in
/// its logs can be older.
const PROVIDER_FOUNDED_UNIX: i64 = 1_207_008_000;

/// Resource age policy shared by every view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    max_resource_age: Duration,
}

impl Permission {
    pub fn new(max_resource_age: Duration) -> Self {
        Self { max_resource_age }
    }

    /// Allows every record the provider could have produced.
    pub fn all_history() -> Self {
        let founded = Utc
            .timestamp_opt(PROVIDER_FOUNDED_UNIX, 0)
            .single()
            .unwrap_or_default();
        Self::new(Utc::now().signed_duration_since(founded))
    }

    pub fn max_resource_age(&self) -> Duration {
        self.max_resource_age
    }

    /// True if a record created at `created` is still within the window.
    pub fn allows(&self, created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(created) <= self.max_resource_age
    }
}
