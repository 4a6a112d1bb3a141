use serde::{Deserialize, Serialize};

macro_rules! user_settings {
    ($($(#[$doc:meta])* $field:ident),+ $(,)?) => {
        /// Serializable capability set for one group of users.
        ///
        /// Omitted fields decode as `true`: a minimal config grants full access
        /// and an administrator restricts by setting fields to `false`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct UserSettings {
            $($(#[$doc])* pub $field: bool,)+
        }

        impl Default for UserSettings {
            fn default() -> Self {
                Self { $($field: true,)+ }
            }
        }

        impl UserSettings {
            /// The fully restricted set.
            pub const fn restricted() -> Self {
                Self { $($field: false,)+ }
            }
        }
    };
}

user_settings! {
    /// Coarse gate for everything message related.
    can_view_messages,
    can_view_message_from,
    can_view_message_to,
    can_view_message_body,
    can_view_message_price,
    can_view_num_media,
    /// Also needs `can_view_num_media`.
    can_view_media,
    /// Coarse gate for everything call related.
    can_view_calls,
    can_view_call_from,
    can_view_call_to,
    can_view_call_price,
    /// Gate for recordings; also needs `can_view_calls`.
    can_view_num_recordings,
    can_play_recordings,
    can_view_recording_price,
    can_view_conferences,
    can_view_conference_name,
    can_view_alerts,
    can_view_response_headers,
    can_view_phone_numbers,
    /// Webhook URLs on phone numbers and alerts.
    can_view_callback_urls,
}

/// Immutable capabilities of an authenticated identity.
///
/// Fine-grained predicates are always combined with their family's coarse
/// gate, so e.g. `can_view_message_body()` is never true while
/// `can_view_messages()` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct User {
    settings: UserSettings,
}

impl User {
    /// Builds a user from its settings; `None` yields the fully restricted user.
    pub fn new(settings: Option<UserSettings>) -> Self {
        Self {
            settings: settings.unwrap_or_else(UserSettings::restricted),
        }
    }

    /// The user every identity resolves to when no policy is configured.
    pub fn unrestricted() -> Self {
        Self::new(Some(UserSettings::default()))
    }

    pub fn can_view_messages(&self) -> bool {
        self.settings.can_view_messages
    }

    pub fn can_view_message_from(&self) -> bool {
        self.can_view_messages() && self.settings.can_view_message_from
    }

    pub fn can_view_message_to(&self) -> bool {
        self.can_view_messages() && self.settings.can_view_message_to
    }

    pub fn can_view_message_body(&self) -> bool {
        self.can_view_messages() && self.settings.can_view_message_body
    }

    pub fn can_view_message_price(&self) -> bool {
        self.can_view_messages() && self.settings.can_view_message_price
    }

    pub fn can_view_num_media(&self) -> bool {
        self.can_view_messages() && self.settings.can_view_num_media
    }

    pub fn can_view_media(&self) -> bool {
        self.can_view_num_media() && self.settings.can_view_media
    }

    pub fn can_view_calls(&self) -> bool {
        self.settings.can_view_calls
    }

    pub fn can_view_call_from(&self) -> bool {
        self.can_view_calls() && self.settings.can_view_call_from
    }

    pub fn can_view_call_to(&self) -> bool {
        self.can_view_calls() && self.settings.can_view_call_to
    }

    pub fn can_view_call_price(&self) -> bool {
        self.can_view_calls() && self.settings.can_view_call_price
    }

    pub fn can_view_num_recordings(&self) -> bool {
        self.can_view_calls() && self.settings.can_view_num_recordings
    }

    pub fn can_play_recordings(&self) -> bool {
        self.can_view_num_recordings() && self.settings.can_play_recordings
    }

    pub fn can_view_recording_price(&self) -> bool {
        self.can_view_num_recordings() && self.settings.can_view_recording_price
    }

    pub fn can_view_conferences(&self) -> bool {
        self.settings.can_view_conferences
    }

    pub fn can_view_conference_name(&self) -> bool {
        self.can_view_conferences() && self.settings.can_view_conference_name
    }

    pub fn can_view_alerts(&self) -> bool {
        self.settings.can_view_alerts
    }

    pub fn can_view_response_headers(&self) -> bool {
        self.can_view_alerts() && self.settings.can_view_response_headers
    }

    pub fn can_view_phone_numbers(&self) -> bool {
        self.settings.can_view_phone_numbers
    }

    pub fn can_view_callback_urls(&self) -> bool {
        self.settings.can_view_callback_urls
    }

    pub fn can_view_number_callbacks(&self) -> bool {
        self.can_view_phone_numbers() && self.can_view_callback_urls()
    }

    /// The effective capability set, with every derived predicate applied.
    pub fn capabilities(&self) -> UserSettings {
        UserSettings {
            can_view_messages: self.can_view_messages(),
            can_view_message_from: self.can_view_message_from(),
            can_view_message_to: self.can_view_message_to(),
            can_view_message_body: self.can_view_message_body(),
            can_view_message_price: self.can_view_message_price(),
            can_view_num_media: self.can_view_num_media(),
            can_view_media: self.can_view_media(),
            can_view_calls: self.can_view_calls(),
            can_view_call_from: self.can_view_call_from(),
            can_view_call_to: self.can_view_call_to(),
            can_view_call_price: self.can_view_call_price(),
            can_view_num_recordings: self.can_view_num_recordings(),
            can_play_recordings: self.can_play_recordings(),
            can_view_recording_price: self.can_view_recording_price(),
            can_view_conferences: self.can_view_conferences(),
            can_view_conference_name: self.can_view_conference_name(),
            can_view_alerts: self.can_view_alerts(),
            can_view_response_headers: self.can_view_response_headers(),
            can_view_phone_numbers: self.can_view_phone_numbers(),
            can_view_callback_urls: self.can_view_callback_urls(),
        }
    }
}
