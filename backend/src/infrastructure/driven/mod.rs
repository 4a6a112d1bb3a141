pub mod error_reporter;
pub mod google_provider;
pub mod twilio_client;

pub use error_reporter::TracingReporter;
pub use google_provider::{GoogleEndpoints, GoogleProvider};
pub use twilio_client::TwilioClient;
