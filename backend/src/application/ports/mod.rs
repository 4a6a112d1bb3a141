// Application ports - Driven ports (output ports implemented by infrastructure)

pub mod error_reporter;
pub mod identity_provider;
pub mod resource_client;

pub use error_reporter::ErrorReporter;
pub use identity_provider::{Identity, IdentityProvider, ProviderError};
pub use resource_client::{ResourceClient, UpstreamError};
