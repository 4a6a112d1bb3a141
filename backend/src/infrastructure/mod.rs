// Infrastructure layer - configuration, upstream adapters and the HTTP surface
// Implements the ports defined in the application layer

use std::sync::Arc;
use std::time::Duration;

use crate::application::auth::Authenticator;
use crate::application::viewer::Viewer;

pub mod config;
pub mod driven;    // Output adapters (upstream API, identity provider, error reporting)
pub mod driving;   // Input adapters (HTTP)

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub viewer: Arc<Viewer>,
    /// Overall budget for one request, upstream fetches included.
    pub request_timeout: Duration,
}
