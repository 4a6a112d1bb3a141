pub mod auth;
pub mod deadline;

pub use auth::AuthenticatedUser;
pub use deadline::{set_deadline, RequestDeadline};
