pub mod policy;
pub mod user;

pub use policy::{Group, Policy, PolicyError};
pub use user::{User, UserSettings};
