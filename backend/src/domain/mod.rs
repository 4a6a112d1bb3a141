// Domain layer - capabilities, policy, resource age and per-identity views
// No dependencies on other layers

pub mod entities;
pub mod value_objects;
pub mod views;

pub use entities::*;
pub use value_objects::*;
