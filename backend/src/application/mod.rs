// Application layer - authentication, pagination and log viewing use cases
// Orchestrates domain logic, depends on domain layer and ports only

pub mod auth;
pub mod deadline;
pub mod pagination;
pub mod ports;
pub mod viewer;
