pub mod email;
pub mod permission;
pub mod sid;

pub use email::Email;
pub use permission::Permission;
pub use sid::Sid;
