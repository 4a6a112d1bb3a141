//! Types shared by the log viewer server: the raw upstream record shapes and
//! the opaque codec used for cursors and session tokens.

pub mod opaque;
pub mod records;

pub use opaque::{OpaqueCodec, OpaqueError, SecretKey};
pub use records::{RecordPage, Timestamp};
