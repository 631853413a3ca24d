mod file;
mod share;

pub use file::{FileRecord, NewFile};
pub use share::{expiry_from_ttl, ShareLink, UserGrant};
