//! Append-only audit trail of access-relevant events

pub mod dtos;
pub mod models;
pub mod repositories;
pub mod services;

pub use repositories::{AuditStore, PgAuditStore};
pub use services::AuditRecorder;
