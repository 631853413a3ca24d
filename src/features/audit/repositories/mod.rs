mod audit_store;
#[cfg(test)]
mod memory;

pub use audit_store::{AuditStore, PgAuditStore};
#[cfg(test)]
pub use memory::{FailingAuditStore, InMemoryAuditStore};
