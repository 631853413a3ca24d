mod audit_dto;

pub use audit_dto::{AuditLogDto, AuditLogQuery};
