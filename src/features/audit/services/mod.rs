mod audit_recorder;

pub use audit_recorder::AuditRecorder;
