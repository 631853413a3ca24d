use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of event an audit entry records; matches the `audit_action` database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Upload,
    Download,
    ShareUser,
    ShareLink,
    AccessDenied,
    LinkExpired,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Upload => write!(f, "upload"),
            AuditAction::Download => write!(f, "download"),
            AuditAction::ShareUser => write!(f, "share_user"),
            AuditAction::ShareLink => write!(f, "share_link"),
            AuditAction::AccessDenied => write!(f, "access_denied"),
            AuditAction::LinkExpired => write!(f, "link_expired"),
        }
    }
}

/// One immutable audit record
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    pub file_id: Uuid,
    pub actor_id: String,
    pub action: AuditAction,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        file_id: Uuid,
        actor_id: &str,
        action: AuditAction,
        details: impl Into<String>,
        ip_address: Option<&str>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            file_id,
            actor_id: actor_id.to_string(),
            action,
            details: Some(details.into()),
            ip_address: ip_address.map(str::to_string),
            created_at: at,
        }
    }
}

/// Position in a file's audit trail, newest first.
///
/// Entries written in the same instant (one per grantee of a share) share a
/// timestamp, so the entry id breaks the tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditCursor {
    pub created_at: DateTime<Utc>,
    pub id: Option<Uuid>,
}

impl AuditCursor {
    /// Whether `entry` sorts strictly after this position
    pub fn precedes(&self, entry: &AuditEntry) -> bool {
        match self.id {
            Some(id) => (entry.created_at, entry.id) < (self.created_at, id),
            None => entry.created_at < self.created_at,
        }
    }
}
