use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::audit::models::{AuditAction, AuditCursor, AuditEntry};
use crate::shared::constants::MAX_AUDIT_PAGE_SIZE;

/// Query parameters for paging through a file's audit trail, newest first
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    /// Number of entries to return (default and maximum: 100)
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,

    /// `timestamp` of the last entry already seen
    pub before: Option<DateTime<Utc>>,

    /// `id` of the last entry already seen; resumes inside a group of entries sharing `before`
    pub before_id: Option<Uuid>,
}

impl AuditLogQuery {
    /// Get clamped limit (respects MAX_AUDIT_PAGE_SIZE)
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(MAX_AUDIT_PAGE_SIZE)
            .clamp(1, MAX_AUDIT_PAGE_SIZE)
    }

    /// Resume position, if any; `beforeId` alone is ignored
    pub fn cursor(&self) -> Option<AuditCursor> {
        self.before.map(|created_at| AuditCursor {
            created_at,
            id: self.before_id,
        })
    }
}

/// Response DTO for an audit entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogDto {
    pub id: Uuid,
    pub file_id: Uuid,
    pub user_id: String,
    pub action: AuditAction,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<AuditEntry> for AuditLogDto {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            file_id: entry.file_id,
            user_id: entry.actor_id,
            action: entry.action,
            details: entry.details,
            ip_address: entry.ip_address,
            timestamp: entry.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_to_cap() {
        assert_eq!(AuditLogQuery::default().limit(), 100);
    }

    #[test]
    fn test_limit_is_clamped() {
        let query = |limit| AuditLogQuery {
            limit: Some(limit),
            ..Default::default()
        };
        assert_eq!(query(5000).limit(), 100);
        assert_eq!(query(0).limit(), 1);
        assert_eq!(query(-3).limit(), 1);
        assert_eq!(query(25).limit(), 25);
    }

    #[test]
    fn test_cursor_needs_a_timestamp() {
        let id = Uuid::now_v7();
        let only_id = AuditLogQuery {
            before_id: Some(id),
            ..Default::default()
        };
        assert_eq!(only_id.cursor(), None);

        let at = Utc::now();
        let full = AuditLogQuery {
            before: Some(at),
            before_id: Some(id),
            ..Default::default()
        };
        assert_eq!(
            full.cursor(),
            Some(AuditCursor {
                created_at: at,
                id: Some(id)
            })
        );
    }
}
