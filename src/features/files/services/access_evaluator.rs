use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditAction, AuditEntry};
use crate::features::audit::AuditRecorder;
use crate::features::files::models::FileRecord;

/// Why a requester was let through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessBasis {
    Owner,
    Grant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow(AccessBasis),
    Deny,
}

/// Decides whether a user may read a file, given its share state and the clock
pub struct AccessEvaluator {
    recorder: Arc<AuditRecorder>,
}

impl AccessEvaluator {
    pub fn new(recorder: Arc<AuditRecorder>) -> Self {
        Self { recorder }
    }

    /// Owner first, then any live grant; everyone else is denied
    pub fn decide(file: &FileRecord, requester: &str, now: DateTime<Utc>) -> AccessDecision {
        if file.is_owned_by(requester) {
            AccessDecision::Allow(AccessBasis::Owner)
        } else if file.live_grant_for(requester, now).is_some() {
            AccessDecision::Allow(AccessBasis::Grant)
        } else {
            AccessDecision::Deny
        }
    }

    /// Like [`decide`](Self::decide), but a denial is audited and returned as `Forbidden`
    pub async fn authorize(
        &self,
        file: &FileRecord,
        requester: &str,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AccessBasis> {
        match Self::decide(file, requester, now) {
            AccessDecision::Allow(basis) => Ok(basis),
            AccessDecision::Deny => {
                warn!(file_id = %file.id, user_id = %requester, "Access denied");
                self.recorder
                    .record(AuditEntry::new(
                        file.id,
                        requester,
                        AuditAction::AccessDenied,
                        "Attempted to download without permission",
                        origin,
                        now,
                    ))
                    .await;
                Err(AppError::Forbidden(
                    "You do not have access to this file".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::audit::repositories::InMemoryAuditStore;
    use crate::features::files::models::NewFile;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(now: DateTime<Utc>) -> FileRecord {
        FileRecord::new(
            NewFile {
                id: Uuid::new_v4(),
                owner_id: "owner-a".to_string(),
                original_filename: "report.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                file_size: 4096,
                storage_key: "uploads/owner-a/report.pdf".to_string(),
            },
            now,
        )
    }

    #[test]
    fn test_owner_is_allowed_without_any_shares() {
        let now = Utc::now();
        let file = record(now);
        assert_eq!(
            AccessEvaluator::decide(&file, "owner-a", now + Duration::days(400)),
            AccessDecision::Allow(AccessBasis::Owner)
        );
    }

    #[test]
    fn test_grantee_allowed_until_expiry() {
        let now = Utc::now();
        let mut file = record(now);
        file.grant_users(&["user-b".to_string()], Some(now + Duration::hours(1)), now);

        assert_eq!(
            AccessEvaluator::decide(&file, "user-b", now + Duration::minutes(30)),
            AccessDecision::Allow(AccessBasis::Grant)
        );
        assert_eq!(
            AccessEvaluator::decide(&file, "user-b", now + Duration::hours(1)),
            AccessDecision::Deny
        );
        assert_eq!(
            AccessEvaluator::decide(&file, "user-c", now),
            AccessDecision::Deny
        );
    }

    #[tokio::test]
    async fn test_denial_is_audited_once() {
        let store = Arc::new(InMemoryAuditStore::new());
        let evaluator = AccessEvaluator::new(Arc::new(AuditRecorder::new(store.clone())));
        let now = Utc::now();
        let mut file = record(now);
        file.grant_users(&["user-b".to_string()], Some(now + Duration::hours(1)), now);

        let later = now + Duration::hours(2);
        let result = evaluator
            .authorize(&file, "user-b", Some("198.51.100.4"), later)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        let denied = store.entries_with(file.id, AuditAction::AccessDenied).await;
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].actor_id, "user-b");
        assert_eq!(denied[0].ip_address.as_deref(), Some("198.51.100.4"));
        assert_eq!(denied[0].created_at, later);
    }

    #[tokio::test]
    async fn test_allowed_access_writes_nothing() {
        let store = Arc::new(InMemoryAuditStore::new());
        let evaluator = AccessEvaluator::new(Arc::new(AuditRecorder::new(store.clone())));
        let now = Utc::now();
        let file = record(now);

        let basis = evaluator.authorize(&file, "owner-a", None, now).await.unwrap();
        assert_eq!(basis, AccessBasis::Owner);
        assert_eq!(store.len().await, 0);
    }
}
