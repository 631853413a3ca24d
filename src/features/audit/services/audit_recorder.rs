use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::Result;
use crate::features::audit::dtos::AuditLogQuery;
use crate::features::audit::models::AuditEntry;
use crate::features::audit::repositories::AuditStore;

/// Best-effort writer and reader of the audit trail.
///
/// A failed write is logged and dropped: the operation that triggered it has
/// already succeeded (or failed) on its own terms and must not be changed by it.
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append `entry`, swallowing store failures
    pub async fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.store.append(&entry).await {
            tracing::error!(
                file_id = %entry.file_id,
                actor_id = %entry.actor_id,
                action = %entry.action,
                "Failed to write audit entry: {}",
                e
            );
            return;
        }

        tracing::debug!(
            file_id = %entry.file_id,
            actor_id = %entry.actor_id,
            action = %entry.action,
            "Audit entry recorded"
        );
    }

    /// Page through a file's audit trail, newest first, at most 100 entries per call
    pub async fn list(&self, file_id: Uuid, query: &AuditLogQuery) -> Result<Vec<AuditEntry>> {
        self.store
            .list_for_file(file_id, query.cursor(), query.limit())
            .await
    }
}
