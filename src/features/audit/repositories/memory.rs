use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::AuditStore;
use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditAction, AuditCursor, AuditEntry};

/// Audit store kept in process memory, for tests
#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry recorded for `file_id` with the given action, in insertion order
    pub async fn entries_with(&self, file_id: Uuid, action: AuditAction) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.file_id == file_id && e.action == action)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_for_file(
        &self,
        file_id: Uuid,
        before: Option<AuditCursor>,
        limit: i64,
    ) -> Result<Vec<AuditEntry>> {
        let mut matching: Vec<AuditEntry> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.file_id == file_id)
            .filter(|e| before.map_or(true, |cursor| cursor.precedes(e)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }
}

/// Audit store whose backend is always unavailable
pub struct FailingAuditStore;

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _entry: &AuditEntry) -> Result<()> {
        Err(AppError::Internal("audit backend unavailable".to_string()))
    }

    async fn list_for_file(
        &self,
        _file_id: Uuid,
        _before: Option<AuditCursor>,
        _limit: i64,
    ) -> Result<Vec<AuditEntry>> {
        Err(AppError::Internal("audit backend unavailable".to_string()))
    }
}
