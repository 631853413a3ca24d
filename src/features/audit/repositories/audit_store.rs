use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::audit::models::{AuditCursor, AuditEntry};

/// Append-only persistence for audit entries
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// Entries for `file_id`, newest first by `(created_at, id)`, strictly past `before` when given
    async fn list_for_file(
        &self,
        file_id: Uuid,
        before: Option<AuditCursor>,
        limit: i64,
    ) -> Result<Vec<AuditEntry>>;
}

/// Postgres-backed audit store (`audit_logs` table)
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, file_id, actor_id, action, details, ip_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.file_id)
        .bind(&entry.actor_id)
        .bind(entry.action)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_file(
        &self,
        file_id: Uuid,
        before: Option<AuditCursor>,
        limit: i64,
    ) -> Result<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, file_id, actor_id, action, details, ip_address, created_at
            FROM audit_logs
            WHERE file_id = $1
              AND (
                $2::timestamptz IS NULL
                OR created_at < $2
                OR ($3::uuid IS NOT NULL AND created_at = $2 AND id < $3)
              )
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(file_id)
        .bind(before.map(|c| c.created_at))
        .bind(before.and_then(|c| c.id))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
