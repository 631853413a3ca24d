use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{FileRepository, SaveOutcome};
use crate::core::error::Result;
use crate::features::files::models::{FileRecord, ShareLink, UserGrant};

/// Database row for the `files` table
#[derive(Debug, FromRow)]
struct FileRow {
    id: Uuid,
    owner_id: String,
    original_filename: String,
    content_type: String,
    file_size: i64,
    storage_key: String,
    share_version: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct GrantRow {
    file_id: Uuid,
    #[sqlx(flatten)]
    grant: UserGrant,
}

#[derive(Debug, FromRow)]
struct LinkRow {
    file_id: Uuid,
    #[sqlx(flatten)]
    link: ShareLink,
}

/// Postgres-backed file repository.
///
/// Grants and links live in child tables; `save_shares` writes them in the
/// same transaction as the `share_version` compare-and-swap on `files`.
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach grants and links to file rows, preserving row order
    async fn hydrate(&self, rows: Vec<FileRow>) -> Result<Vec<FileRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let grant_rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT file_id, id, grantee_id, granted_at, expires_at
            FROM file_grants
            WHERE file_id = ANY($1)
            ORDER BY granted_at, id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let link_rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT file_id, id, link_id, created_at, expires_at, is_active
            FROM share_links
            WHERE file_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grants: HashMap<Uuid, Vec<UserGrant>> = HashMap::new();
        for row in grant_rows {
            grants.entry(row.file_id).or_default().push(row.grant);
        }

        let mut links: HashMap<Uuid, Vec<ShareLink>> = HashMap::new();
        for row in link_rows {
            links.entry(row.file_id).or_default().push(row.link);
        }

        Ok(rows
            .into_iter()
            .map(|row| FileRecord {
                grants: grants.remove(&row.id).unwrap_or_default(),
                links: links.remove(&row.id).unwrap_or_default(),
                id: row.id,
                owner_id: row.owner_id,
                original_filename: row.original_filename,
                content_type: row.content_type,
                file_size: row.file_size,
                storage_key: row.storage_key,
                share_version: row.share_version,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn hydrate_one(&self, row: Option<FileRow>) -> Result<Option<FileRecord>> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn insert(&self, file: &FileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (id, owner_id, original_filename, content_type, file_size, storage_key, share_version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(file.id)
        .bind(&file.owner_id)
        .bind(&file.original_filename)
        .bind(&file.content_type)
        .bind(file.file_size)
        .bind(&file.storage_key)
        .bind(file.share_version)
        .bind(file.created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "File metadata saved: id={}, owner={}, size={}",
            file.id,
            file.owner_id,
            file.file_size
        );

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, owner_id, original_filename, content_type, file_size, storage_key, share_version, created_at
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate_one(row).await
    }

    async fn find_by_link_id(&self, link_id: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT f.id, f.owner_id, f.original_filename, f.content_type, f.file_size,
                   f.storage_key, f.share_version, f.created_at
            FROM files f
            JOIN share_links l ON l.file_id = f.id
            WHERE l.link_id = $1
            "#,
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate_one(row).await
    }

    async fn list_owned_by(&self, owner_id: &str) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, owner_id, original_filename, content_type, file_size, storage_key, share_version, created_at
            FROM files
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn list_granted_to(&self, grantee_id: &str, now: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT f.id, f.owner_id, f.original_filename, f.content_type, f.file_size,
                   f.storage_key, f.share_version, f.created_at
            FROM files f
            WHERE f.owner_id <> $1
              AND EXISTS (
                  SELECT 1 FROM file_grants g
                  WHERE g.file_id = f.id
                    AND g.grantee_id = $1
                    AND (g.expires_at IS NULL OR g.expires_at > $2)
              )
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(grantee_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn save_shares(&self, file: &FileRecord) -> Result<SaveOutcome> {
        let mut tx = self.pool.begin().await?;

        let bumped = sqlx::query(
            r#"
            UPDATE files
            SET share_version = share_version + 1
            WHERE id = $1 AND share_version = $2
            "#,
        )
        .bind(file.id)
        .bind(file.share_version)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(SaveOutcome::Stale);
        }

        // Grants are immutable once written
        for grant in &file.grants {
            sqlx::query(
                r#"
                INSERT INTO file_grants (id, file_id, grantee_id, granted_at, expires_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(grant.id)
            .bind(file.id)
            .bind(&grant.grantee_id)
            .bind(grant.granted_at)
            .bind(grant.expires_at)
            .execute(&mut *tx)
            .await?;
        }

        // Links only ever change by being deactivated
        for link in &file.links {
            sqlx::query(
                r#"
                INSERT INTO share_links (id, file_id, link_id, created_at, expires_at, is_active)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO UPDATE SET is_active = share_links.is_active AND EXCLUDED.is_active
                "#,
            )
            .bind(link.id)
            .bind(file.id)
            .bind(&link.link_id)
            .bind(link.created_at)
            .bind(link.expires_at)
            .bind(link.is_active)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(SaveOutcome::Saved)
    }
}
