use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::files::models::FileRecord;

/// Result of a versioned write of a file's grants and links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Someone else saved since this copy was loaded; reload and re-apply
    Stale,
}

/// Persistence for file records and their share sub-records
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn insert(&self, file: &FileRecord) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>>;

    /// The file carrying the share link `link_id`, if any
    async fn find_by_link_id(&self, link_id: &str) -> Result<Option<FileRecord>>;

    /// Files owned by `owner_id`, newest first
    async fn list_owned_by(&self, owner_id: &str) -> Result<Vec<FileRecord>>;

    /// Files not owned by `grantee_id` on which they hold a grant live at `now`, newest first
    async fn list_granted_to(&self, grantee_id: &str, now: DateTime<Utc>) -> Result<Vec<FileRecord>>;

    /// Persist `file.grants` and `file.links` if the stored `share_version`
    /// still equals `file.share_version`, bumping the version on success.
    async fn save_shares(&self, file: &FileRecord) -> Result<SaveOutcome>;
}
