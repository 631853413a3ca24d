use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FileRepository, SaveOutcome};
use crate::core::error::Result;
use crate::features::files::models::FileRecord;

/// Process-local repository used by service and router tests
#[derive(Default)]
pub struct InMemoryFileRepository {
    files: RwLock<HashMap<Uuid, FileRecord>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut files: Vec<FileRecord>) -> Vec<FileRecord> {
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        files
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn insert(&self, file: &FileRecord) -> Result<()> {
        self.files.write().await.insert(file.id, file.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn find_by_link_id(&self, link_id: &str) -> Result<Option<FileRecord>> {
        Ok(self
            .files
            .read()
            .await
            .values()
            .find(|f| f.find_link(link_id).is_some())
            .cloned())
    }

    async fn list_owned_by(&self, owner_id: &str) -> Result<Vec<FileRecord>> {
        let files = self
            .files
            .read()
            .await
            .values()
            .filter(|f| f.is_owned_by(owner_id))
            .cloned()
            .collect();
        Ok(Self::newest_first(files))
    }

    async fn list_granted_to(&self, grantee_id: &str, now: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        let files = self
            .files
            .read()
            .await
            .values()
            .filter(|f| !f.is_owned_by(grantee_id) && f.live_grant_for(grantee_id, now).is_some())
            .cloned()
            .collect();
        Ok(Self::newest_first(files))
    }

    async fn save_shares(&self, file: &FileRecord) -> Result<SaveOutcome> {
        let mut files = self.files.write().await;
        let Some(stored) = files.get_mut(&file.id) else {
            return Ok(SaveOutcome::Stale);
        };

        if stored.share_version != file.share_version {
            return Ok(SaveOutcome::Stale);
        }

        stored.grants = file.grants.clone();
        stored.links = file.links.clone();
        stored.share_version += 1;
        Ok(SaveOutcome::Saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::NewFile;

    fn record(owner: &str) -> FileRecord {
        FileRecord::new(
            NewFile {
                id: Uuid::new_v4(),
                owner_id: owner.to_string(),
                original_filename: "a.txt".to_string(),
                content_type: "text/plain".to_string(),
                file_size: 1,
                storage_key: "uploads/a.txt".to_string(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let repo = InMemoryFileRepository::new();
        let file = record("owner-a");
        repo.insert(&file).await.unwrap();

        let now = Utc::now();
        let mut first = repo.find_by_id(file.id).await.unwrap().unwrap();
        let mut second = first.clone();

        first.grant_users(&["user-b".to_string()], None, now);
        assert_eq!(repo.save_shares(&first).await.unwrap(), SaveOutcome::Saved);

        second.grant_users(&["user-c".to_string()], None, now);
        assert_eq!(repo.save_shares(&second).await.unwrap(), SaveOutcome::Stale);

        let stored = repo.find_by_id(file.id).await.unwrap().unwrap();
        assert_eq!(stored.share_version, 1);
        assert_eq!(stored.grants.len(), 1);
        assert_eq!(stored.grants[0].grantee_id, "user-b");
    }

    #[tokio::test]
    async fn test_shared_listing_excludes_own_files() {
        let repo = InMemoryFileRepository::new();
        let now = Utc::now();

        let mut own = record("user-b");
        own.grant_users(&["user-b".to_string()], None, now);
        repo.insert(&own).await.unwrap();

        let mut theirs = record("owner-a");
        theirs.grant_users(&["user-b".to_string()], None, now);
        repo.insert(&theirs).await.unwrap();

        let shared = repo.list_granted_to("user-b", now).await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, theirs.id);
    }
}
