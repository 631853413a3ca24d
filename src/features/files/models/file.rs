use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ShareLink, UserGrant};
use crate::core::error::{AppError, Result};

/// Metadata for a freshly uploaded file, before it has any shares
#[derive(Debug, Clone)]
pub struct NewFile {
    pub id: Uuid,
    pub owner_id: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub storage_key: String,
}

/// A stored file together with its authorization sub-records.
///
/// `grants` and `links` are written back as one unit guarded by
/// `share_version`, so two owners' edits never overwrite each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    pub share_version: i64,
    pub grants: Vec<UserGrant>,
    pub links: Vec<ShareLink>,
}

impl FileRecord {
    pub fn new(file: NewFile, now: DateTime<Utc>) -> Self {
        Self {
            id: file.id,
            owner_id: file.owner_id,
            original_filename: file.original_filename,
            content_type: file.content_type,
            file_size: file.file_size,
            storage_key: file.storage_key,
            created_at: now,
            share_version: 0,
            grants: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Fail with `Forbidden` unless `user_id` owns this file
    pub fn ensure_owner(&self, user_id: &str) -> Result<()> {
        if self.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the file owner can manage this file".to_string(),
            ))
        }
    }

    pub fn live_grant_for(&self, user_id: &str, now: DateTime<Utc>) -> Option<&UserGrant> {
        self.grants
            .iter()
            .find(|g| g.grantee_id == user_id && g.is_live(now))
    }

    pub fn live_grants(&self, now: DateTime<Utc>) -> impl Iterator<Item = &UserGrant> {
        self.grants.iter().filter(move |g| g.is_live(now))
    }

    pub fn usable_links(&self, now: DateTime<Utc>) -> impl Iterator<Item = &ShareLink> {
        self.links.iter().filter(move |l| l.is_usable(now))
    }

    pub fn find_link(&self, link_id: &str) -> Option<&ShareLink> {
        self.links.iter().find(|l| l.link_id == link_id)
    }

    pub fn find_link_mut(&mut self, link_id: &str) -> Option<&mut ShareLink> {
        self.links.iter_mut().find(|l| l.link_id == link_id)
    }

    /// Append a grant for every grantee that does not already hold a live one.
    ///
    /// Repeated grantees collapse to a single grant and existing live grants
    /// keep their original expiry. Returns the grants actually added.
    pub fn grant_users(
        &mut self,
        grantees: &[String],
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<UserGrant> {
        let mut added = Vec::new();
        for grantee in grantees {
            if self.live_grant_for(grantee, now).is_some() {
                continue;
            }
            let grant = UserGrant::new(grantee, now, expires_at);
            self.grants.push(grant.clone());
            added.push(grant);
        }
        added
    }

    pub fn add_link(&mut self, link: ShareLink) {
        self.links.push(link);
    }
}
