use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditAction, AuditEntry};
use crate::features::audit::AuditRecorder;
use crate::features::files::models::{expiry_from_ttl, FileRecord, ShareLink};
use crate::features::files::repositories::{FileRepository, SaveOutcome};
use crate::shared::constants::MAX_SHARE_WRITE_ATTEMPTS;

/// Result of sharing a file with a set of users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantOutcome {
    /// Grants newly created by this call
    pub added: usize,
    /// Grants on the file afterwards, expired ones included
    pub total_grants: usize,
}

/// Grantee list after trimming, checked once the caller is known to own the file
#[derive(Debug, Validate)]
struct GrantRequest {
    #[validate(length(min = 1, message = "At least one grantee is required"))]
    grantees: Vec<String>,
}

/// What a share link is being resolved for; only changes the audit wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAccess {
    View,
    Download,
}

/// Owns a file's grants and share links.
///
/// Every mutation reloads the file, applies the change in memory and writes the
/// share state back guarded by `share_version`. A stale write is retried from
/// a fresh load.
pub struct ShareRegistry {
    repo: Arc<dyn FileRepository>,
    recorder: Arc<AuditRecorder>,
}

impl ShareRegistry {
    pub fn new(repo: Arc<dyn FileRepository>, recorder: Arc<AuditRecorder>) -> Self {
        Self { repo, recorder }
    }

    /// Grant each of `grantees` read access, expiring `ttl_hours` from `now`
    pub async fn grant_users(
        &self,
        file_id: Uuid,
        caller: &str,
        grantees: &[String],
        ttl_hours: Option<i64>,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<GrantOutcome> {
        let request = GrantRequest {
            grantees: grantees
                .iter()
                .map(|g| g.trim())
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect(),
        };

        let (file, added) = self
            .update_shares(file_id, caller, |file| {
                request
                    .validate()
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                let expires_at = expiry_from_ttl(now, ttl_hours)?;
                Ok(file.grant_users(&request.grantees, expires_at, now))
            })
            .await?;

        for grant in &added {
            self.recorder
                .record(AuditEntry::new(
                    file.id,
                    caller,
                    AuditAction::ShareUser,
                    format!("Shared with user: {}", grant.grantee_id),
                    origin,
                    now,
                ))
                .await;
        }

        info!(
            file_id = %file.id,
            added = added.len(),
            "File shared with users"
        );

        Ok(GrantOutcome {
            added: added.len(),
            total_grants: file.grants.len(),
        })
    }

    /// Mint a new active share link; never reuses an existing one
    pub async fn create_link(
        &self,
        file_id: Uuid,
        caller: &str,
        ttl_hours: Option<i64>,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ShareLink> {
        let (file, link) = self
            .update_shares(file_id, caller, |file| {
                let link = ShareLink::new(now, expiry_from_ttl(now, ttl_hours)?);
                file.add_link(link.clone());
                Ok(link)
            })
            .await?;

        self.recorder
            .record(AuditEntry::new(
                file.id,
                caller,
                AuditAction::ShareLink,
                format!("Generated share link: {}", link.link_id),
                origin,
                now,
            ))
            .await;

        info!(file_id = %file.id, expires_at = ?link.expires_at, "Share link created");

        Ok(link)
    }

    /// Permanently switch off a share link. Already inactive links are left as they are.
    pub async fn deactivate_link(
        &self,
        file_id: Uuid,
        caller: &str,
        link_id: &str,
    ) -> Result<ShareLink> {
        let (file, link) = self
            .update_shares(file_id, caller, |file| {
                let link = file.find_link_mut(link_id).ok_or(AppError::LinkNotFound)?;
                link.is_active = false;
                Ok(link.clone())
            })
            .await?;

        info!(file_id = %file.id, "Share link deactivated");

        Ok(link)
    }

    /// Find the file behind a share link, provided the link is still usable
    pub async fn resolve_link(
        &self,
        link_id: &str,
        requester: &str,
        origin: Option<&str>,
        access: LinkAccess,
        now: DateTime<Utc>,
    ) -> Result<FileRecord> {
        let file = self
            .repo
            .find_by_link_id(link_id)
            .await?
            .ok_or(AppError::LinkNotFound)?;

        let (is_active, is_expired) = file
            .find_link(link_id)
            .map(|link| (link.is_active, link.is_expired(now)))
            .ok_or(AppError::LinkNotFound)?;

        if !is_active {
            debug!(file_id = %file.id, "Inactive share link used");
            return Err(AppError::LinkInactive);
        }

        if is_expired {
            warn!(file_id = %file.id, user_id = %requester, "Expired share link used");
            let details = match access {
                LinkAccess::View => format!("Attempted to access expired link: {}", link_id),
                LinkAccess::Download => {
                    format!("Attempted to download via expired link: {}", link_id)
                }
            };
            self.recorder
                .record(AuditEntry::new(
                    file.id,
                    requester,
                    AuditAction::LinkExpired,
                    details,
                    origin,
                    now,
                ))
                .await;
            return Err(AppError::LinkExpired);
        }

        Ok(file)
    }

    /// Load-modify-save loop shared by every owner-only share mutation.
    ///
    /// `apply` runs against a fresh copy on every attempt, after the file is
    /// known to exist and to belong to `caller`.
    async fn update_shares<T, F>(
        &self,
        file_id: Uuid,
        caller: &str,
        mut apply: F,
    ) -> Result<(FileRecord, T)>
    where
        F: FnMut(&mut FileRecord) -> Result<T>,
    {
        for attempt in 1..=MAX_SHARE_WRITE_ATTEMPTS {
            let original = self
                .repo
                .find_by_id(file_id)
                .await?
                .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
            original.ensure_owner(caller)?;

            let mut file = original.clone();
            let out = apply(&mut file)?;

            if file == original {
                return Ok((file, out));
            }

            match self.repo.save_shares(&file).await? {
                SaveOutcome::Saved => {
                    file.share_version += 1;
                    return Ok((file, out));
                }
                SaveOutcome::Stale => {
                    debug!(file_id = %file_id, attempt, "Share state changed concurrently, retrying");
                }
            }
        }

        warn!(file_id = %file_id, "Giving up on share update after repeated conflicts");
        Err(AppError::Conflict(
            "The file's sharing settings are being changed concurrently, please retry".to_string(),
        ))
    }
}
