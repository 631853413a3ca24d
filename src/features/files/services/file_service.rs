use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::audit::dtos::{AuditLogDto, AuditLogQuery};
use crate::features::audit::models::{AuditAction, AuditEntry};
use crate::features::audit::{AuditRecorder, AuditStore};
use crate::features::files::dtos::{
    DownloadedFile, FileDetailsDto, GrantDto, GrantResultDto, IncomingFile, OwnedFileDto,
    ShareLinkDto, SharedFileDto, UploadedFileDto,
};
use crate::features::files::models::{FileRecord, NewFile};
use crate::features::files::repositories::FileRepository;
use crate::features::files::services::{AccessEvaluator, LinkAccess, ShareRegistry};
use crate::modules::storage::ContentStore;
use crate::shared::constants::{MAX_FILES_PER_UPLOAD, MAX_FILE_SIZE};

/// File catalog: uploads, listings, detail views and downloads.
///
/// Authorization is delegated to [`AccessEvaluator`] and share state changes
/// to [`ShareRegistry`]; this service wires them to storage and the audit trail.
pub struct FileService {
    repo: Arc<dyn FileRepository>,
    content: Arc<dyn ContentStore>,
    recorder: Arc<AuditRecorder>,
    evaluator: AccessEvaluator,
    registry: ShareRegistry,
    frontend_url: String,
}

impl FileService {
    pub fn new(
        repo: Arc<dyn FileRepository>,
        audit_store: Arc<dyn AuditStore>,
        content: Arc<dyn ContentStore>,
        frontend_url: impl Into<String>,
    ) -> Self {
        let recorder = Arc::new(AuditRecorder::new(audit_store));
        Self {
            evaluator: AccessEvaluator::new(recorder.clone()),
            registry: ShareRegistry::new(repo.clone(), recorder.clone()),
            repo,
            content,
            recorder,
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Store a batch of files for `owner`.
    ///
    /// The whole batch is validated before anything is written.
    pub async fn upload_files(
        &self,
        owner: &str,
        files: Vec<IncomingFile>,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<UploadedFileDto>> {
        if files.is_empty() {
            return Err(AppError::Validation("No files uploaded".to_string()));
        }

        if files.len() > MAX_FILES_PER_UPLOAD {
            return Err(AppError::Validation(format!(
                "Too many files. At most {} files can be uploaded at once",
                MAX_FILES_PER_UPLOAD
            )));
        }

        if let Some(file) = files.iter().find(|f| f.data.len() > MAX_FILE_SIZE) {
            return Err(AppError::Validation(format!(
                "File '{}' is too large. Maximum size is {} MB",
                file.filename,
                MAX_FILE_SIZE / 1024 / 1024
            )));
        }

        let mut uploaded = Vec::with_capacity(files.len());

        for incoming in files {
            let file_id = Uuid::new_v4();
            let file_size = incoming.data.len() as i64;
            let key = format!(
                "uploads/{}/{}.{}",
                owner,
                file_id,
                storage_extension(&incoming.filename)
            );

            let storage_key = self
                .content
                .write(&key, incoming.data, &incoming.content_type)
                .await?;

            debug!("File content stored: {}", storage_key);

            let record = FileRecord::new(
                NewFile {
                    id: file_id,
                    owner_id: owner.to_string(),
                    original_filename: incoming.filename,
                    content_type: incoming.content_type,
                    file_size,
                    storage_key,
                },
                now,
            );
            self.repo.insert(&record).await?;

            self.recorder
                .record(AuditEntry::new(
                    record.id,
                    owner,
                    AuditAction::Upload,
                    format!("Uploaded file: {}", record.original_filename),
                    origin,
                    now,
                ))
                .await;

            uploaded.push(UploadedFileDto::from(&record));
        }

        info!(owner_id = %owner, count = uploaded.len(), "Files uploaded");

        Ok(uploaded)
    }

    /// Files owned by `user`, newest first
    pub async fn list_owned(&self, user: &str, now: DateTime<Utc>) -> Result<Vec<OwnedFileDto>> {
        let files = self.repo.list_owned_by(user).await?;

        Ok(files
            .iter()
            .map(|file| OwnedFileDto {
                id: file.id,
                original_filename: file.original_filename.clone(),
                content_type: file.content_type.clone(),
                file_size: file.file_size,
                created_at: file.created_at,
                shared_with_count: file.live_grants(now).count(),
                active_link_count: file.usable_links(now).count(),
            })
            .collect())
    }

    /// Files other users have granted `user` live access to, newest first
    pub async fn list_shared_with(
        &self,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SharedFileDto>> {
        let files = self.repo.list_granted_to(user, now).await?;

        Ok(files
            .iter()
            .filter_map(|file| {
                file.live_grant_for(user, now)
                    .map(|grant| SharedFileDto::new(file, grant.expires_at))
            })
            .collect())
    }

    pub async fn download(
        &self,
        file_id: Uuid,
        requester: &str,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DownloadedFile> {
        let file = self.find(file_id).await?;
        self.evaluator
            .authorize(&file, requester, origin, now)
            .await?;

        let details = format!("Downloaded file: {}", file.original_filename);
        self.deliver(file, requester, origin, now, details).await
    }

    /// Download through a share link; any authenticated user holding a usable link may read
    pub async fn download_via_link(
        &self,
        link_id: &str,
        requester: &str,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DownloadedFile> {
        let file = self
            .registry
            .resolve_link(link_id, requester, origin, LinkAccess::Download, now)
            .await?;

        let details = format!("Downloaded via share link: {}", file.original_filename);
        self.deliver(file, requester, origin, now, details).await
    }

    /// Summary of the file behind a share link, without reading its content
    pub async fn view_shared(
        &self,
        link_id: &str,
        requester: &str,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SharedFileDto> {
        let file = self
            .registry
            .resolve_link(link_id, requester, origin, LinkAccess::View, now)
            .await?;

        let expires_at = file.find_link(link_id).and_then(|link| link.expires_at);
        Ok(SharedFileDto::new(&file, expires_at))
    }

    pub async fn share_with_users(
        &self,
        file_id: Uuid,
        caller: &str,
        grantees: &[String],
        ttl_hours: Option<i64>,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<GrantResultDto> {
        let outcome = self
            .registry
            .grant_users(file_id, caller, grantees, ttl_hours, origin, now)
            .await?;

        Ok(GrantResultDto {
            added: outcome.added,
            total_grants: outcome.total_grants,
        })
    }

    pub async fn create_share_link(
        &self,
        file_id: Uuid,
        caller: &str,
        ttl_hours: Option<i64>,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ShareLinkDto> {
        let link = self
            .registry
            .create_link(file_id, caller, ttl_hours, origin, now)
            .await?;

        Ok(ShareLinkDto::new(&link, &self.frontend_url, now))
    }

    pub async fn deactivate_share_link(
        &self,
        file_id: Uuid,
        caller: &str,
        link_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ShareLinkDto> {
        let link = self
            .registry
            .deactivate_link(file_id, caller, link_id)
            .await?;

        Ok(ShareLinkDto::new(&link, &self.frontend_url, now))
    }

    /// Owner view of every grant and every active link on a file
    pub async fn details(
        &self,
        file_id: Uuid,
        caller: &str,
        now: DateTime<Utc>,
    ) -> Result<FileDetailsDto> {
        let file = self.find(file_id).await?;
        file.ensure_owner(caller)?;

        Ok(FileDetailsDto {
            id: file.id,
            original_filename: file.original_filename.clone(),
            content_type: file.content_type.clone(),
            file_size: file.file_size,
            created_at: file.created_at,
            grants: file.grants.iter().map(|g| GrantDto::new(g, now)).collect(),
            links: file
                .links
                .iter()
                .filter(|l| l.is_active)
                .map(|l| ShareLinkDto::new(l, &self.frontend_url, now))
                .collect(),
        })
    }

    pub async fn audit_logs(
        &self,
        file_id: Uuid,
        caller: &str,
        query: &AuditLogQuery,
    ) -> Result<Vec<AuditLogDto>> {
        let file = self.find(file_id).await?;
        file.ensure_owner(caller)?;

        let entries = self.recorder.list(file.id, query).await?;
        Ok(entries.into_iter().map(AuditLogDto::from).collect())
    }

    async fn find(&self, file_id: Uuid) -> Result<FileRecord> {
        self.repo
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }

    /// Read the content of an already authorized file and audit the download
    async fn deliver(
        &self,
        file: FileRecord,
        requester: &str,
        origin: Option<&str>,
        now: DateTime<Utc>,
        details: String,
    ) -> Result<DownloadedFile> {
        let data = self.content.read(&file.storage_key).await?;

        self.recorder
            .record(AuditEntry::new(
                file.id,
                requester,
                AuditAction::Download,
                details,
                origin,
                now,
            ))
            .await;

        debug!(file_id = %file.id, user_id = %requester, "File downloaded");

        Ok(DownloadedFile {
            filename: file.original_filename,
            content_type: file.content_type,
            data,
        })
    }
}

/// Extension used for the stored object, taken from the original filename
fn storage_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::TestContext;
    use chrono::Duration;

    #[test]
    fn test_storage_extension() {
        assert_eq!(storage_extension("report.PDF"), "pdf");
        assert_eq!(storage_extension("archive.tar.gz"), "gz");
        assert_eq!(storage_extension("README"), "bin");
        assert_eq!(storage_extension("weird.../etc"), "bin");
    }

    #[tokio::test]
    async fn test_grant_then_expiry_scenario() {
        let ctx = TestContext::new();
        let t0 = Utc::now();
        let file_id = ctx.upload("owner-a", "notes.txt", vec![b'x'; 2048], t0).await;

        ctx.service
            .share_with_users(file_id, "owner-a", &["user-b".to_string()], Some(1), None, t0)
            .await
            .unwrap();

        let downloaded = ctx
            .service
            .download(file_id, "user-b", Some("203.0.113.9"), t0 + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(downloaded.data.len(), 2048);
        assert_eq!(downloaded.content_type, "text/plain");

        let denied = ctx
            .service
            .download(file_id, "user-b", Some("203.0.113.9"), t0 + Duration::minutes(90))
            .await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        assert_eq!(ctx.audit.entries_with(file_id, AuditAction::Download).await.len(), 1);
        assert_eq!(
            ctx.audit.entries_with(file_id, AuditAction::AccessDenied).await.len(),
            1
        );
    }

    #[tokio::test]
    async fn test_owner_downloads_without_shares() {
        let ctx = TestContext::new();
        let now = Utc::now();
        let file_id = ctx.upload("owner-a", "photo.png", vec![1, 2, 3], now).await;

        let downloaded = ctx
            .service
            .download(file_id, "owner-a", None, now)
            .await
            .unwrap();
        assert_eq!(downloaded.filename, "photo.png");
        assert_eq!(downloaded.data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_download_survives_audit_outage() {
        let ctx = TestContext::with_failing_audit();
        let now = Utc::now();
        let file_id = ctx.upload("owner-a", "notes.txt", b"hello".to_vec(), now).await;

        let downloaded = ctx
            .service
            .download(file_id, "owner-a", None, now)
            .await
            .unwrap();
        assert_eq!(downloaded.data, b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_missing_content_is_not_found() {
        let ctx = TestContext::new();
        let now = Utc::now();
        let file_id = ctx.upload("owner-a", "notes.txt", b"hello".to_vec(), now).await;

        let stored = ctx.files.find_by_id(file_id).await.unwrap().unwrap();
        ctx.content.remove(&stored.storage_key).await;

        let result = ctx.service.download(file_id, "owner-a", None, now).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(ctx
            .audit
            .entries_with(file_id, AuditAction::Download)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_unknown_file_is_not_found() {
        let ctx = TestContext::new();
        let result = ctx
            .service
            .download(Uuid::new_v4(), "owner-a", None, Utc::now())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_upload_batch_is_validated_before_writing() {
        let ctx = TestContext::new();
        let now = Utc::now();
        let file = |name: &str, size: usize| IncomingFile {
            filename: name.to_string(),
            content_type: "application/octet-stream".to_string(),
            data: vec![0; size],
        };

        let too_many: Vec<IncomingFile> = (0..11).map(|i| file(&format!("f{}.bin", i), 1)).collect();
        let result = ctx.service.upload_files("owner-a", too_many, None, now).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let oversized = vec![file("small.bin", 1), file("huge.bin", MAX_FILE_SIZE + 1)];
        let result = ctx.service.upload_files("owner-a", oversized, None, now).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = ctx.service.upload_files("owner-a", Vec::new(), None, now).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert!(ctx.files.list_owned_by("owner-a").await.unwrap().is_empty());
        assert_eq!(ctx.audit.len().await, 0);
    }

    #[tokio::test]
    async fn test_upload_records_and_audits_each_file() {
        let ctx = TestContext::new();
        let now = Utc::now();
        let uploaded = ctx
            .service
            .upload_files(
                "owner-a",
                vec![
                    IncomingFile {
                        filename: "a.txt".to_string(),
                        content_type: "text/plain".to_string(),
                        data: b"aaa".to_vec(),
                    },
                    IncomingFile {
                        filename: "b.txt".to_string(),
                        content_type: "text/plain".to_string(),
                        data: b"bb".to_vec(),
                    },
                ],
                Some("192.0.2.10"),
                now,
            )
            .await
            .unwrap();

        assert_eq!(uploaded.len(), 2);
        assert_eq!(uploaded[1].file_size, 2);
        for file in &uploaded {
            let stored = ctx.files.find_by_id(file.id).await.unwrap().unwrap();
            assert!(stored
                .storage_key
                .starts_with(&format!("uploads/owner-a/{}", file.id)));
            let entries = ctx.audit.entries_with(file.id, AuditAction::Upload).await;
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].ip_address.as_deref(), Some("192.0.2.10"));
        }
    }

    #[tokio::test]
    async fn test_listings_reflect_live_state() {
        let ctx = TestContext::new();
        let t0 = Utc::now();
        let temporary = ctx.upload("owner-a", "temp.txt", b"t".to_vec(), t0).await;
        let permanent = ctx
            .upload("owner-a", "perm.txt", b"p".to_vec(), t0 + Duration::seconds(1))
            .await;
        let own = ctx.upload("user-b", "mine.txt", b"m".to_vec(), t0).await;

        let b = vec!["user-b".to_string()];
        ctx.service
            .share_with_users(temporary, "owner-a", &b, Some(1), None, t0)
            .await
            .unwrap();
        ctx.service
            .share_with_users(permanent, "owner-a", &b, None, None, t0)
            .await
            .unwrap();
        ctx.service
            .share_with_users(own, "user-b", &b, None, None, t0)
            .await
            .unwrap();
        ctx.service
            .create_share_link(permanent, "owner-a", Some(1), None, t0)
            .await
            .unwrap();

        let shared = ctx.service.list_shared_with("user-b", t0).await.unwrap();
        let ids: Vec<Uuid> = shared.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![permanent, temporary]);

        let later = t0 + Duration::hours(2);
        let shared = ctx.service.list_shared_with("user-b", later).await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, permanent);
        assert_eq!(shared[0].access_expires_at, None);

        let owned = ctx.service.list_owned("owner-a", t0).await.unwrap();
        assert_eq!(owned[0].id, permanent);
        assert_eq!(owned[0].shared_with_count, 1);
        assert_eq!(owned[0].active_link_count, 1);

        let owned_later = ctx.service.list_owned("owner-a", later).await.unwrap();
        assert_eq!(owned_later[0].active_link_count, 0);
        assert_eq!(owned_later[1].shared_with_count, 0);
    }

    #[tokio::test]
    async fn test_link_gives_any_user_access() {
        let ctx = TestContext::new();
        let now = Utc::now();
        let file_id = ctx.upload("owner-a", "notes.txt", b"hello".to_vec(), now).await;

        let link = ctx
            .service
            .create_share_link(file_id, "owner-a", None, None, now)
            .await
            .unwrap();
        assert_eq!(
            link.url,
            format!("https://files.example.test/shared/{}", link.link_id)
        );

        let viewed = ctx
            .service
            .view_shared(&link.link_id, "user-c", None, now)
            .await
            .unwrap();
        assert_eq!(viewed.id, file_id);
        assert!(ctx
            .audit
            .entries_with(file_id, AuditAction::Download)
            .await
            .is_empty());

        let downloaded = ctx
            .service
            .download_via_link(&link.link_id, "user-c", None, now)
            .await
            .unwrap();
        assert_eq!(downloaded.data, b"hello".to_vec());
        assert_eq!(ctx.audit.entries_with(file_id, AuditAction::Download).await.len(), 1);

        // The link does not turn into a user grant
        let direct = ctx.service.download(file_id, "user-c", None, now).await;
        assert!(matches!(direct, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_details_and_audit_logs_are_owner_only() {
        let ctx = TestContext::new();
        let t0 = Utc::now();
        let file_id = ctx
            .upload("owner-a", "notes.txt", b"hello".to_vec(), t0 - Duration::minutes(1))
            .await;

        ctx.service
            .share_with_users(file_id, "owner-a", &["user-b".to_string()], Some(1), None, t0)
            .await
            .unwrap();
        let revoked = ctx
            .service
            .create_share_link(file_id, "owner-a", None, None, t0)
            .await
            .unwrap();
        ctx.service
            .create_share_link(file_id, "owner-a", Some(1), None, t0)
            .await
            .unwrap();
        ctx.service
            .deactivate_share_link(file_id, "owner-a", &revoked.link_id, t0)
            .await
            .unwrap();

        let later = t0 + Duration::hours(2);
        let details = ctx.service.details(file_id, "owner-a", later).await.unwrap();
        assert_eq!(details.grants.len(), 1);
        assert!(!details.grants[0].live);
        assert_eq!(details.links.len(), 1);
        assert!(details.links[0].expired);

        let forbidden = ctx.service.details(file_id, "user-b", later).await;
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

        let logs = ctx
            .service
            .audit_logs(file_id, "owner-a", &AuditLogQuery::default())
            .await
            .unwrap();
        assert_eq!(logs.len(), 4);
        assert_eq!(logs.last().map(|l| l.action), Some(AuditAction::Upload));

        let forbidden = ctx
            .service
            .audit_logs(file_id, "user-b", &AuditLogQuery::default())
            .await;
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));
    }
}
