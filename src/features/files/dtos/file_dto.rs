use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::files::models::{FileRecord, ShareLink, UserGrant};

/// Upload form for OpenAPI documentation.
/// The handler reads the multipart body directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFilesDto {
    /// One to ten files, each at most 10MB
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: Vec<String>,
}

/// One file part taken from an upload request
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Bytes and headers for a download response
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileDto {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&FileRecord> for UploadedFileDto {
    fn from(file: &FileRecord) -> Self {
        Self {
            id: file.id,
            original_filename: file.original_filename.clone(),
            content_type: file.content_type.clone(),
            file_size: file.file_size,
            created_at: file.created_at,
        }
    }
}

/// A file in the owner's listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnedFileDto {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    /// Users currently holding a live grant
    pub shared_with_count: usize,
    /// Links that are active and not expired
    pub active_link_count: usize,
}

/// A file someone else made available to the caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedFileDto {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    /// When the caller's access ends; absent for permanent access
    pub access_expires_at: Option<DateTime<Utc>>,
}

impl SharedFileDto {
    pub fn new(file: &FileRecord, access_expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: file.id,
            original_filename: file.original_filename.clone(),
            content_type: file.content_type.clone(),
            file_size: file.file_size,
            owner_id: file.owner_id.clone(),
            created_at: file.created_at,
            access_expires_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantDto {
    pub grantee_id: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub live: bool,
}

impl GrantDto {
    pub fn new(grant: &UserGrant, now: DateTime<Utc>) -> Self {
        Self {
            grantee_id: grant.grantee_id.clone(),
            granted_at: grant.granted_at,
            expires_at: grant.expires_at,
            live: grant.is_live(now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinkDto {
    pub link_id: String,
    /// Web client URL recipients open
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub expired: bool,
}

impl ShareLinkDto {
    pub fn new(link: &ShareLink, frontend_url: &str, now: DateTime<Utc>) -> Self {
        Self {
            link_id: link.link_id.clone(),
            url: format!("{}/shared/{}", frontend_url, link.link_id),
            created_at: link.created_at,
            expires_at: link.expires_at,
            is_active: link.is_active,
            expired: link.is_expired(now),
        }
    }
}

/// Owner view of a file with its full sharing state
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileDetailsDto {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    /// Every grant ever made, expired ones flagged
    pub grants: Vec<GrantDto>,
    /// Active links, expired ones flagged
    pub links: Vec<ShareLinkDto>,
}

/// Request DTO for sharing a file with users
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareFileDto {
    /// User ids to grant access to; at least one is required
    #[schema(example = json!(["user-b", "user-c"]))]
    pub grantee_ids: Vec<String>,
    /// Hours until the grants expire; omit or use 0 for permanent access
    #[schema(example = 24)]
    pub ttl_hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkDto {
    /// Hours until the link expires; omit or use 0 for a permanent link
    #[schema(example = 24)]
    pub ttl_hours: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantResultDto {
    pub added: usize,
    pub total_grants: usize,
}
