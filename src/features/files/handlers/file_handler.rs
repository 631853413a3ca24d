use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::core::extractor::{AppJson, ClientIp};
use crate::features::audit::dtos::{AuditLogDto, AuditLogQuery};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    CreateLinkDto, DownloadedFile, FileDetailsDto, GrantResultDto, IncomingFile, OwnedFileDto,
    ShareFileDto, ShareLinkDto, SharedFileDto, UploadFilesDto, UploadedFileDto,
};
use crate::features::files::services::FileService;
use crate::shared::types::ApiResponse;

/// Upload files
///
/// Accepts multipart/form-data with one to ten `files` parts, each at most 10MB.
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    request_body(
        content = UploadFilesDto,
        content_type = "multipart/form-data",
        description = "One or more `files` parts",
    ),
    responses(
        (status = 201, description = "Files uploaded successfully", body = ApiResponse<Vec<UploadedFileDto>>),
        (status = 400, description = "No files, too many files or a file is too large"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "Request body too large")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_files(
    user: AuthenticatedUser,
    client_ip: ClientIp,
    State(service): State<Arc<FileService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<UploadedFileDto>>>), AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "files" | "file" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                files.push(IncomingFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let uploaded = service
        .upload_files(&user.sub, files, client_ip.as_deref(), Utc::now())
        .await?;

    let message = format!("{} file(s) uploaded successfully", uploaded.len());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(uploaded), Some(message), None)),
    ))
}

/// List files owned by the current user
#[utoipa::path(
    get,
    path = "/api/files/mine",
    tag = "files",
    responses(
        (status = 200, description = "Owned files, newest first", body = ApiResponse<Vec<OwnedFileDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_my_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
) -> Result<Json<ApiResponse<Vec<OwnedFileDto>>>, AppError> {
    let files = service.list_owned(&user.sub, Utc::now()).await?;
    Ok(Json(ApiResponse::list(files)))
}

/// List files other users have shared with the current user
#[utoipa::path(
    get,
    path = "/api/files/shared-with-me",
    tag = "files",
    responses(
        (status = 200, description = "Files with a live grant, newest first", body = ApiResponse<Vec<SharedFileDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_shared_with_me(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
) -> Result<Json<ApiResponse<Vec<SharedFileDto>>>, AppError> {
    let files = service.list_shared_with(&user.sub, Utc::now()).await?;
    Ok(Json(ApiResponse::list(files)))
}

/// Share a file with users
///
/// Users who already hold a live grant keep it unchanged.
#[utoipa::path(
    post,
    path = "/api/files/{id}/share",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    request_body = ShareFileDto,
    responses(
        (status = 200, description = "File shared", body = ApiResponse<GrantResultDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the file owner"),
        (status = 404, description = "File not found"),
        (status = 409, description = "Concurrent sharing changes, retry")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn share_file(
    user: AuthenticatedUser,
    client_ip: ClientIp,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ShareFileDto>,
) -> Result<Json<ApiResponse<GrantResultDto>>, AppError> {
    let result = service
        .share_with_users(
            id,
            &user.sub,
            &dto.grantee_ids,
            dto.ttl_hours,
            client_ip.as_deref(),
            Utc::now(),
        )
        .await?;

    Ok(Json(ApiResponse::success(
        Some(result),
        Some("File shared successfully".to_string()),
        None,
    )))
}

/// Create a share link
///
/// Every call mints a new link.
#[utoipa::path(
    post,
    path = "/api/files/{id}/link",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    request_body = CreateLinkDto,
    responses(
        (status = 201, description = "Share link created", body = ApiResponse<ShareLinkDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the file owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_share_link(
    user: AuthenticatedUser,
    client_ip: ClientIp,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<CreateLinkDto>,
) -> Result<(StatusCode, Json<ApiResponse<ShareLinkDto>>), AppError> {
    let link = service
        .create_share_link(id, &user.sub, dto.ttl_hours, client_ip.as_deref(), Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(link),
            Some("Share link created successfully".to_string()),
            None,
        )),
    ))
}

/// Deactivate a share link
///
/// Deactivation is permanent.
#[utoipa::path(
    delete,
    path = "/api/files/{id}/links/{link_id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID"),
        ("link_id" = String, Path, description = "Share link token")
    ),
    responses(
        (status = 200, description = "Share link deactivated", body = ApiResponse<ShareLinkDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the file owner"),
        (status = 404, description = "File or link not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn deactivate_share_link(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path((id, link_id)): Path<(Uuid, String)>,
) -> Result<Json<ApiResponse<ShareLinkDto>>, AppError> {
    let link = service
        .deactivate_share_link(id, &user.sub, &link_id, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success(
        Some(link),
        Some("Share link deactivated".to_string()),
        None,
    )))
}

/// View a file shared by link
#[utoipa::path(
    get,
    path = "/api/shared/{link_id}",
    tag = "shared",
    params(
        ("link_id" = String, Path, description = "Share link token")
    ),
    responses(
        (status = 200, description = "Shared file summary", body = ApiResponse<SharedFileDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Link inactive or expired"),
        (status = 404, description = "Link not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn view_shared_file(
    user: AuthenticatedUser,
    client_ip: ClientIp,
    State(service): State<Arc<FileService>>,
    Path(link_id): Path<String>,
) -> Result<Json<ApiResponse<SharedFileDto>>, AppError> {
    let file = service
        .view_shared(&link_id, &user.sub, client_ip.as_deref(), Utc::now())
        .await?;

    Ok(Json(ApiResponse::success(Some(file), None, None)))
}

/// Download a file shared by link
#[utoipa::path(
    get,
    path = "/api/shared/{link_id}/download",
    tag = "shared",
    params(
        ("link_id" = String, Path, description = "Share link token")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Link inactive or expired"),
        (status = 404, description = "Link or file content not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_shared_file(
    user: AuthenticatedUser,
    client_ip: ClientIp,
    State(service): State<Arc<FileService>>,
    Path(link_id): Path<String>,
) -> Result<Response, AppError> {
    let file = service
        .download_via_link(&link_id, &user.sub, client_ip.as_deref(), Utc::now())
        .await?;

    Ok(attachment(file))
}

/// Download a file as its owner or a grantee
#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "No access to this file"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_file(
    user: AuthenticatedUser,
    client_ip: ClientIp,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let file = service
        .download(id, &user.sub, client_ip.as_deref(), Utc::now())
        .await?;

    Ok(attachment(file))
}

/// Get sharing details of a file
#[utoipa::path(
    get,
    path = "/api/files/{id}/details",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File with grants and links", body = ApiResponse<FileDetailsDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the file owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_details(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileDetailsDto>>, AppError> {
    let details = service.details(id, &user.sub, Utc::now()).await?;
    Ok(Json(ApiResponse::success(Some(details), None, None)))
}

/// Get the audit trail of a file
///
/// Newest first. Pass the last entry's `timestamp` as `before` and its `id` as `beforeId` to fetch the next page.
#[utoipa::path(
    get,
    path = "/api/files/{id}/audit-logs",
    tag = "audit",
    params(
        ("id" = Uuid, Path, description = "File ID"),
        AuditLogQuery
    ),
    responses(
        (status = 200, description = "Audit entries", body = ApiResponse<Vec<AuditLogDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the file owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_audit_logs(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<ApiResponse<Vec<AuditLogDto>>>, AppError> {
    let logs = service.audit_logs(id, &user.sub, &query).await?;
    Ok(Json(ApiResponse::list(logs)))
}

/// Download response with the original filename preserved
fn attachment(file: DownloadedFile) -> Response {
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&file.filename)
    );

    (
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.data,
    )
        .into_response()
}
