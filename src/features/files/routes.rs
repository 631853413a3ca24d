use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{
    create_share_link, deactivate_share_link, download_file, download_shared_file,
    get_audit_logs, get_file_details, list_my_files, list_shared_with_me, share_file,
    upload_files, view_shared_file,
};
use crate::features::files::services::FileService;

/// Create routes for the files feature; every route expects an authenticated user
pub fn routes(file_service: Arc<FileService>, max_upload_body: usize) -> Router {
    Router::new()
        .route(
            "/api/files",
            post(upload_files).layer(DefaultBodyLimit::max(max_upload_body)),
        )
        .route("/api/files/mine", get(list_my_files))
        .route("/api/files/shared-with-me", get(list_shared_with_me))
        .route("/api/files/{id}/share", post(share_file))
        .route("/api/files/{id}/link", post(create_share_link))
        .route(
            "/api/files/{id}/links/{link_id}",
            delete(deactivate_share_link),
        )
        .route("/api/files/{id}/download", get(download_file))
        .route("/api/files/{id}/details", get(get_file_details))
        .route("/api/files/{id}/audit-logs", get(get_audit_logs))
        .route("/api/shared/{link_id}", get(view_shared_file))
        .route("/api/shared/{link_id}/download", get(download_shared_file))
        .with_state(file_service)
}
