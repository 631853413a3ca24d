use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::audit::{dtos as audit_dtos, models as audit_models};
use crate::features::auth;
use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handler::get_me,
        // Files
        files_handlers::upload_files,
        files_handlers::list_my_files,
        files_handlers::list_shared_with_me,
        files_handlers::share_file,
        files_handlers::create_share_link,
        files_handlers::deactivate_share_link,
        files_handlers::download_file,
        files_handlers::get_file_details,
        // Shared links
        files_handlers::view_shared_file,
        files_handlers::download_shared_file,
        // Audit
        files_handlers::get_audit_logs,
    ),
    components(
        schemas(
            Meta,
            // Auth
            auth::dto::MeResponseDto,
            ApiResponse<auth::dto::MeResponseDto>,
            // Files
            files_dtos::UploadFilesDto,
            files_dtos::UploadedFileDto,
            files_dtos::OwnedFileDto,
            files_dtos::SharedFileDto,
            files_dtos::GrantDto,
            files_dtos::ShareLinkDto,
            files_dtos::FileDetailsDto,
            files_dtos::ShareFileDto,
            files_dtos::CreateLinkDto,
            files_dtos::GrantResultDto,
            ApiResponse<Vec<files_dtos::UploadedFileDto>>,
            ApiResponse<Vec<files_dtos::OwnedFileDto>>,
            ApiResponse<Vec<files_dtos::SharedFileDto>>,
            ApiResponse<files_dtos::SharedFileDto>,
            ApiResponse<files_dtos::ShareLinkDto>,
            ApiResponse<files_dtos::FileDetailsDto>,
            ApiResponse<files_dtos::GrantResultDto>,
            // Audit
            audit_models::AuditAction,
            audit_dtos::AuditLogDto,
            ApiResponse<Vec<audit_dtos::AuditLogDto>>,
        )
    ),
    tags(
        (name = "auth", description = "Authenticated identity"),
        (name = "files", description = "File upload, listing, sharing and download"),
        (name = "shared", description = "Access through share links"),
        (name = "audit", description = "Per-file audit trail (owner only)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Fileshare API",
        version = "0.1.0",
        description = "File sharing with time-boxed grants and share links",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to the OpenAPI document
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/me",
            "/api/files",
            "/api/files/mine",
            "/api/files/shared-with-me",
            "/api/files/{id}/share",
            "/api/files/{id}/link",
            "/api/files/{id}/links/{link_id}",
            "/api/files/{id}/download",
            "/api/files/{id}/details",
            "/api/files/{id}/audit-logs",
            "/api/shared/{link_id}",
            "/api/shared/{link_id}/download",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
