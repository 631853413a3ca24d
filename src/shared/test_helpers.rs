use std::sync::Arc;

use axum::{extract::Request, middleware::Next, response::Response, Router};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::features::audit::repositories::{FailingAuditStore, InMemoryAuditStore};
use crate::features::audit::AuditStore;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::routes as auth_routes;
use crate::features::files::dtos::IncomingFile;
use crate::features::files::repositories::InMemoryFileRepository;
use crate::features::files::{routes as files_routes, FileService};
use crate::modules::storage::InMemoryContentStore;
use crate::shared::constants::{MAX_FILES_PER_UPLOAD, MAX_FILE_SIZE};

/// Header naming the user a test request acts as
pub const TEST_USER_HEADER: &str = "x-test-user";

pub const TEST_FRONTEND_URL: &str = "https://files.example.test";

/// Stand-in for the bearer token middleware: trusts `x-test-user`
async fn inject_test_user_middleware(mut request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get(TEST_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(AuthenticatedUser::new);

    if let Some(user) = user {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

pub fn with_test_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_test_user_middleware))
}

/// A `FileService` wired to in-memory fakes the test can inspect
pub struct TestContext {
    pub service: Arc<FileService>,
    pub files: Arc<InMemoryFileRepository>,
    pub audit: Arc<InMemoryAuditStore>,
    pub content: Arc<InMemoryContentStore>,
}

impl TestContext {
    pub fn new() -> Self {
        let audit = Arc::new(InMemoryAuditStore::new());
        Self::build(audit.clone(), audit)
    }

    /// Every audit write fails; `audit` stays empty
    pub fn with_failing_audit() -> Self {
        Self::build(
            Arc::new(FailingAuditStore),
            Arc::new(InMemoryAuditStore::new()),
        )
    }

    fn build(audit_store: Arc<dyn AuditStore>, audit: Arc<InMemoryAuditStore>) -> Self {
        let files = Arc::new(InMemoryFileRepository::new());
        let content = Arc::new(InMemoryContentStore::new());
        let service = Arc::new(FileService::new(
            files.clone(),
            audit_store,
            content.clone(),
            TEST_FRONTEND_URL,
        ));

        Self {
            service,
            files,
            audit,
            content,
        }
    }

    /// Upload one file and return its id
    pub async fn upload(&self, owner: &str, filename: &str, data: Vec<u8>, now: DateTime<Utc>) -> Uuid {
        let uploaded = self
            .service
            .upload_files(
                owner,
                vec![IncomingFile {
                    filename: filename.to_string(),
                    content_type: guess_content_type(filename).to_string(),
                    data,
                }],
                None,
                now,
            )
            .await
            .unwrap();
        uploaded[0].id
    }

    /// The protected API routes, with identity taken from `x-test-user`
    pub fn router(&self) -> Router {
        let routes = Router::new()
            .merge(auth_routes::protected_routes())
            .merge(files_routes(
                self.service.clone(),
                MAX_FILES_PER_UPLOAD * MAX_FILE_SIZE + 1024 * 1024,
            ));
        with_test_auth(routes)
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
