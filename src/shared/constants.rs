/// Maximum number of files accepted by a single upload request
pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// Maximum size of a single uploaded file in bytes (10MB)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default and maximum number of audit entries returned per page
pub const MAX_AUDIT_PAGE_SIZE: i64 = 100;

/// Bytes of OS randomness behind each share link token (256 bits)
pub const SHARE_LINK_TOKEN_BYTES: usize = 32;

/// Attempts at a versioned share write before giving up with a conflict
pub const MAX_SHARE_WRITE_ATTEMPTS: usize = 8;
