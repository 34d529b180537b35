/// Extensions accepted for attachment uploads (document formats only).
pub const ALLOWED_DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "xlsx"];

/// Maximum accepted attachment size (10MB).
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// How long a deletion snapshot stays restorable.
pub const DEFAULT_UNDO_WINDOW_SECS: u64 = 300;

/// Second-resolution stamp embedded in current attachment names.
pub const ATTACHMENT_NAME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Minute-resolution stamp embedded in archived attachment names.
pub const ARCHIVE_NAME_FORMAT: &str = "%Y%m%d%H%M";

/// Prefix marking archived attachment versions inside a record's namespace.
pub const ARCHIVE_PREFIX: &str = "OLD";
