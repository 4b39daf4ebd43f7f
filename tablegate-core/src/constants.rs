//! Constants shared across TableGate crates.

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum length of a table name (one leading character plus 62 more).
pub const MAX_TABLE_NAME_LEN: usize = 63;

/// Maximum length of a record identifier.
pub const MAX_RECORD_ID_LEN: usize = 255;

/// Field holding a record's identifier.
pub const ID_FIELD: &str = "id";

/// Field holding a record's creation timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";

/// Field holding a record's last update timestamp.
pub const UPDATED_AT_FIELD: &str = "updated_at";

// ═══════════════════════════════════════════════════════════════════════════════
// PAGINATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Page size used when a list request does not specify one.
pub const DEFAULT_LIMIT: usize = 100;

/// Largest page size a list request may ask for.
pub const MAX_LIMIT: usize = 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Separator between the table namespace and the record id in cache keys.
pub const CACHE_KEY_SEPARATOR: char = ':';
