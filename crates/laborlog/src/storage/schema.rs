//! `SQLite` schema definitions for laborlog.
//!
//! Timestamps are stored as RFC 3339 UTC text with millisecond precision,
//! which keeps lexical and chronological order identical.

/// SQL statement to create the contractions table.
pub const CREATE_CONTRACTIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS contractions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time TEXT NOT NULL,
    end_time TEXT,
    duration_seconds INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `start_time` for the default listing order.
pub const CREATE_START_TIME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_contractions_start_time ON contractions(start_time DESC)
";

/// SQL statement to create the hospitals table.
pub const CREATE_HOSPITALS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS hospitals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    address TEXT,
    notes TEXT,
    is_primary INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index matching the hospital listing order.
pub const CREATE_HOSPITAL_ORDER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_hospitals_order ON hospitals(is_primary DESC, name ASC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Partial unique index allowing at most one primary hospital.
///
/// Applied by migration 2, after duplicate primaries have been demoted.
pub const CREATE_SINGLE_PRIMARY_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_hospitals_single_primary
ON hospitals(is_primary) WHERE is_primary = 1
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_CONTRACTIONS_TABLE,
    CREATE_START_TIME_INDEX,
    CREATE_HOSPITALS_TABLE,
    CREATE_HOSPITAL_ORDER_INDEX,
    CREATE_METADATA_TABLE,
];
