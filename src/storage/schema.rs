//! Database schema definitions.
//!
//! Contains the SQL schema for the fisco-rs `SQLite` database.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for initial database setup.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Legal source documents
CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    doc_family TEXT NOT NULL,
    doc_type TEXT NOT NULL,
    exercise_year INTEGER,          -- 0 = evergreen, NULL = unknown
    source_filename TEXT NOT NULL,
    source_path TEXT NOT NULL,
    published_date TEXT
);

-- Index for year-filtered retrieval
CREATE INDEX IF NOT EXISTS idx_documents_type_year
    ON documents(doc_type, exercise_year);

-- Retrievable text fragments
CREATE TABLE IF NOT EXISTS chunks (
    chunk_id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id TEXT NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB,                 -- f32 little-endian array
    norm_kind TEXT NOT NULL,
    norm_id TEXT NOT NULL,
    page_start INTEGER,
    page_end INTEGER,
    metadata TEXT,                  -- JSON provenance
    FOREIGN KEY (document_id) REFERENCES documents(document_id) ON DELETE CASCADE
);

-- Index for structural lookup by canonical norm token
CREATE INDEX IF NOT EXISTS idx_chunks_norm
    ON chunks(document_id, norm_kind, norm_id);

-- Index for chunk deletion on re-ingest
CREATE INDEX IF NOT EXISTS idx_chunks_document
    ON chunks(document_id);
";

/// SQL to check if the schema is initialized.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='schema_info';
";

/// SQL to get the schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set the schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";
