//! `SQLite` store implementation.
//!
//! Documents and chunks persist in a single `SQLite` database. Embeddings
//! are stored as little-endian `f32` BLOBs; vector search filters
//! candidates in SQL and ranks them by cosine distance in-process.

// SQLite stores all integers as i64. These casts are intentional and safe
// because we only store non-negative values that fit the target types.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::core::{Document, Evidence, EvidenceOrigin, doc_type, norm_kind};
use crate::embedding::cosine_similarity;
use crate::error::{Result, StorageError};
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
};
use crate::storage::traits::{NewChunk, SearchOptions, Store, StoreStats};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};

/// Columns shared by every evidence query, in fixed order.
const EVIDENCE_COLUMNS: &str = "c.chunk_id, c.document_id, d.source_filename, d.doc_type, \
     c.norm_kind, c.norm_id, c.text, c.page_start, c.page_end, d.published_date";

/// SQLite-backed store.
///
/// # Examples
///
/// ```no_run
/// use fisco_rs::storage::{SqliteStore, Store};
///
/// let mut store = SqliteStore::open(".fisco/fisco.db").unwrap();
/// store.init().unwrap();
/// ```
pub struct SqliteStore {
    /// `SQLite` connection.
    conn: Connection,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens or creates a `SQLite` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Database(e.to_string()))?;
            }
        }

        let conn = Connection::open(&path).map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;

        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Creates an in-memory database. Useful for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;
        Ok(Self { conn, path: None })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Maps an evidence row (in [`EVIDENCE_COLUMNS`] order).
    fn evidence_from_row(
        row: &Row<'_>,
        score: f32,
        origin: EvidenceOrigin,
    ) -> rusqlite::Result<Evidence> {
        Ok(Evidence {
            chunk_id: row.get(0)?,
            document_id: row.get(1)?,
            source_filename: row.get(2)?,
            doc_type: row.get(3)?,
            norm_kind: row.get(4)?,
            norm_id: row.get(5)?,
            text: row.get(6)?,
            page_start: row.get::<_, Option<i64>>(7)?.map(|p| p as u32),
            page_end: row.get::<_, Option<i64>>(8)?.map(|p| p as u32),
            published_date: row.get(9)?,
            score,
            origin,
        })
    }

    /// SQL fragment for the year disjunction, bound as `(?a, ?b, ?c)` =
    /// `(year, include_evergreen, include_null)` at the given offsets.
    const fn year_clause(year_p: u8, evergreen_p: u8, null_p: u8) -> YearClause {
        YearClause {
            year_p,
            evergreen_p,
            null_p,
        }
    }
}

/// Positional parameters of the year disjunction.
struct YearClause {
    year_p: u8,
    evergreen_p: u8,
    null_p: u8,
}

impl YearClause {
    fn to_sql(&self) -> String {
        format!(
            "(d.exercise_year = ?{y} OR (?{e} AND d.exercise_year = 0) \
             OR (?{n} AND d.exercise_year IS NULL))",
            y = self.year_p,
            e = self.evergreen_p,
            n = self.null_p
        )
    }
}

/// Encodes an embedding as a little-endian `f32` BLOB.
#[must_use]
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decodes a little-endian `f32` BLOB back into an embedding.
///
/// # Errors
///
/// Returns an error if the blob length is not a multiple of 4.
pub fn blob_to_embedding(chunk_id: i64, blob: &[u8]) -> std::result::Result<Vec<f32>, StorageError> {
    if blob.len() % 4 != 0 {
        return Err(StorageError::MalformedEmbedding {
            chunk_id,
            len: blob.len(),
        });
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

impl Store for SqliteStore {
    fn init(&mut self) -> Result<()> {
        let is_init: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;

        if is_init == 0 {
            self.conn
                .execute_batch(SCHEMA_SQL)
                .map_err(StorageError::from)?;
            self.conn
                .execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION.to_string()])
                .map_err(StorageError::from)?;
        } else {
            // Nothing to migrate at version 1; re-validate the stored version
            let _: Option<String> = self
                .conn
                .query_row(GET_VERSION_SQL, [], |row| row.get(0))
                .optional()
                .map_err(StorageError::from)?;
        }

        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count > 0)
    }

    // ==================== Documents ====================

    fn upsert_document(&mut self, document: &Document) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT INTO documents (
                document_id, title, doc_family, doc_type, exercise_year,
                source_filename, source_path, published_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(document_id) DO UPDATE SET
                title = excluded.title,
                doc_family = excluded.doc_family,
                doc_type = excluded.doc_type,
                exercise_year = excluded.exercise_year,
                source_filename = excluded.source_filename,
                source_path = excluded.source_path,
                published_date = COALESCE(excluded.published_date, documents.published_date)
        ",
                params![
                    document.document_id,
                    document.title,
                    document.doc_family,
                    document.doc_type,
                    document.exercise_year,
                    document.source_filename,
                    document.source_path,
                    document.published_date,
                ],
            )
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        let result = self
            .conn
            .query_row(
                r"
            SELECT document_id, title, doc_family, doc_type, exercise_year,
                   source_filename, source_path, published_date
            FROM documents WHERE document_id = ?1
        ",
                params![document_id],
                |row| {
                    Ok(Document {
                        document_id: row.get(0)?,
                        title: row.get(1)?,
                        doc_family: row.get(2)?,
                        doc_type: row.get(3)?,
                        exercise_year: row.get::<_, Option<i32>>(4)?.unwrap_or(0),
                        source_filename: row.get(5)?,
                        source_path: row.get(6)?,
                        published_date: row.get(7)?,
                    })
                },
            )
            .optional()
            .map_err(StorageError::from)?;

        Ok(result)
    }

    // ==================== Chunks ====================

    fn delete_chunks(&mut self, document_id: &str) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM chunks WHERE document_id = ?1", params![
                document_id
            ])
            .map_err(StorageError::from)?;
        Ok(deleted)
    }

    fn insert_chunk(&mut self, chunk: &NewChunk<'_>) -> Result<i64> {
        let metadata = serde_json::to_string(&chunk.metadata).map_err(StorageError::from)?;
        let blob = chunk.embedding.map(embedding_to_blob);

        self.conn
            .execute(
                r"
            INSERT INTO chunks (
                document_id, text, embedding, norm_kind, norm_id,
                page_start, page_end, metadata
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ",
                params![
                    chunk.document_id,
                    chunk.text,
                    blob,
                    chunk.norm_kind,
                    chunk.norm_id,
                    chunk.page_start,
                    chunk.page_end,
                    metadata,
                ],
            )
            .map_err(StorageError::from)?;

        Ok(self.conn.last_insert_rowid())
    }

    // ==================== Retrieval ====================

    fn article_chunks(
        &self,
        document_id: &str,
        norm_id: &str,
        limit: usize,
    ) -> Result<Vec<Evidence>> {
        let sql = format!(
            r"
            SELECT {EVIDENCE_COLUMNS}
            FROM chunks c
            JOIN documents d ON c.document_id = d.document_id
            WHERE c.document_id = ?1 AND c.norm_kind = ?2 AND c.norm_id = ?3
            ORDER BY c.chunk_id ASC
            LIMIT ?4
        "
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from)?;
        let rows = stmt
            .query_map(
                params![document_id, norm_kind::ARTICLE, norm_id, limit as i64],
                |row| Self::evidence_from_row(row, 1.0, EvidenceOrigin::ArticleLookup),
            )
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(rows)
    }

    fn rule_chunks(
        &self,
        year: i32,
        rule_id: &str,
        prefer_document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Evidence>> {
        let sql = format!(
            r"
            SELECT {EVIDENCE_COLUMNS}
            FROM chunks c
            JOIN documents d ON c.document_id = d.document_id
            WHERE d.doc_type = ?1 AND d.exercise_year = ?2
              AND c.norm_kind = ?3 AND c.norm_id = ?4
            ORDER BY
                CASE WHEN ?5 IS NOT NULL AND c.document_id = ?5 THEN 0 ELSE 1 END,
                CASE WHEN c.page_start IS NULL THEN 1 ELSE 0 END,
                c.page_start ASC,
                c.chunk_id ASC
            LIMIT ?6
        "
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from)?;
        let rows = stmt
            .query_map(
                params![
                    doc_type::RMF,
                    year,
                    norm_kind::RULE,
                    rule_id,
                    prefer_document_id,
                    limit as i64
                ],
                |row| Self::evidence_from_row(row, 1.0, EvidenceOrigin::RmfRuleLookup),
            )
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(rows)
    }

    fn vector_chunks(&self, query_vec: &[f32], options: &SearchOptions) -> Result<Vec<Evidence>> {
        let year = Self::year_clause(1, 2, 3).to_sql();
        let sql = format!(
            r"
            SELECT {EVIDENCE_COLUMNS}, c.embedding
            FROM chunks c
            JOIN documents d ON c.document_id = d.document_id
            WHERE c.embedding IS NOT NULL
              AND {year}
              AND (?4 IS NULL OR d.doc_type = ?4)
              AND (?5 IS NULL OR d.doc_type <> ?5)
        "
        );

        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from)?;
        let candidates = stmt
            .query_map(
                params![
                    options.year,
                    options.include_evergreen_year,
                    options.include_null_year,
                    options.prefer_doc_type,
                    options.exclude_doc_type,
                ],
                |row| {
                    let evidence = Self::evidence_from_row(row, 0.0, EvidenceOrigin::Vector)?;
                    let blob: Vec<u8> = row.get(10)?;
                    Ok((evidence, blob))
                },
            )
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        let mut scored: Vec<Evidence> = Vec::with_capacity(candidates.len());
        for (mut evidence, blob) in candidates {
            let embedding = blob_to_embedding(evidence.chunk_id, &blob)?;
            evidence.score = cosine_similarity(query_vec, &embedding);
            scored.push(evidence);
        }

        // Ascending cosine distance == descending similarity
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(options.top_k);
        Ok(scored)
    }

    fn keyword_chunks(
        &self,
        keywords: &[String],
        options: &SearchOptions,
        limit: usize,
    ) -> Result<Vec<Evidence>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let year = Self::year_clause(1, 2, 3).to_sql();
        let keyword_clause = (0..keywords.len())
            .map(|i| format!("instr(lower(c.text), ?{}) > 0", i + 4))
            .collect::<Vec<_>>()
            .join(" OR ");
        let limit_p = keywords.len() + 4;
        let sql = format!(
            r"
            SELECT {EVIDENCE_COLUMNS}
            FROM chunks c
            JOIN documents d ON c.document_id = d.document_id
            WHERE {year}
              AND ({keyword_clause})
            ORDER BY
                CASE d.doc_type WHEN 'ley' THEN 0 WHEN 'rmf' THEN 1 ELSE 2 END,
                d.exercise_year DESC,
                c.chunk_id ASC
            LIMIT ?{limit_p}
        "
        );

        let mut values: Vec<rusqlite::types::Value> = vec![
            options.year.into(),
            i64::from(options.include_evergreen_year).into(),
            i64::from(options.include_null_year).into(),
        ];
        for keyword in keywords {
            values.push(keyword.to_lowercase().into());
        }
        values.push((limit as i64).into());

        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values), |row| {
                Self::evidence_from_row(row, 0.5, EvidenceOrigin::Keyword)
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(rows)
    }

    // ==================== Utility ====================

    #[allow(clippy::cast_possible_wrap)]
    fn stats(&self) -> Result<StoreStats> {
        let document_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        let chunk_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        let embedded_count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .map_err(StorageError::from)?;

        Ok(StoreStats {
            document_count: document_count as usize,
            chunk_count: chunk_count as usize,
            embedded_count: embedded_count as usize,
        })
    }
}
