//! Store trait definition.
//!
//! Defines the interface for the persistence backend, enabling test
//! injection and keeping the retrieval layer independent of SQL details.

use crate::core::{Document, Evidence};
use crate::error::Result;
use serde::Serialize;

/// Retrieval options for vector and keyword search.
///
/// The year filter is a disjunction: the exact year, optionally the
/// evergreen year (0), optionally rows with no year at all. Document-type
/// preference and exclusion are exact-match filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Fiscal year to match.
    pub year: i32,
    /// Maximum number of results.
    pub top_k: usize,
    /// Restrict to this `doc_type` when set.
    pub prefer_doc_type: Option<String>,
    /// Exclude this `doc_type` when set.
    pub exclude_doc_type: Option<String>,
    /// Also accept evergreen documents (`exercise_year = 0`).
    pub include_evergreen_year: bool,
    /// Also accept documents with no exercise year.
    pub include_null_year: bool,
}

impl SearchOptions {
    /// Options for one year with both year relaxations enabled.
    #[must_use]
    pub const fn for_year(year: i32, top_k: usize) -> Self {
        Self {
            year,
            top_k,
            prefer_doc_type: None,
            exclude_doc_type: None,
            include_evergreen_year: true,
            include_null_year: true,
        }
    }

    /// Restricts results to the given `doc_type`.
    #[must_use]
    pub fn with_prefer(mut self, doc_type: Option<&str>) -> Self {
        self.prefer_doc_type = doc_type.map(str::to_string);
        self
    }

    /// Excludes the given `doc_type`.
    #[must_use]
    pub fn with_exclude(mut self, doc_type: Option<&str>) -> Self {
        self.exclude_doc_type = doc_type.map(str::to_string);
        self
    }

    /// Enables or disables the evergreen and null-year relaxations.
    #[must_use]
    pub const fn with_year_relaxations(mut self, evergreen: bool, null_year: bool) -> Self {
        self.include_evergreen_year = evergreen;
        self.include_null_year = null_year;
        self
    }
}

/// A chunk ready for insertion, produced by the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct NewChunk<'a> {
    /// Owning document.
    pub document_id: &'a str,
    /// Chunk text (null bytes already stripped).
    pub text: &'a str,
    /// Embedding vector, when one was obtained.
    pub embedding: Option<&'a [f32]>,
    /// `ARTICLE`, `PREAMBULO`, `RULE`, ...
    pub norm_kind: &'a str,
    /// Canonical norm identifier.
    pub norm_id: &'a str,
    /// First source page covered (1-based).
    pub page_start: u32,
    /// Last source page covered (1-based).
    pub page_end: u32,
    /// Ingest-time provenance (chunk index, char offsets, ...).
    pub metadata: serde_json::Value,
}

/// Store statistics for the `status` command.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Number of documents.
    pub document_count: usize,
    /// Number of chunks.
    pub chunk_count: usize,
    /// Number of chunks carrying an embedding.
    pub embedded_count: usize,
}

/// Persistence backend for documents and chunks.
///
/// Reads take `&self`; one query holds one store handle for its whole
/// lifetime. Implementations must be safe to move across threads.
pub trait Store: Send {
    /// Initializes storage (creates the schema). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    fn init(&mut self) -> Result<()>;

    /// Checks if storage is initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    fn is_initialized(&self) -> Result<bool>;

    // ==================== Documents ====================

    /// Inserts or updates a document row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn upsert_document(&mut self, document: &Document) -> Result<()>;

    /// Retrieves a document by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_document(&self, document_id: &str) -> Result<Option<Document>>;

    // ==================== Chunks ====================

    /// Deletes all chunks for a document. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn delete_chunks(&mut self, document_id: &str) -> Result<usize>;

    /// Inserts one chunk, returning its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns an error if insertion fails.
    fn insert_chunk(&mut self, chunk: &NewChunk<'_>) -> Result<i64>;

    // ==================== Retrieval ====================

    /// Article fragments for `(document_id, norm_id)`, `norm_kind =
    /// 'ARTICLE'`, ordered by `chunk_id` ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn article_chunks(
        &self,
        document_id: &str,
        norm_id: &str,
        limit: usize,
    ) -> Result<Vec<Evidence>>;

    /// RMF rule fragments for `(year, rule_id)`, `doc_type = 'rmf'`,
    /// `norm_kind = 'RULE'`. Ordered preferred-document-first, then
    /// `page_start` (nulls last), then `chunk_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn rule_chunks(
        &self,
        year: i32,
        rule_id: &str,
        prefer_document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Evidence>>;

    /// Embedded chunks ranked by ascending cosine distance to the query
    /// vector, under the option filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or an embedding is malformed.
    fn vector_chunks(&self, query_vec: &[f32], options: &SearchOptions) -> Result<Vec<Evidence>>;

    /// Chunks whose text contains any keyword as a case-insensitive
    /// substring, under the option year filters. Ordered by `doc_type`
    /// priority (`ley` > `rmf` > other), then `exercise_year` descending.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn keyword_chunks(
        &self,
        keywords: &[String],
        options: &SearchOptions,
        limit: usize,
    ) -> Result<Vec<Evidence>>;

    // ==================== Utility ====================

    /// Gathers store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    fn stats(&self) -> Result<StoreStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_options_builder() {
        let options = SearchOptions::for_year(2025, 12)
            .with_prefer(Some("rmf"))
            .with_exclude(Some("anexo"))
            .with_year_relaxations(false, false);

        assert_eq!(options.year, 2025);
        assert_eq!(options.top_k, 12);
        assert_eq!(options.prefer_doc_type.as_deref(), Some("rmf"));
        assert_eq!(options.exclude_doc_type.as_deref(), Some("anexo"));
        assert!(!options.include_evergreen_year);
        assert!(!options.include_null_year);
    }

    #[test]
    fn test_search_options_defaults() {
        let options = SearchOptions::for_year(2024, 8);
        assert!(options.include_evergreen_year);
        assert!(options.include_null_year);
        assert!(options.prefer_doc_type.is_none());
        assert!(options.exclude_doc_type.is_none());
    }
}
