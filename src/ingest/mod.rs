//! Ingestion pipeline.
//!
//! Re-ingesting a document upserts its row, deletes its chunks, extracts
//! pages, chunks them norm-first, computes embeddings in batches with
//! per-item degradation, and inserts chunks with bounded retries. One
//! document at a time; a failed document does not stop the run.

pub mod manifest;
pub mod pdf;

pub use manifest::{DocumentSpec, laws_baseline, rmf_manifest};
pub use pdf::{PageSource, PdfExtractor};

use crate::chunking::{ChunkingConfig, DraftChunk, chunk_article_first, chunk_rule_first};
use crate::config::Config;
use crate::core::{Document, doc_type};
use crate::embedding::Embedder;
use crate::error::{Error, IngestError, Result};
use crate::storage::{NewChunk, Store};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Maximum insert attempts per chunk.
const MAX_INSERT_ATTEMPTS: usize = 5;

/// Base backoff between insert retries; doubles per attempt.
const INSERT_BACKOFF: Duration = Duration::from_millis(100);

/// Pipeline options.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Chunk and report only; never touch the database.
    pub dry_run: bool,
    /// Embedding batch size.
    pub batch_size: usize,
    /// Windowing configuration.
    pub chunking: ChunkingConfig,
    /// Pause between chunk inserts.
    pub insert_delay: Duration,
}

impl IngestOptions {
    /// Derives options from the runtime configuration.
    #[must_use]
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            dry_run,
            batch_size: config.batch_size_embed,
            chunking: ChunkingConfig::new(config.chunk_chars, config.chunk_overlap_chars),
            insert_delay: Duration::from_millis(50),
        }
    }
}

/// Outcome of one document's ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Document processed.
    pub document_id: String,
    /// Chunks produced by segmentation.
    pub chunk_count: usize,
    /// Distinct canonical norm ids detected.
    pub unique_norms: usize,
    /// Chunks inserted.
    pub inserted: usize,
    /// Chunks skipped or failed (no embedding, exhausted retries).
    pub failed: usize,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

/// Re-ingests one document according to its manifest entry.
///
/// # Errors
///
/// Returns an error when the source file is missing, extraction fails, or
/// a database operation outside the per-chunk retry budget fails.
pub async fn reingest_document(
    store: &mut dyn Store,
    embedder: &dyn Embedder,
    pages_source: &dyn PageSource,
    spec: &DocumentSpec,
    base_path: &Path,
    doc_family: &str,
    options: &IngestOptions,
) -> Result<IngestReport> {
    let pdf_path = base_path.join(&spec.filename);
    if !pdf_path.exists() {
        return Err(IngestError::MissingFile {
            path: pdf_path.display().to_string(),
        }
        .into());
    }

    if !options.dry_run {
        let deleted = store.delete_chunks(&spec.document_id)?;
        info!(document_id = %spec.document_id, deleted, "previous chunks removed");
        store.upsert_document(&Document {
            document_id: spec.document_id.clone(),
            title: spec.title.clone(),
            doc_family: doc_family.to_string(),
            doc_type: spec.doc_type.clone(),
            exercise_year: spec.exercise_year,
            source_filename: spec.filename.clone(),
            source_path: pdf_path.display().to_string(),
            published_date: None,
        })?;
    }

    let pages = pages_source.extract_pages(&pdf_path)?;
    let chunks = chunk_for(spec, &pages, &options.chunking)?;

    let unique_norms: HashSet<&str> = chunks.iter().map(|c| c.norm_id.as_str()).collect();
    info!(
        document_id = %spec.document_id,
        chunks = chunks.len(),
        unique_norms = unique_norms.len(),
        "segmentation complete"
    );

    if options.dry_run {
        return Ok(IngestReport {
            document_id: spec.document_id.clone(),
            chunk_count: chunks.len(),
            unique_norms: unique_norms.len(),
            inserted: 0,
            failed: 0,
            dry_run: true,
        });
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embed_with_degradation(embedder, &texts, options.batch_size).await;

    let mut inserted = 0usize;
    let mut failed = 0usize;
    for (idx, (chunk, embedding)) in chunks.iter().zip(&embeddings).enumerate() {
        let Some(embedding) = embedding else {
            failed += 1;
            continue;
        };

        match insert_with_retry(store, spec, chunk, embedding, idx).await {
            Ok(()) => inserted += 1,
            Err(e) => {
                failed += 1;
                warn!(document_id = %spec.document_id, chunk_index = idx, error = %e, "chunk insert failed");
            }
        }

        if !options.insert_delay.is_zero() {
            tokio::time::sleep(options.insert_delay).await;
        }
    }

    info!(
        document_id = %spec.document_id,
        inserted,
        failed,
        "ingestion complete"
    );

    Ok(IngestReport {
        document_id: spec.document_id.clone(),
        chunk_count: chunks.len(),
        unique_norms: unique_norms.len(),
        inserted,
        failed,
        dry_run: false,
    })
}

/// Chooses the chunker by document type.
fn chunk_for(
    spec: &DocumentSpec,
    pages: &[(u32, String)],
    cfg: &ChunkingConfig,
) -> Result<Vec<DraftChunk>> {
    if spec.doc_type == doc_type::RMF || spec.doc_type == doc_type::ANEXO {
        chunk_rule_first(pages, cfg)
    } else {
        chunk_article_first(pages, cfg)
    }
}

/// Embeds all texts: batch first, one retry per batch, then per-item
/// degradation. Failed items come back as `None` and are skipped by the
/// insert loop.
async fn embed_with_degradation(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Vec<Option<Vec<f32>>> {
    let mut out: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = match embedder.embed_batch(batch).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "embedding batch failed; retrying once");
                embedder.embed_batch(batch).await.ok()
            }
        };

        if let Some(vectors) = vectors {
            out.extend(vectors.into_iter().map(Some));
            continue;
        }

        warn!("embedding batch failed twice; degrading to per-item calls");
        for text in batch {
            match embedder.embed(text).await {
                Ok(v) => out.push(Some(v)),
                Err(e) => {
                    warn!(error = %e, "embedding failed for item");
                    out.push(None);
                }
            }
        }
    }

    out
}

/// True for failures worth retrying (timeouts, lock contention, encoding
/// hiccups).
fn is_transient(error: &Error) -> bool {
    let message = error.to_string().to_lowercase();
    ["timeout", "timed out", "locked", "busy", "reset", "serialization"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Inserts one chunk with exponential backoff on transient failures.
async fn insert_with_retry(
    store: &mut dyn Store,
    spec: &DocumentSpec,
    chunk: &DraftChunk,
    embedding: &[f32],
    chunk_index: usize,
) -> Result<()> {
    let metadata = serde_json::json!({
        "chunk_index": chunk.chunk_index,
        "char_start": chunk.char_start,
        "char_end": chunk.char_end,
        "source": "reingest",
    });

    let new_chunk = NewChunk {
        document_id: &spec.document_id,
        text: &chunk.text,
        embedding: Some(embedding),
        norm_kind: &chunk.norm_kind,
        norm_id: &chunk.norm_id,
        page_start: chunk.page_start,
        page_end: chunk.page_end,
        metadata,
    };

    let mut attempt = 0usize;
    loop {
        match store.insert_chunk(&new_chunk) {
            Ok(_) => return Ok(()),
            Err(e) if attempt + 1 < MAX_INSERT_ATTEMPTS && is_transient(&e) => {
                attempt += 1;
                let backoff = INSERT_BACKOFF * 2u32.saturating_pow(u32::try_from(attempt).unwrap_or(0));
                warn!(chunk_index, attempt, error = %e, "transient insert failure; backing off");
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                return Err(IngestError::InsertFailed {
                    chunk_index,
                    attempts: attempt + 1,
                    reason: e.to_string(),
                }
                .into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::error::LlmError;
    use crate::storage::SqliteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Page source that serves fixed in-memory pages.
    struct FixedPages(Vec<(u32, String)>);

    impl PageSource for FixedPages {
        fn extract_pages(&self, _path: &Path) -> Result<Vec<(u32, String)>> {
            Ok(self.0.clone())
        }
    }

    /// Embedder whose batch endpoint always fails but item calls work.
    struct FlakyBatch {
        inner: HashEmbedder,
        batch_calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyBatch {
        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.inner.embed(text).await
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Api("batch endpoint down".to_string()).into())
        }
    }

    fn law_spec() -> DocumentSpec {
        DocumentSpec {
            filename: "LEY_PRUEBA.pdf".to_string(),
            document_id: "LEY_PRUEBA".to_string(),
            title: "Ley de Prueba".to_string(),
            doc_type: "ley".to_string(),
            exercise_year: 0,
        }
    }

    fn options() -> IngestOptions {
        IngestOptions {
            dry_run: false,
            batch_size: 2,
            chunking: ChunkingConfig::new(200, 40),
            insert_delay: Duration::ZERO,
        }
    }

    fn law_pages() -> FixedPages {
        FixedPages(vec![
            (
                1,
                "LEY DE PRUEBA\nArtículo 1. Primera disposición de la ley".to_string(),
            ),
            (2, "Artículo 2. Segunda disposición\nArtículo 2-A. Adicional".to_string()),
        ])
    }

    fn base_dir_with_pdf(filename: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(filename), b"%PDF-stub").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_reingest_inserts_chunks() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let embedder = HashEmbedder::new(16);
        let dir = base_dir_with_pdf("LEY_PRUEBA.pdf");

        let report = reingest_document(
            &mut store,
            &embedder,
            &law_pages(),
            &law_spec(),
            dir.path(),
            "LEYES_FEDERALES",
            &options(),
        )
        .await
        .unwrap();

        assert_eq!(report.inserted, report.chunk_count);
        assert_eq!(report.failed, 0);
        assert_eq!(report.unique_norms, 4); // PREAMBULO, 1, 2, 2-A

        let doc = store.get_document("LEY_PRUEBA").unwrap().unwrap();
        assert_eq!(doc.doc_family, "LEYES_FEDERALES");
        let evidence = store.article_chunks("LEY_PRUEBA", "2-A", 10).unwrap();
        assert_eq!(evidence.len(), 1);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent_on_norms() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let embedder = HashEmbedder::new(16);
        let dir = base_dir_with_pdf("LEY_PRUEBA.pdf");

        let first = reingest_document(
            &mut store,
            &embedder,
            &law_pages(),
            &law_spec(),
            dir.path(),
            "LEYES_FEDERALES",
            &options(),
        )
        .await
        .unwrap();
        let second = reingest_document(
            &mut store,
            &embedder,
            &law_pages(),
            &law_spec(),
            dir.path(),
            "LEYES_FEDERALES",
            &options(),
        )
        .await
        .unwrap();

        assert_eq!(first.unique_norms, second.unique_norms);
        assert_eq!(first.chunk_count, second.chunk_count);
        // Chunks were replaced, not accumulated
        assert_eq!(store.stats().unwrap().chunk_count, second.chunk_count);
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let embedder = HashEmbedder::new(16);
        let dir = base_dir_with_pdf("LEY_PRUEBA.pdf");
        let mut opts = options();
        opts.dry_run = true;

        let report = reingest_document(
            &mut store,
            &embedder,
            &law_pages(),
            &law_spec(),
            dir.path(),
            "LEYES_FEDERALES",
            &opts,
        )
        .await
        .unwrap();

        assert!(report.dry_run);
        assert!(report.chunk_count > 0);
        assert_eq!(store.stats().unwrap().document_count, 0);
        assert_eq!(store.stats().unwrap().chunk_count, 0);
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let embedder = HashEmbedder::new(16);
        let dir = tempfile::tempdir().unwrap();

        let err = reingest_document(
            &mut store,
            &embedder,
            &law_pages(),
            &law_spec(),
            dir.path(),
            "LEYES_FEDERALES",
            &options(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_batch_failure_degrades_to_items() {
        let embedder = FlakyBatch {
            inner: HashEmbedder::new(16),
            batch_calls: AtomicUsize::new(0),
        };
        let texts = vec!["uno".to_string(), "dos".to_string(), "tres".to_string()];

        let embeddings = embed_with_degradation(&embedder, &texts, 2).await;
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings.iter().all(Option::is_some));
        // Two batches, each tried twice before degrading
        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_rmf_spec_uses_rule_chunker() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let embedder = HashEmbedder::new(16);
        let dir = base_dir_with_pdf("RMF2025.pdf");

        let spec = DocumentSpec {
            filename: "RMF2025.pdf".to_string(),
            document_id: "RMF2025".to_string(),
            title: "RMF 2025".to_string(),
            doc_type: "rmf".to_string(),
            exercise_year: 2025,
        };
        let pages = FixedPages(vec![(
            1,
            "RESOLUCIÓN\n2.1.1. Primera regla\n2.1.2. Segunda regla".to_string(),
        )]);

        reingest_document(
            &mut store,
            &embedder,
            &pages,
            &spec,
            dir.path(),
            "RMF",
            &options(),
        )
        .await
        .unwrap();

        let evidence = store.rule_chunks(2025, "2.1.1", None, 10).unwrap();
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].norm_kind, "RULE");
    }

    #[test]
    fn test_transient_classifier() {
        let timeout: Error = crate::error::StorageError::Database("statement timeout".to_string()).into();
        assert!(is_transient(&timeout));
        let locked: Error = crate::error::StorageError::Database("database is locked".to_string()).into();
        assert!(is_transient(&locked));
        let permanent: Error = crate::error::StorageError::Database("no such table".to_string()).into();
        assert!(!is_transient(&permanent));
    }
}
