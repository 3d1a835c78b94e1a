//! CLI command implementations.

use crate::cli::parser::{Cli, Commands, ReingestTarget};
use crate::config::Config;
use crate::embedding::{EMBED_DIMENSIONS, Embedder, HashEmbedder, OpenAiEmbedder};
use crate::engine::{AnswerRequest, OpenAiChat, PromptSet, RagEngine};
use crate::error::{CommandError, Error, Result, StorageError};
use crate::ingest::{
    DocumentSpec, IngestOptions, PdfExtractor, laws_baseline, reingest_document, rmf_manifest,
};
use crate::storage::{SqliteStore, Store};
use futures_util::StreamExt;
use std::fmt::Write as FmtWrite;
use std::io::{self, Write as IoWrite};
use std::path::Path;
use tracing::warn;

/// Executes the parsed CLI command, returning its final output.
///
/// # Errors
///
/// Returns an error if the command fails. Engine failures inside `ask`
/// are rendered as the single-line RAG-engine error response instead.
pub async fn execute(cli: &Cli) -> Result<String> {
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init { force } => cmd_init(&db_path, *force),
        Commands::Status => cmd_status(&db_path),
        Commands::Reingest { target } => cmd_reingest(&db_path, target).await,
        Commands::Ask {
            question,
            ejercicio,
            regimen,
            trace,
        } => cmd_ask(&db_path, question, *ejercicio, regimen.as_deref(), *trace).await,
    }
}

fn cmd_init(db_path: &Path, force: bool) -> Result<String> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path)?;
    }

    let mut store = SqliteStore::open(db_path)?;
    store.init()?;

    Ok(format!(
        "Base de datos inicializada: {}\n",
        db_path.display()
    ))
}

fn cmd_status(db_path: &Path) -> Result<String> {
    if !db_path.exists() {
        return Err(StorageError::NotInitialized.into());
    }

    let store = SqliteStore::open(db_path)?;
    if !store.is_initialized()? {
        return Err(StorageError::NotInitialized.into());
    }

    let stats = store.stats()?;
    let mut out = String::new();
    let _ = writeln!(out, "Base de datos: {}", db_path.display());
    let _ = writeln!(out, "Documentos:    {}", stats.document_count);
    let _ = writeln!(out, "Chunks:        {}", stats.chunk_count);
    let _ = writeln!(out, "Con embedding: {}", stats.embedded_count);
    Ok(out)
}

/// Builds the embedder for ingestion. Dry runs never embed, so they get
/// the deterministic fallback and skip the credential requirement.
fn ingest_embedder(dry_run: bool) -> Result<Box<dyn Embedder>> {
    if dry_run {
        return Ok(Box::new(HashEmbedder::new(EMBED_DIMENSIONS)));
    }
    let config = Config::from_env()?;
    Ok(Box::new(OpenAiEmbedder::new(
        &config.openai_api_key,
        &config.model_embed,
    )))
}

async fn cmd_reingest(db_path: &Path, target: &ReingestTarget) -> Result<String> {
    let (specs, base_path, doc_family, dry_run) = match target {
        ReingestTarget::Laws {
            base_path,
            all,
            doc,
            dry_run,
        } => {
            if !all && doc.is_empty() {
                return Err(CommandError::InvalidArgument(
                    "pass --all or at least one --doc".to_string(),
                )
                .into());
            }

            let mut specs = laws_baseline();
            if !doc.is_empty() {
                let wanted: std::collections::HashSet<&str> =
                    doc.iter().map(String::as_str).collect();
                let known: std::collections::HashSet<&str> =
                    specs.iter().map(|s| s.document_id.as_str()).collect();
                for missing in wanted.difference(&known) {
                    warn!(document_id = %missing, "document id not in baseline manifest");
                }
                specs.retain(|s| wanted.contains(s.document_id.as_str()));
            }

            (specs, base_path.clone(), "LEYES_FEDERALES", *dry_run)
        }
        ReingestTarget::Rmf {
            base_path,
            year,
            dry_run,
        } => (
            rmf_manifest(base_path, *year)?,
            base_path.clone(),
            "RMF",
            *dry_run,
        ),
    };

    if !base_path.exists() {
        return Err(CommandError::InvalidArgument(format!(
            "base path does not exist: {}",
            base_path.display()
        ))
        .into());
    }

    let mut store = SqliteStore::open(db_path)?;
    store.init()?;

    let embedder = ingest_embedder(dry_run)?;
    let extractor = PdfExtractor;
    let options = IngestOptions::from_config(&Config::offline(), dry_run);

    let mut out = String::new();
    let mut ok = 0usize;
    let mut bad = 0usize;

    for (i, spec) in specs.iter().enumerate() {
        let _ = writeln!(
            out,
            "[{}/{}] {} ({})",
            i + 1,
            specs.len(),
            spec.title,
            spec.document_id
        );

        match run_one(&mut store, embedder.as_ref(), &extractor, spec, &base_path, doc_family, &options)
            .await
        {
            Ok(line) => {
                ok += 1;
                let _ = writeln!(out, "    {line}");
            }
            Err(e) => {
                bad += 1;
                warn!(document_id = %spec.document_id, error = %e, "document ingestion failed");
                let _ = writeln!(out, "    error: {e}");
            }
        }
    }

    let _ = writeln!(out, "Éxitos: {ok} | Fallos: {bad}");
    Ok(out)
}

async fn run_one(
    store: &mut SqliteStore,
    embedder: &dyn Embedder,
    extractor: &PdfExtractor,
    spec: &DocumentSpec,
    base_path: &Path,
    doc_family: &str,
    options: &IngestOptions,
) -> Result<String> {
    let report =
        reingest_document(store, embedder, extractor, spec, base_path, doc_family, options).await?;

    Ok(if report.dry_run {
        format!(
            "dry-run: {} chunks, {} normas únicas",
            report.chunk_count, report.unique_norms
        )
    } else {
        format!(
            "{} chunks, {} normas únicas, {} insertados, {} fallidos",
            report.chunk_count, report.unique_norms, report.inserted, report.failed
        )
    })
}

async fn cmd_ask(
    db_path: &Path,
    question: &str,
    ejercicio: i32,
    regimen: Option<&str>,
    trace: bool,
) -> Result<String> {
    let config = Config::from_env()?;

    let mut store = SqliteStore::open(db_path)?;
    store.init()?;

    let engine = RagEngine::new(
        store,
        OpenAiEmbedder::new(&config.openai_api_key, &config.model_embed),
        OpenAiChat::new(&config.openai_api_key, &config.model_chat),
        PromptSet::load(None),
        config.top_k,
    );

    let request = AnswerRequest {
        question: question.to_string(),
        regimen: regimen.map(str::to_string),
        ejercicio: Some(ejercicio),
        history: Vec::new(),
    };

    let answer = match engine.answer(request).await {
        Ok(answer) => answer,
        // The chat surface always returns a response; cascading failures
        // collapse to the single-line engine error
        Err(e) => return Ok(format!("Error en el motor RAG: {e}\n")),
    };

    let crate::engine::Answer { mut stream, debug } = answer;
    let mut stdout = io::stdout();
    let mut stream_error: Option<Error> = None;

    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(text) => {
                if write!(stdout, "{text}").is_err() {
                    // Consumer went away; stop upstream work
                    return Ok(String::new());
                }
                let _ = stdout.flush();
            }
            Err(e) => {
                stream_error = Some(e);
                break;
            }
        }
    }
    let _ = writeln!(stdout);

    if let Some(e) = stream_error {
        return Ok(format!("Error en el motor RAG: {e}\n"));
    }

    if trace {
        let rendered = serde_json::to_string_pretty(&debug)
            .unwrap_or_else(|_| "{}".to_string());
        return Ok(format!("[trace] {rendered}\n"));
    }

    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("fisco.db");

        let out = cmd_init(&db_path, false).unwrap();
        assert!(out.contains("inicializada"));

        let out = cmd_status(&db_path).unwrap();
        assert!(out.contains("Documentos:    0"));
    }

    #[test]
    fn test_status_without_init_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("missing.db");
        assert!(cmd_status(&db_path).is_err());
    }

    #[test]
    fn test_init_force_resets() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("fisco.db");
        cmd_init(&db_path, false).unwrap();
        cmd_init(&db_path, true).unwrap();
        assert!(cmd_status(&db_path).is_ok());
    }

    #[tokio::test]
    async fn test_reingest_requires_scope() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("fisco.db");
        let target = ReingestTarget::Laws {
            base_path: dir.path().to_path_buf(),
            all: false,
            doc: vec![],
            dry_run: true,
        };
        assert!(cmd_reingest(&db_path, &target).await.is_err());
    }
}
