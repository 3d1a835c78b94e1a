//! # fisco-rs
//!
//! Retrieval engine for Mexican tax law.
//!
//! Given a natural-language question from a tax professional, fisco-rs
//! locates the most authoritative legal fragments (statutes, regulations,
//! yearly RMF rules) in a vector-capable store, assembles a bounded
//! evidence context, and streams a grounded answer from the chat API.
//! The value is the routing and retrieval core: *which* fragments, in
//! *which* order, under *which* year.
//!
//! ## Features
//!
//! - **Routing**: article/rule reference detection with a deterministic
//!   structural-lookup fast path
//! - **Hybrid retrieval**: cosine-ranked vector search merged with
//!   substring keyword search, with a temporal fallback chain honoring
//!   legal-continuity semantics
//! - **Article-first ingestion**: statutory PDFs segmented at article
//!   boundaries with canonical tokens (`69-B-BIS`, `TRANS-PRIMERO`)
//! - **Literal bypass**: verbatim blockquoted citations without LLM
//!   paraphrasing

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod chunking;
pub mod cli;
pub mod config;
pub mod core;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod retrieval;
pub mod routing;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{Document, Evidence, EvidenceOrigin};

// Re-export configuration
pub use config::Config;

// Re-export chunking types
pub use chunking::{
    ChunkingConfig, DraftChunk, chunk_article_first, chunk_rule_first, parse_article_header,
    parse_rule_header,
};

// Re-export routing
pub use routing::{expand_query, resolve_candidate_documents};

// Re-export storage types
pub use storage::{SearchOptions, SqliteStore, Store, StoreStats};

// Re-export embedding types
pub use embedding::{EMBED_DIMENSIONS, Embedder, HashEmbedder, OpenAiEmbedder, cosine_similarity};

// Re-export retrieval types
pub use retrieval::{
    RetrievalOutcome, Route, candidate_years, merge_evidence, retrieve_with_fallback,
};

// Re-export engine types
pub use engine::{
    Answer, AnswerDebug, AnswerRequest, ChatClient, ChatTurn, OpenAiChat, PromptSet, RagEngine,
    ScriptedChat, TokenStream,
};

// Re-export CLI types
pub use cli::{Cli, Commands, execute};
