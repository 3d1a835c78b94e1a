//! Environment-driven configuration.
//!
//! All tunables come from environment variables with compiled defaults.
//! Missing credentials are a fatal startup error; everything else falls
//! back to its default.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".fisco/fisco.db";

/// Default embedding model.
pub const DEFAULT_MODEL_EMBED: &str = "text-embedding-3-small";

/// Default chat model.
pub const DEFAULT_MODEL_CHAT: &str = "gpt-4o";

/// Default number of evidence entries returned by hybrid retrieval.
pub const DEFAULT_TOP_K: usize = 12;

/// Default sub-chunk window in characters.
pub const DEFAULT_CHUNK_CHARS: usize = 3_500;

/// Default overlap between consecutive sub-chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP_CHARS: usize = 400;

/// Default embedding batch size during ingestion.
pub const DEFAULT_BATCH_SIZE_EMBED: usize = 15;

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key. Empty in offline mode.
    pub openai_api_key: String,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Embedding model identifier.
    pub model_embed: String,
    /// Chat model identifier.
    pub model_chat: String,
    /// Hybrid retrieval result budget.
    pub top_k: usize,
    /// Sub-chunk window in characters.
    pub chunk_chars: usize,
    /// Overlap between consecutive sub-chunks in characters.
    pub chunk_overlap_chars: usize,
    /// Embedding batch size during ingestion.
    pub batch_size_embed: usize,
}

impl Config {
    /// Resolves configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `OPENAI_API_KEY` is missing or empty.
    pub fn from_env() -> Result<Self> {
        let openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        if openai_api_key.trim().is_empty() {
            return Err(Error::Config {
                message: "OPENAI_API_KEY is not set".to_string(),
            });
        }

        let mut config = Self::offline();
        config.openai_api_key = openai_api_key;
        Ok(config)
    }

    /// Resolves configuration without requiring credentials.
    ///
    /// Used by commands that never reach the OpenAI API (`init`, `status`,
    /// dry-run ingestion).
    #[must_use]
    pub fn offline() -> Self {
        Self {
            openai_api_key: String::new(),
            db_path: std::env::var("FISCO_DB_PATH")
                .map_or_else(|_| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
            model_embed: env_or("MODEL_EMBED", DEFAULT_MODEL_EMBED),
            model_chat: env_or("MODEL_CHAT", DEFAULT_MODEL_CHAT),
            top_k: env_parse("TOP_K_DEFAULT", DEFAULT_TOP_K),
            chunk_chars: env_parse("CHUNK_CHARS", DEFAULT_CHUNK_CHARS),
            chunk_overlap_chars: env_parse("CHUNK_OVERLAP_CHARS", DEFAULT_CHUNK_OVERLAP_CHARS),
            batch_size_embed: env_parse("BATCH_SIZE_EMBED", DEFAULT_BATCH_SIZE_EMBED),
        }
    }
}

/// Reads a string variable with a default.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Reads and parses a variable, falling back to the default on absence or
/// parse failure.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_defaults() {
        let config = Config::offline();
        assert_eq!(config.model_chat, DEFAULT_MODEL_CHAT);
        assert_eq!(config.model_embed, DEFAULT_MODEL_EMBED);
        assert_eq!(config.chunk_chars, DEFAULT_CHUNK_CHARS);
        assert_eq!(config.chunk_overlap_chars, DEFAULT_CHUNK_OVERLAP_CHARS);
        assert_eq!(config.batch_size_embed, DEFAULT_BATCH_SIZE_EMBED);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert!(config.openai_api_key.is_empty());
    }

    #[test]
    fn test_env_parse_fallback() {
        // Unset or garbage values fall back to the default
        assert_eq!(env_parse("FISCO_TEST_UNSET_VAR_XYZ", 7usize), 7);
    }

    #[test]
    fn test_env_or_fallback() {
        assert_eq!(env_or("FISCO_TEST_UNSET_VAR_XYZ", "abc"), "abc");
    }
}
