//! Error types for fisco-rs operations.
//!
//! This module provides the error hierarchy using `thiserror` for all
//! engine operations including storage, chunking, retrieval, LLM access,
//! ingestion, and CLI commands.

use thiserror::Error;

/// Result type alias for fisco-rs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for fisco-rs operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage-related errors (database operations).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Chunking-related errors (document segmentation).
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// LLM bridge errors (chat or embedding API).
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Ingestion pipeline errors.
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors (missing env, bad values). Fatal at startup.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Storage-specific errors for database operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Schema not initialized (init command not run).
    #[error("database not initialized. Run: fisco-rs init")]
    NotInitialized,

    /// Stored embedding blob has an unexpected byte length.
    #[error("malformed embedding for chunk {chunk_id}: {len} bytes")]
    MalformedEmbedding {
        /// Chunk whose embedding failed to decode.
        chunk_id: i64,
        /// Length of the stored blob.
        len: usize,
    },

    /// Serialization/deserialization error (chunk metadata JSON).
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Chunking-specific errors for document segmentation.
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// Invalid chunking configuration.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },

    /// Overlap exceeds chunk size.
    #[error("overlap {overlap} must be less than chunk size {size}")]
    OverlapTooLarge {
        /// Overlap size in characters.
        overlap: usize,
        /// Chunk size in characters.
        size: usize,
    },
}

/// LLM bridge errors for the chat and embedding APIs.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Upstream API rejected the request or returned a transport error.
    #[error("API error: {0}")]
    Api(String),

    /// The streaming response failed mid-flight.
    #[error("stream error: {0}")]
    Stream(String),

    /// An external call exceeded its deadline.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// Which call timed out (embedding, chat).
        operation: &'static str,
        /// Deadline in seconds.
        seconds: u64,
    },
}

/// Ingestion pipeline errors.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Source file missing from the base path.
    #[error("source file not found: {path}")]
    MissingFile {
        /// Path that was not found.
        path: String,
    },

    /// PDF text extraction failed.
    #[error("PDF extraction failed: {path}: {reason}")]
    Pdf {
        /// Path to the PDF.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Chunk insertion exhausted its retry budget.
    #[error("insert failed for chunk {chunk_index} after {attempts} attempts: {reason}")]
    InsertFailed {
        /// Index of the chunk within the document.
        chunk_index: usize,
        /// Number of attempts made.
        attempts: usize,
        /// Last failure reason.
        reason: String,
    },

    /// No fiscal year could be determined for an RMF source file.
    #[error("cannot determine exercise year for: {filename} (pass --year)")]
    UnknownYear {
        /// Filename that carried no recognizable year.
        filename: String,
    },
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    /// User cancelled operation.
    #[error("operation cancelled by user")]
    Cancelled,
}

// Implement From traits for external library errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for LlmError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Self::Api(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for Error {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Self::Llm(LlmError::Api(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config {
            message: "OPENAI_API_KEY missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "configuration error: OPENAI_API_KEY missing"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::NotInitialized;
        assert_eq!(
            err.to_string(),
            "database not initialized. Run: fisco-rs init"
        );

        let err = StorageError::MalformedEmbedding {
            chunk_id: 12,
            len: 7,
        };
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn test_chunking_error_display() {
        let err = ChunkingError::OverlapTooLarge {
            overlap: 400,
            size: 300,
        };
        assert_eq!(
            err.to_string(),
            "overlap 400 must be less than chunk size 300"
        );
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Timeout {
            operation: "embedding",
            seconds: 30,
        };
        assert_eq!(err.to_string(), "embedding timed out after 30s");
    }

    #[test]
    fn test_ingest_error_display() {
        let err = IngestError::InsertFailed {
            chunk_index: 42,
            attempts: 5,
            reason: "statement timeout".to_string(),
        };
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("statement timeout"));
    }

    #[test]
    fn test_error_from_storage() {
        let storage_err = StorageError::NotInitialized;
        let err: Error = storage_err.into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: Error = rusqlite_err.into();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_command_error_variants() {
        let err = CommandError::InvalidArgument("--doc".to_string());
        assert!(err.to_string().contains("invalid argument"));

        let err = CommandError::Cancelled;
        assert!(err.to_string().contains("cancelled"));
    }
}
