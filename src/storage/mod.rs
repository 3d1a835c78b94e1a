//! Persistent storage for documents and chunks.
//!
//! Provides the [`Store`] trait and its `SQLite` implementation.

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use sqlite::{SqliteStore, blob_to_embedding, embedding_to_blob};
pub use traits::{NewChunk, SearchOptions, Store, StoreStats};
