//! Core domain types for fisco-rs.
//!
//! Contains the persisted entities (documents, chunks) and the ephemeral
//! retrieval record (evidence).

pub mod document;
pub mod evidence;

pub use document::{Document, doc_ids, doc_type, norm_kind};
pub use evidence::{Evidence, EvidenceOrigin};
