//! Legal source documents.
//!
//! A document is one legal source (a statute, a regulation, a yearly RMF
//! resolution or one of its annexes). Document IDs are opaque but
//! human-recognizable and stable across re-ingestion.

use serde::{Deserialize, Serialize};

/// Known `doc_type` values.
///
/// `doc_type` stays an open string in the schema; these are the values the
/// retrieval layer reasons about.
pub mod doc_type {
    /// Federal statute.
    pub const LEY: &str = "ley";
    /// Yearly Resolución Miscelánea Fiscal.
    pub const RMF: &str = "rmf";
    /// Annex to the RMF.
    pub const ANEXO: &str = "anexo";
    /// Regulation of a statute.
    pub const REGLAMENTO: &str = "reglamento";
}

/// Known `norm_kind` values for chunks.
pub mod norm_kind {
    /// A statutory article block.
    pub const ARTICLE: &str = "ARTICLE";
    /// Material before the first recognized header.
    pub const PREAMBULO: &str = "PREAMBULO";
    /// A numbered RMF rule block.
    pub const RULE: &str = "RULE";
}

/// Document IDs of the baseline corpus.
///
/// These mirror the source filenames of the federal-law PDF set and are
/// shared by the router, the ingestion manifest, and the tests.
pub mod doc_ids {
    /// Constitución Política de los Estados Unidos Mexicanos.
    pub const CPEUM: &str = "CONSTITUCION_POLITICA_ESTADOS_UNIDOS_MEXICANOS";
    /// Código Fiscal de la Federación.
    pub const CFF: &str = "CODIGO_FISCAL_DE_LA_FEDERACION";
    /// Ley del Impuesto Sobre la Renta.
    pub const LISR: &str = "LEY_DEL_IMPUESTO_SOBRE_LA_RENTA";
    /// Ley del Impuesto al Valor Agregado.
    pub const LIVA: &str = "LEY_DEL_IMPUESTO_VALOR_AGREGADO";
    /// Ley del Impuesto Especial sobre Producción y Servicios.
    pub const IEPS: &str = "LEY_IMPUESTO_ESPECIAL_PRODUCCION_SERVICIOS";
    /// Ley Aduanera.
    pub const LEY_ADUANERA: &str = "LEY_ADUANERA";
    /// Reglamento del Código Fiscal de la Federación.
    pub const RCFF: &str = "REGLAMENTO_CODIGO_FISCAL_FEDERACION";
    /// Reglamento de la Ley del Impuesto Sobre la Renta.
    pub const RLISR: &str = "REGLAMENTO_LEY_IMPUESTO_SOBRE_RENTA";
    /// Reglamento de la Ley del IVA.
    pub const RLIVA: &str = "REGLAMENTO_LEY_DEL_IMPUESTO_VALOR_AGREGADO";
    /// Reglamento de la Ley Aduanera.
    pub const RLA: &str = "REGLAMENTO_LEY_ADUANERA";
}

/// A legal source document.
///
/// `exercise_year == 0` marks evergreen sources (statutes, the
/// constitution) whose content is not tied to one fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque, stable, human-recognizable identifier.
    pub document_id: String,
    /// Display title.
    pub title: String,
    /// Coarse grouping (e.g. `LEYES_FEDERALES`, `RMF`).
    pub doc_family: String,
    /// Enum-like type string; see [`doc_type`].
    pub doc_type: String,
    /// Fiscal exercise the document belongs to; 0 = evergreen.
    pub exercise_year: i32,
    /// Filename of the source PDF.
    pub source_filename: String,
    /// Full path the document was ingested from.
    pub source_path: String,
    /// Publication date, if known (ISO 8601).
    pub published_date: Option<String>,
}

impl Document {
    /// True when the document is not tied to a single fiscal year.
    #[must_use]
    pub const fn is_evergreen(&self) -> bool {
        self.exercise_year == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evergreen() {
        let doc = Document {
            document_id: doc_ids::CFF.to_string(),
            title: "Código Fiscal de la Federación".to_string(),
            doc_family: "LEYES_FEDERALES".to_string(),
            doc_type: doc_type::LEY.to_string(),
            exercise_year: 0,
            source_filename: "CODIGO_FISCAL_DE_LA_FEDERACION.pdf".to_string(),
            source_path: String::new(),
            published_date: None,
        };
        assert!(doc.is_evergreen());
    }

    #[test]
    fn test_rmf_year_bound() {
        let doc = Document {
            document_id: "RMF2025".to_string(),
            title: "RMF 2025".to_string(),
            doc_family: "RMF".to_string(),
            doc_type: doc_type::RMF.to_string(),
            exercise_year: 2025,
            source_filename: "RMF2025.pdf".to_string(),
            source_path: String::new(),
            published_date: Some("2024-12-30".to_string()),
        };
        assert!(!doc.is_evergreen());
    }
}
