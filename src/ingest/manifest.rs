//! Ingestion manifests.
//!
//! The federal-law baseline is a fixed table mirroring the PDF corpus;
//! RMF manifests are built by scanning a directory of yearly resolution
//! and annex PDFs.

use crate::core::{doc_ids, doc_type};
use crate::error::{IngestError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// One manifest entry: a source file with its document identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSpec {
    /// Source PDF filename under the base path.
    pub filename: String,
    /// Stable document identifier.
    pub document_id: String,
    /// Display title.
    pub title: String,
    /// `ley`, `reglamento`, `rmf`, `anexo`.
    pub doc_type: String,
    /// Fiscal exercise; 0 for evergreen statutes.
    pub exercise_year: i32,
}

impl DocumentSpec {
    fn ley(document_id: &str, title: &str) -> Self {
        Self {
            filename: format!("{document_id}.pdf"),
            document_id: document_id.to_string(),
            title: title.to_string(),
            doc_type: doc_type::LEY.to_string(),
            exercise_year: 0,
        }
    }

    fn reglamento(document_id: &str, title: &str) -> Self {
        Self {
            doc_type: doc_type::REGLAMENTO.to_string(),
            ..Self::ley(document_id, title)
        }
    }
}

/// The federal-law baseline corpus.
#[must_use]
pub fn laws_baseline() -> Vec<DocumentSpec> {
    vec![
        DocumentSpec::ley(doc_ids::CFF, "Código Fiscal de la Federación"),
        DocumentSpec::ley(
            doc_ids::CPEUM,
            "Constitución Política de los Estados Unidos Mexicanos",
        ),
        DocumentSpec::ley(doc_ids::LISR, "Ley del Impuesto Sobre la Renta"),
        DocumentSpec::ley(doc_ids::LIVA, "Ley del Impuesto al Valor Agregado"),
        DocumentSpec::ley(
            doc_ids::IEPS,
            "Ley del Impuesto Especial sobre Producción y Servicios",
        ),
        DocumentSpec::ley(doc_ids::LEY_ADUANERA, "Ley Aduanera"),
        DocumentSpec::ley(
            "LEY_FEDERAL_IMPUESTO_SOBRE_AUTOMOVILES_NUEVOS",
            "Ley Federal del Impuesto sobre Automóviles Nuevos",
        ),
        DocumentSpec::ley(
            "LEY_FEDERAL_DERECHOS_DEL_CONTRIBUYENTE",
            "Ley Federal de los Derechos del Contribuyente",
        ),
        DocumentSpec::ley(
            "CONVENCION_MULTILATERAL_BEPS_MLI_OCDE",
            "Convención Multilateral BEPS (MLI) OCDE",
        ),
        DocumentSpec::reglamento(
            doc_ids::RCFF,
            "Reglamento del Código Fiscal de la Federación",
        ),
        DocumentSpec::reglamento(
            doc_ids::RLISR,
            "Reglamento de la Ley del Impuesto Sobre la Renta",
        ),
        DocumentSpec::reglamento(doc_ids::RLIVA, "Reglamento de la Ley del IVA"),
        DocumentSpec::reglamento(doc_ids::RLA, "Reglamento de la Ley Aduanera"),
    ]
}

/// First plausible year in a filename (e.g. `RMF2026-DOF 28122025.pdf`).
#[allow(clippy::unwrap_used)]
static FILENAME_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(20\d{2})").unwrap());

/// Infers the exercise year from an RMF filename.
#[must_use]
pub fn infer_year(filename: &str) -> Option<i32> {
    FILENAME_YEAR_RE
        .captures(filename)
        .and_then(|caps| caps[1].parse().ok())
}

/// Builds an RMF manifest by scanning `base_path` for PDF files.
///
/// Files whose stem contains `anexo` (case-insensitive) are typed
/// `anexo`; everything else is typed `rmf`. The exercise year comes from
/// `year_override` or from the first year-like number in the filename.
///
/// # Errors
///
/// Returns an error if the directory cannot be read, or if a file's year
/// cannot be determined and no override was given.
pub fn rmf_manifest(base_path: &Path, year_override: Option<i32>) -> Result<Vec<DocumentSpec>> {
    let mut specs = Vec::new();

    let mut entries: Vec<std::path::PathBuf> = std::fs::read_dir(base_path)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    entries.sort();

    for path in entries {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let exercise_year = year_override
            .or_else(|| infer_year(&filename))
            .ok_or_else(|| IngestError::UnknownYear {
                filename: filename.clone(),
            })?;

        let dtype = if stem.to_lowercase().contains("anexo") {
            doc_type::ANEXO
        } else {
            doc_type::RMF
        };

        specs.push(DocumentSpec {
            filename,
            document_id: stem.clone(),
            title: stem.replace('_', " "),
            doc_type: dtype.to_string(),
            exercise_year,
        });
    }

    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_ids_unique() {
        let specs = laws_baseline();
        let unique: std::collections::HashSet<_> =
            specs.iter().map(|s| s.document_id.as_str()).collect();
        assert_eq!(unique.len(), specs.len());
    }

    #[test]
    fn test_baseline_statutes_are_evergreen() {
        for spec in laws_baseline() {
            assert_eq!(spec.exercise_year, 0, "{} must be evergreen", spec.document_id);
            assert!(spec.doc_type == "ley" || spec.doc_type == "reglamento");
        }
    }

    #[test]
    fn test_infer_year() {
        assert_eq!(infer_year("RMF2026-DOF 28122025.pdf"), Some(2026));
        assert_eq!(infer_year("1a_MODIFICACION_RMF_2025.pdf"), Some(2025));
        assert_eq!(infer_year("ANEXO_1A.pdf"), None);
    }

    #[test]
    fn test_rmf_manifest_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("RMF2025_COMPILADO.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("ANEXO_1_RMF2025.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("notas.txt"), b"no pdf").unwrap();

        let specs = rmf_manifest(dir.path(), None).unwrap();
        assert_eq!(specs.len(), 2);
        let anexo = specs.iter().find(|s| s.doc_type == "anexo").unwrap();
        assert!(anexo.document_id.contains("ANEXO"));
        let rmf = specs.iter().find(|s| s.doc_type == "rmf").unwrap();
        assert_eq!(rmf.exercise_year, 2025);
    }

    #[test]
    fn test_rmf_manifest_unknown_year_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ANEXO_SIN_FECHA.pdf"), b"%PDF").unwrap();
        assert!(rmf_manifest(dir.path(), None).is_err());
        assert!(rmf_manifest(dir.path(), Some(2025)).is_ok());
    }
}
