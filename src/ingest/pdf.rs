//! PDF page extraction.
//!
//! The extractor is an injectable seam: the pipeline only needs a
//! page-yielding function, so tests feed synthetic pages. Extracted text
//! is sanitized of null bytes before anything downstream sees it; the
//! JSON metadata serializer rejects them.

use crate::error::{IngestError, Result};
use std::path::Path;

/// Yields `(page_number, page_text)` pairs for a source file.
pub trait PageSource: Send + Sync {
    /// Extracts the page texts of a document, 1-based, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be parsed.
    fn extract_pages(&self, path: &Path) -> Result<Vec<(u32, String)>>;
}

/// Strips null bytes from extracted page text.
#[must_use]
pub fn sanitize_page(text: &str) -> String {
    text.replace('\0', "")
}

/// Page source backed by the `pdf-extract` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PageSource for PdfExtractor {
    #[allow(clippy::cast_possible_truncation)]
    fn extract_pages(&self, path: &Path) -> Result<Vec<(u32, String)>> {
        if !path.exists() {
            return Err(IngestError::MissingFile {
                path: path.display().to_string(),
            }
            .into());
        }

        let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| IngestError::Pdf {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| (i as u32 + 1, sanitize_page(&text)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_null_bytes() {
        assert_eq!(sanitize_page("texto\0con\0nulos"), "textoconnulos");
        assert_eq!(sanitize_page("limpio"), "limpio");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let extractor = PdfExtractor;
        let err = extractor
            .extract_pages(Path::new("/nonexistent/LEY.pdf"))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
