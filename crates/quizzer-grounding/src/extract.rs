//! Page-indexed text extraction from PDF files.

use std::path::Path;

use lopdf::Document;
use tracing::debug;

/// Extract text per page from a PDF. Pages that yield no text are omitted.
///
/// Lecture-note PDFs are frequently malformed in small ways; a page that
/// fails to extract is skipped rather than failing the whole file.
pub fn extract_pdf_pages(path: &Path) -> Result<Vec<(u32, String)>, lopdf::Error> {
    let document = Document::load(path)?;
    let mut pages = Vec::new();

    for (&page_number, _) in document.get_pages().iter() {
        match document.extract_text(&[page_number]) {
            Ok(text) => {
                let text = text.trim().to_string();
                if !text.is_empty() {
                    pages.push((page_number, text));
                }
            }
            Err(e) => {
                debug!(
                    "skipping page {page_number} of {}: {e}",
                    path.display()
                );
            }
        }
    }

    Ok(pages)
}
