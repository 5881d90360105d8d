//! PDF text extraction built on lopdf content-stream parsing.
//!
//! Walks every page's decoded content stream and collects the text-showing
//! operators (Tj, TJ, ', "). Text positioning operators (Td, TD, T*) mark
//! line boundaries. Pages are joined with a single newline, so adding pages
//! never shortens the extracted text.

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::pdf_encoding;

/// Extract plain text from a PDF, page order preserved.
///
/// Returns `Error::Extraction` when the bytes are not a parseable PDF.
/// A valid PDF with no text layer yields an empty string.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| Error::Extraction(format!("failed to parse PDF: {e}")))?;

    // get_pages returns a BTreeMap keyed by 1-based page number, so
    // iteration order is page order.
    let pages = doc.get_pages();
    let mut page_texts = Vec::with_capacity(pages.len());

    for (&page_num, &page_id) in &pages {
        let text = page_text(&doc, page_id).map_err(|e| {
            Error::Extraction(format!("failed to extract text from page {page_num}: {e}"))
        })?;
        page_texts.push(text);
    }

    Ok(page_texts.join("\n"))
}

/// Number of pages in a PDF, for callers that only need a count.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| Error::Extraction(format!("failed to parse PDF: {e}")))?;
    Ok(doc.get_pages().len())
}

fn page_text(doc: &Document, page_id: ObjectId) -> Result<String> {
    let data = doc
        .get_page_content(page_id)
        .map_err(|e| Error::Extraction(format!("unreadable page content: {e}")))?;
    let content = Content::decode(&data)
        .map_err(|e| Error::Extraction(format!("undecodable content stream: {e}")))?;

    let mut text = String::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "Tj" => {
                if let Some(Object::String(raw, _)) = op.operands.first() {
                    text.push_str(&pdf_encoding::decode_string(raw));
                }
            }
            // ' moves to the next line before showing text
            "'" => {
                newline(&mut text);
                if let Some(Object::String(raw, _)) = op.operands.first() {
                    text.push_str(&pdf_encoding::decode_string(raw));
                }
            }
            // " sets word/char spacing, then behaves like '
            "\"" => {
                newline(&mut text);
                if let Some(Object::String(raw, _)) = op.operands.get(2) {
                    text.push_str(&pdf_encoding::decode_string(raw));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        if let Object::String(raw, _) = item {
                            text.push_str(&pdf_encoding::decode_string(raw));
                        }
                    }
                }
            }
            "Td" | "TD" | "T*" => newline(&mut text),
            _ => {}
        }
    }

    while text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Append a line break unless we are at the start or already on one.
fn newline(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_an_extraction_error() {
        let err = extract_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert_eq!(err.code(), "EXTRACTION_FAILED");
    }

    #[test]
    fn truncated_header_is_an_extraction_error() {
        assert!(extract_text(b"%PDF-1.5\n").is_err());
    }
}
