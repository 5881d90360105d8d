//! Structured PDF editing: text replacement and annotation insertion.
//!
//! Editing is tolerant by contract: a replacement whose target does not
//! appear on the requested page is recorded as skipped, never an error,
//! because annotation targets may legitimately be absent from a given
//! version. Callers get an explicit applied/skipped report to assert on.
//!
//! The editor only transforms bytes; persisting the result as a new
//! version is the orchestrator's job.

use lopdf::content::Content;
use lopdf::{dictionary, Document, Object};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TextColor;
use crate::error::{Error, Result};
use crate::pdf_encoding;

/// One text replacement: swap `target` for `replacement` wherever it
/// appears in the text elements of page `page` (0-based).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextReplacement {
    pub page: usize,
    pub target: String,
    pub replacement: String,
}

/// One free-text annotation at an absolute position on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSpec {
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub text: String,
    #[serde(default)]
    pub color: TextColor,
}

/// A batch of edits, applied in the order given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditSpec {
    #[serde(default)]
    pub replacements: Vec<TextReplacement>,
    #[serde(default)]
    pub annotations: Vec<AnnotationSpec>,
}

impl EditSpec {
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.annotations.is_empty()
    }
}

/// Result of applying an [`EditSpec`].
#[derive(Debug, Clone)]
pub struct EditOutcome {
    /// The edited PDF, serialized
    pub bytes: Vec<u8>,
    /// Human-readable descriptions of operations that took effect
    pub applied: Vec<String>,
    /// Operations that found nothing to do (best-effort contract)
    pub skipped: Vec<String>,
}

/// Applies structured edits to PDF version content.
pub struct PdfEditor;

impl PdfEditor {
    pub const fn new() -> Self {
        Self
    }

    /// Apply every edit in `spec` to `pdf_bytes` and serialize the result.
    ///
    /// Fails with `Error::Edit` only when the input is not a usable PDF;
    /// individual edits never fail, they are applied or skipped.
    pub fn edit(&self, pdf_bytes: &[u8], spec: &EditSpec) -> Result<EditOutcome> {
        let mut doc = Document::load_mem(pdf_bytes)
            .map_err(|e| Error::Edit(format!("failed to parse PDF: {e}")))?;

        let page_ids: Vec<lopdf::ObjectId> = doc.get_pages().values().copied().collect();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for replacement in &spec.replacements {
            let label = format!(
                "replace p{}: {:?} -> {:?}",
                replacement.page, replacement.target, replacement.replacement
            );
            match page_ids.get(replacement.page) {
                Some(&page_id) if replace_on_page(&mut doc, page_id, replacement)? => {
                    applied.push(label);
                }
                _ => skipped.push(label),
            }
        }

        for annotation in &spec.annotations {
            let label = format!("annotate p{}: {:?}", annotation.page, annotation.text);
            match page_ids.get(annotation.page) {
                Some(&page_id) => {
                    annotate_page(&mut doc, page_id, annotation)?;
                    applied.push(label);
                }
                None => skipped.push(label),
            }
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| Error::Edit(format!("failed to serialize PDF: {e}")))?;

        debug!(
            applied = applied.len(),
            skipped = skipped.len(),
            "edit batch applied"
        );
        Ok(EditOutcome {
            bytes,
            applied,
            skipped,
        })
    }
}

impl Default for PdfEditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace `target` in every matching text element of one page.
/// Returns whether anything matched.
fn replace_on_page(
    doc: &mut Document,
    page_id: lopdf::ObjectId,
    replacement: &TextReplacement,
) -> Result<bool> {
    let data = doc
        .get_page_content(page_id)
        .map_err(|e| Error::Edit(format!("unreadable page content: {e}")))?;
    let mut content = Content::decode(&data)
        .map_err(|e| Error::Edit(format!("undecodable content stream: {e}")))?;

    let mut matched = false;
    for op in &mut content.operations {
        match op.operator.as_str() {
            "Tj" | "'" => {
                if let Some(obj) = op.operands.first_mut() {
                    matched |= replace_in_string(obj, replacement);
                }
            }
            "\"" => {
                if let Some(obj) = op.operands.get_mut(2) {
                    matched |= replace_in_string(obj, replacement);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first_mut() {
                    for item in items {
                        matched |= replace_in_string(item, replacement);
                    }
                }
            }
            _ => {}
        }
    }

    if matched {
        let encoded = content
            .encode()
            .map_err(|e| Error::Edit(format!("content stream encoding failed: {e}")))?;
        doc.change_page_content(page_id, encoded)
            .map_err(|e| Error::Edit(format!("failed to rewrite page content: {e}")))?;
    }
    Ok(matched)
}

fn replace_in_string(obj: &mut Object, replacement: &TextReplacement) -> bool {
    let Object::String(raw, format) = obj else {
        return false;
    };
    let decoded = pdf_encoding::decode_string(raw);
    if !decoded.contains(&replacement.target) {
        return false;
    }
    let rewritten = decoded.replace(&replacement.target, &replacement.replacement);
    *obj = Object::String(pdf_encoding::encode_lossy(&rewritten), *format);
    true
}

/// Attach a FreeText annotation to a page, creating /Annots if needed.
fn annotate_page(doc: &mut Document, page_id: lopdf::ObjectId, spec: &AnnotationSpec) -> Result<()> {
    // Rect width scales with text length; height fits one 12pt line
    #[allow(clippy::cast_precision_loss)]
    let width = (spec.text.chars().count() as f32).mul_add(7.0, 20.0);
    let (r, g, b) = (spec.color.r, spec.color.g, spec.color.b);

    let annot_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "FreeText",
        "Rect" => vec![
            Object::Real(spec.x),
            Object::Real(spec.y),
            Object::Real(spec.x + width),
            Object::Real(spec.y + 16.0),
        ],
        "Contents" => Object::string_literal(spec.text.as_str()),
        "DA" => Object::string_literal(format!("{r} {g} {b} rg /Helv 12 Tf")),
        "C" => vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        // Print flag
        "F" => 4,
    });

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Edit(format!("failed to get page: {e}")))?;
    let Object::Dictionary(dict) = page else {
        return Err(Error::Edit("page object is not a dictionary".to_string()));
    };

    if let Ok(Object::Array(annots)) = dict.get_mut(b"Annots") {
        annots.push(annot_id.into());
    } else {
        dict.set("Annots", vec![Object::Reference(annot_id)]);
    }
    Ok(())
}
