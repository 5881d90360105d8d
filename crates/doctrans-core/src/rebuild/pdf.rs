//! Translated-PDF composition.
//!
//! The rebuilt document is a brand-new PDF, not a patch of the original:
//! only the first page's dimensions are carried over, and the translated
//! text is flowed top-to-bottom, left-aligned, starting a new page when
//! vertical space runs out. Layout fidelity is deliberately sacrificed
//! for robustness against malformed original structure.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::{debug, warn};

use super::font::SystemFont;
use crate::error::{Error, Result};
use crate::pdf_encoding;

// =============================================================================
// Layout Constants
// =============================================================================

/// Page margin on all sides (in points).
const MARGIN: f32 = 40.0;

/// Font size for translated text (in points).
const FONT_SIZE: f32 = 12.0;

/// Fixed line height (in points).
const LINE_HEIGHT: f32 = 14.0;

/// US Letter, used when the original's page size cannot be read.
const FALLBACK_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Composes a new PDF carrying the translated text.
pub struct PdfComposer<'a> {
    font: &'a SystemFont,
}

impl<'a> PdfComposer<'a> {
    pub const fn new(font: &'a SystemFont) -> Self {
        Self { font }
    }

    /// Build a new PDF sized like `original`'s first page, containing
    /// `text` flowed top-to-bottom.
    pub fn compose(&self, original: &[u8], text: &str) -> Result<Vec<u8>> {
        let (page_width, page_height) = first_page_size(original).unwrap_or_else(|| {
            warn!("could not read original page size, falling back to US Letter");
            FALLBACK_PAGE_SIZE
        });

        // Wrap to the printable width, preserving explicit line breaks
        let max_width = page_width - 2.0 * MARGIN;
        let mut lines = Vec::new();
        for raw_line in text.lines() {
            wrap_line(raw_line, max_width, self.font, &mut lines);
        }
        if lines.is_empty() {
            lines.push(String::new());
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let lines_per_page =
            (((page_height - 2.0 * MARGIN) / LINE_HEIGHT).floor() as usize).max(1);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = self.font.embed_in_document(&mut doc);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut page_ids: Vec<Object> = Vec::new();
        for chunk in lines.chunks(lines_per_page) {
            let content = page_content(chunk, page_height);
            let encoded = content
                .encode()
                .map_err(|e| Error::Rebuild(format!("content stream encoding failed: {e}")))?;
            let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, encoded)));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            page_ids.push(page_id.into());
        }

        #[allow(clippy::cast_possible_wrap)]
        let count = page_ids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(page_width),
                Object::Real(page_height),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| Error::Rebuild(format!("failed to serialize PDF: {e}")))?;

        debug!(pages = count, bytes = out.len(), "rebuilt PDF composed");
        Ok(out)
    }
}

/// Content stream for one page of flowed text.
fn page_content(lines: &[String], page_height: f32) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5 + 2);
    operations.push(Operation::new("q", vec![]));

    let mut y = page_height - MARGIN - FONT_SIZE;
    for line in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec!["F1".into(), Object::Real(FONT_SIZE)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(MARGIN), Object::Real(y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(
                pdf_encoding::encode_lossy(line),
                lopdf::StringFormat::Literal,
            )],
        ));
        operations.push(Operation::new("ET", vec![]));
        y -= LINE_HEIGHT;
    }

    operations.push(Operation::new("Q", vec![]));
    Content { operations }
}

/// Word-wrap a single source line into rendered lines of at most
/// `max_width` points. Words longer than a whole line are emitted as-is
/// rather than broken mid-word.
fn wrap_line(line: &str, max_width: f32, font: &SystemFont, out: &mut Vec<String>) {
    if font.string_width(line, FONT_SIZE) <= max_width || !line.contains(' ') {
        out.push(line.to_string());
        return;
    }

    let mut current = String::new();
    for word in line.split(' ') {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if font.string_width(&candidate, FONT_SIZE) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            out.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
}

/// First-page dimensions of the original, resolving the MediaBox through
/// the page tree (/Parent inheritance).
fn first_page_size(bytes: &[u8]) -> Option<(f32, f32)> {
    let doc = Document::load_mem(bytes).ok()?;
    let (_, &first_page_id) = doc.get_pages().iter().next()?;

    let mut current_id = first_page_id;
    loop {
        let dict = doc.get_object(current_id).ok()?.as_dict().ok()?;
        if let Ok(media_box) = dict.get(b"MediaBox") {
            let media_box = match media_box {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            let values = media_box.as_array().ok()?;
            if values.len() == 4 {
                let nums: Vec<f32> = values.iter().filter_map(object_to_f32).collect();
                if nums.len() == 4 {
                    return Some((nums[2] - nums[0], nums[3] - nums[1]));
                }
            }
            return None;
        }
        current_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}

#[allow(clippy::cast_precision_loss)]
fn object_to_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}
