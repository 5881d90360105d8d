//! Document rebuilding: produce a translated artifact from the original
//! bytes plus translated text.
//!
//! PDFs are re-rendered from scratch (see [`pdf`]); images get a caption
//! band (see [`image`]). Both need a renderable font, discovered once at
//! construction — a host without any usable TrueType font cannot rebuild.

pub mod font;
pub mod image;
pub mod pdf;

pub use font::SystemFont;

use crate::config::FileType;
use crate::error::Result;

/// Rebuilds document artifacts with translated content.
pub struct DocumentRebuilder {
    font: SystemFont,
}

impl DocumentRebuilder {
    /// Create a rebuilder using the first usable system font.
    ///
    /// Fails with `Error::FontUnavailable` when the host has none; this
    /// is fatal, since translated text cannot be rendered without a font.
    pub fn new() -> Result<Self> {
        Ok(Self {
            font: SystemFont::discover()?,
        })
    }

    /// Create a rebuilder with an explicit font (tests, bundled deployments).
    pub const fn with_font(font: SystemFont) -> Self {
        Self { font }
    }

    /// Produce a new artifact of the same type as the original,
    /// containing the translated text.
    pub fn rebuild(&self, original: &[u8], translated_text: &str, file_type: FileType) -> Result<Vec<u8>> {
        match file_type {
            FileType::Pdf => pdf::PdfComposer::new(&self.font).compose(original, translated_text),
            FileType::Jpg | FileType::Jpeg | FileType::Png => {
                image::caption_image(original, translated_text, &self.font)
            }
        }
    }
}
