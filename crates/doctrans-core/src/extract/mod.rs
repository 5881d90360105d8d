//! Content extraction: raw upload bytes in, plain text + language out.
//!
//! Dispatches on the declared file type: PDFs go through the lopdf text
//! extractor, images through the OCR front-end. Language detection is a
//! best-effort extra that can never fail an extraction.

pub mod detect;
pub mod ocr;
pub mod pdf;

pub use detect::{LanguageDetector, NoopDetector, WhatlangDetector};
pub use ocr::{ImageOcr, TextRecognizer};

use std::sync::Arc;
use tracing::debug;

use crate::config::{FileType, Lang, OcrConfig};
use crate::error::Result;

/// How much of the extracted text the detector sees. Detection quality
/// plateaus quickly; feeding whole documents is wasted work.
const DETECTION_SAMPLE_CHARS: usize = 500;

/// Result of a content extraction.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Plain text, pages joined with newlines for PDFs
    pub text: String,
    /// Detected source language, or "auto" when detection could not tell
    pub language: Lang,
}

/// Extracts text from uploaded documents.
///
/// Pure with respect to its inputs (modulo OCR engine nondeterminism);
/// extracting the same bytes twice is always safe.
pub struct ContentExtractor {
    ocr: ImageOcr,
    detector: Arc<dyn LanguageDetector>,
}

impl ContentExtractor {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        detector: Arc<dyn LanguageDetector>,
        ocr_config: &OcrConfig,
    ) -> Self {
        Self {
            ocr: ImageOcr::new(recognizer, ocr_config),
            detector,
        }
    }

    /// Extract text and a best-effort source language.
    ///
    /// Fails with `Error::Extraction` for malformed PDFs and `Error::Ocr`
    /// for undecodable images. Detection failures never propagate: the
    /// language degrades to "auto".
    pub fn extract(&self, bytes: &[u8], file_type: FileType) -> Result<Extracted> {
        let text = match file_type {
            FileType::Pdf => pdf::extract_text(bytes)?,
            FileType::Jpg | FileType::Jpeg | FileType::Png => self.ocr.extract_from_image(bytes)?,
        };

        let language = self.detect_language(&text);
        debug!(
            file_type = %file_type,
            chars = text.len(),
            language = %language,
            "content extracted"
        );

        Ok(Extracted { text, language })
    }

    /// Detection is deliberately decoupled from extraction success: an
    /// unknown language is a valid outcome, a lost document is not.
    fn detect_language(&self, text: &str) -> Lang {
        let sample_end = text
            .char_indices()
            .nth(DETECTION_SAMPLE_CHARS)
            .map_or(text.len(), |(i, _)| i);

        self.detector
            .detect(&text[..sample_end])
            .unwrap_or_else(Lang::auto)
    }
}
