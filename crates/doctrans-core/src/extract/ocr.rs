//! Image OCR: preprocessing, recognition, and the bounded result cache.
//!
//! Recognition itself is behind the [`TextRecognizer`] trait so the
//! pipeline can run with any engine (or a stub in tests). The neural
//! backend (ocrs + rten) is compiled in with the `ocr` cargo feature and
//! needs two model files; see [`ocrs_backend`] for setup.

use image::GrayImage;
use moka::sync::Cache;
use std::sync::Arc;
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{Error, Result};
use crate::util::content_hash;

/// Block radius for adaptive thresholding. Chosen for scanned documents
/// at typical resolutions; larger values wash out small glyphs.
const THRESHOLD_BLOCK_RADIUS: u32 = 10;

/// Text recognition backend.
///
/// Receives a preprocessed binarized image and returns recognized text,
/// which may legitimately be empty for images without text.
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

/// OCR front-end used by the content extractor.
///
/// Owns the preprocessing pipeline and a bounded LRU cache keyed by the
/// MD5 of the raw input bytes. The cache is a per-instance optimization:
/// a hit must be byte-for-byte equal to a fresh computation.
pub struct ImageOcr {
    recognizer: Arc<dyn TextRecognizer>,
    cache: Cache<String, String>,
}

impl ImageOcr {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: &OcrConfig) -> Self {
        Self {
            recognizer,
            cache: Cache::builder()
                .max_capacity(config.cache_max_entries)
                .build(),
        }
    }

    /// Decode, preprocess, and recognize text from raw image bytes.
    ///
    /// Returns `Error::Ocr` when the bytes cannot be decoded as an image;
    /// recognition of a decodable image never fails on "no text found".
    pub fn extract_from_image(&self, image_bytes: &[u8]) -> Result<String> {
        let cache_key = content_hash(image_bytes);
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!("OCR cache hit for {}", cache_key);
            return Ok(cached);
        }

        let img = image::load_from_memory(image_bytes)
            .map_err(|e| Error::Ocr(format!("image decode failed: {e}")))?;

        let processed = preprocess(&img.to_luma8());
        let text = self.recognizer.recognize(&processed)?;

        debug!(
            engine = self.recognizer.name(),
            chars = text.len(),
            "OCR recognition complete"
        );
        self.cache.insert(cache_key, text.clone());
        Ok(text)
    }
}

/// Preprocessing pipeline: adaptive thresholding then median denoising.
///
/// The input is already grayscale; binarization evens out uneven
/// lighting, and the 3x3 median pass removes salt-and-pepper noise that
/// otherwise shows up as phantom punctuation.
pub fn preprocess(gray: &GrayImage) -> GrayImage {
    let thresholded = imageproc::contrast::adaptive_threshold(gray, THRESHOLD_BLOCK_RADIUS);
    imageproc::filter::median_filter(&thresholded, 1, 1)
}

/// Recognizer used when no OCR backend is compiled in.
///
/// Image uploads still decode and preprocess, but recognition reports a
/// configuration error instead of silently returning nothing.
pub struct UnavailableRecognizer;

impl TextRecognizer for UnavailableRecognizer {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn recognize(&self, _image: &GrayImage) -> Result<String> {
        Err(Error::Ocr(
            "no OCR backend configured; build with the `ocr` feature or inject a recognizer"
                .to_string(),
        ))
    }
}

/// Neural OCR backend built on ocrs + rten.
#[cfg(feature = "ocr")]
pub mod ocrs_backend {
    use std::path::{Path, PathBuf};

    use image::GrayImage;
    use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
    use rten::Model;
    use tracing::info;

    use super::TextRecognizer;
    use crate::error::{Error, Result};

    /// Well-known filenames for the detection and recognition models.
    const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
    const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

    /// Default model location: `$XDG_CACHE_HOME/ocrs` (usually `~/.cache/ocrs`).
    ///
    /// Running `ocrs-cli` once downloads the models there.
    fn default_model_dir() -> PathBuf {
        crate::util::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ocrs")
    }

    /// Recognizer backed by the ocrs neural engine.
    ///
    /// Model loading is the expensive step; construct once and share.
    /// Debug builds of rten are 10-100x slower, so run OCR-heavy work in
    /// release mode.
    pub struct OcrsRecognizer {
        engine: OcrEngine,
    }

    impl OcrsRecognizer {
        /// Load models from the default cache directory.
        pub fn with_defaults() -> Result<Self> {
            Self::from_model_dir(default_model_dir())
        }

        /// Load `text-detection.rten` and `text-recognition.rten` from `dir`.
        pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self> {
            let dir = dir.as_ref();
            let detection_path = dir.join(DETECTION_MODEL_FILENAME);
            let recognition_path = dir.join(RECOGNITION_MODEL_FILENAME);

            let detection_model = Model::load_file(&detection_path).map_err(|e| {
                Error::Ocr(format!(
                    "failed to load detection model from {}: {e}; run `ocrs-cli` once to download models",
                    detection_path.display()
                ))
            })?;
            let recognition_model = Model::load_file(&recognition_path).map_err(|e| {
                Error::Ocr(format!(
                    "failed to load recognition model from {}: {e}",
                    recognition_path.display()
                ))
            })?;

            let engine = OcrEngine::new(OcrEngineParams {
                detection_model: Some(detection_model),
                recognition_model: Some(recognition_model),
                ..Default::default()
            })
            .map_err(|e| Error::Ocr(format!("failed to initialise OCR engine: {e}")))?;

            info!("OCR engine initialised");
            Ok(Self { engine })
        }
    }

    impl TextRecognizer for OcrsRecognizer {
        fn name(&self) -> &'static str {
            "ocrs"
        }

        fn recognize(&self, image: &GrayImage) -> Result<String> {
            let rgb = image::DynamicImage::ImageLuma8(image.clone()).to_rgb8();
            let (width, height) = rgb.dimensions();

            let source = ImageSource::from_bytes(rgb.as_raw(), (width, height))
                .map_err(|e| Error::Ocr(format!("failed to create image source: {e}")))?;
            let input = self
                .engine
                .prepare_input(source)
                .map_err(|e| Error::Ocr(format!("OCR preprocessing failed: {e}")))?;

            self.engine
                .get_text(&input)
                .map_err(|e| Error::Ocr(format!("OCR recognition failed: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Luma};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Recognizer that counts invocations, for cache assertions.
    struct CountingRecognizer {
        calls: AtomicUsize,
    }

    impl TextRecognizer for CountingRecognizer {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn recognize(&self, image: &GrayImage) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}x{}", image.width(), image.height()))
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = GrayImage::from_pixel(width, height, Luma([200u8]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn identical_bytes_hit_the_cache() {
        let recognizer = Arc::new(CountingRecognizer {
            calls: AtomicUsize::new(0),
        });
        let ocr = ImageOcr::new(recognizer.clone(), &OcrConfig::default());

        let bytes = png_bytes(40, 20);
        let first = ocr.extract_from_image(&bytes).unwrap();
        let second = ocr.extract_from_image(&bytes).unwrap();

        assert_eq!(first, second);
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn different_bytes_miss_the_cache() {
        let recognizer = Arc::new(CountingRecognizer {
            calls: AtomicUsize::new(0),
        });
        let ocr = ImageOcr::new(recognizer.clone(), &OcrConfig::default());

        ocr.extract_from_image(&png_bytes(40, 20)).unwrap();
        ocr.extract_from_image(&png_bytes(41, 20)).unwrap();
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn undecodable_bytes_are_an_ocr_error() {
        let recognizer = Arc::new(CountingRecognizer {
            calls: AtomicUsize::new(0),
        });
        let ocr = ImageOcr::new(recognizer, &OcrConfig::default());

        let err = ocr.extract_from_image(b"not an image").unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
        assert_eq!(err.code(), "OCR_FAILED");
    }

    #[test]
    fn preprocess_preserves_dimensions() {
        let gray = GrayImage::from_pixel(64, 32, Luma([128u8]));
        let processed = preprocess(&gray);
        assert_eq!(processed.dimensions(), (64, 32));
    }
}
