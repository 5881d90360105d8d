//! Integration tests for doctrans-core
//!
//! These tests verify the end-to-end workflows:
//! - Translate: extract -> translate -> rebuild -> encrypted persistence
//! - Edit: load latest version -> apply edits -> append a new version
//! - Passthrough fallback when the translation provider is down
//! - Versioning invariants (immutability, ownership, all-or-nothing)
//!
//! PDF fixtures are composed on the fly with the system font; hosts
//! without any TrueType font skip the font-dependent tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

use doctrans_core::config::{Lang, OcrConfig, UsageConfig};
use doctrans_core::extract::{ContentExtractor, WhatlangDetector};
use doctrans_core::rebuild::pdf::PdfComposer;
use doctrans_core::translate::{
    ProviderInfo, ProviderReply, TranslationProvider, TranslationService, UsageCounter,
};
use doctrans_core::{
    DocumentPipeline, DocumentRebuilder, EditSpec, Error, FileType, Result, StorageAdapter,
    SystemFont, TextRecognizer, TranslateRequest,
};

// =============================================================================
// Mock Collaborators
// =============================================================================

/// Provider with a fixed phrase book; unknown text is echoed back with a
/// marker so tests can tell translation happened.
struct PhraseBookProvider {
    phrases: HashMap<String, String>,
}

impl PhraseBookProvider {
    fn new() -> Self {
        let mut phrases = HashMap::new();
        phrases.insert("Hello World".to_string(), "Bonjour le Monde".to_string());
        Self { phrases }
    }
}

#[async_trait]
impl TranslationProvider for PhraseBookProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "phrasebook",
            requires_api_key: false,
            supports_auto_detect: false,
        }
    }

    async fn translate(&self, text: &str, _source: &Lang, _target: &Lang) -> Result<ProviderReply> {
        let translated = text
            .lines()
            .map(|line| {
                self.phrases
                    .get(line)
                    .cloned()
                    .unwrap_or_else(|| format!("[fr] {line}"))
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ProviderReply {
            text: translated,
            detected_source: Some(Lang::new("en")),
        })
    }
}

/// Provider that fails every call, to exercise the passthrough fallback.
struct DownProvider;

#[async_trait]
impl TranslationProvider for DownProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "down",
            requires_api_key: false,
            supports_auto_detect: false,
        }
    }

    async fn translate(
        &self,
        _text: &str,
        _source: &Lang,
        _target: &Lang,
    ) -> Result<ProviderReply> {
        Err(Error::TranslationRequest(
            "backend unreachable".to_string(),
        ))
    }
}

/// Recognizer standing in for a real OCR engine.
struct StubRecognizer(&'static str);

impl TextRecognizer for StubRecognizer {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn recognize(&self, _image: &image::GrayImage) -> Result<String> {
        Ok(self.0.to_string())
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

fn system_font() -> Option<SystemFont> {
    match SystemFont::discover() {
        Ok(font) => Some(font),
        Err(_) => {
            eprintln!("no system font available, skipping");
            None
        }
    }
}

fn pdf_with_text(text: &str) -> Vec<u8> {
    let font = SystemFont::discover().expect("checked by caller");
    PdfComposer::new(&font).compose(b"", text).expect("compose fixture")
}

fn png_fixture() -> Vec<u8> {
    let img = image::GrayImage::from_pixel(120, 80, image::Luma([210u8]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode fixture");
    out.into_inner()
}

async fn pipeline_with(
    provider: Arc<dyn TranslationProvider>,
    recognized: &'static str,
) -> DocumentPipeline {
    let extractor = Arc::new(ContentExtractor::new(
        Arc::new(StubRecognizer(recognized)),
        Arc::new(WhatlangDetector::new()),
        &OcrConfig::default(),
    ));
    let usage = Arc::new(UsageCounter::new(UsageConfig::default()));
    let translator = TranslationService::new(provider, usage);
    let rebuilder = Arc::new(DocumentRebuilder::new().expect("font checked by caller"));
    let storage = Arc::new(
        StorageAdapter::in_memory("integration-test-passphrase")
            .await
            .expect("in-memory storage"),
    );
    DocumentPipeline::new(extractor, translator, rebuilder, storage)
}

fn translate_request(bytes: Vec<u8>, filename: &str, file_type: FileType) -> TranslateRequest {
    TranslateRequest {
        owner_id: "user-1".to_string(),
        filename: filename.to_string(),
        bytes: Bytes::from(bytes),
        file_type,
        target_lang: Lang::new("fr"),
    }
}

// =============================================================================
// Translate Workflow
// =============================================================================

#[tokio::test]
async fn translate_workflow_persists_translated_pdf() {
    if system_font().is_none() {
        return;
    }
    let pipeline = pipeline_with(Arc::new(PhraseBookProvider::new()), "").await;
    let original = pdf_with_text("Hello World");

    let outcome = pipeline
        .translate_document(translate_request(original.clone(), "hello.pdf", FileType::Pdf))
        .await
        .expect("workflow should succeed");

    assert!(outcome.translated);
    assert_eq!(outcome.source_lang, Lang::new("en"));

    // Exactly one document and one version were persisted
    let storage = pipeline.storage();
    assert_eq!(storage.document_count("user-1").await.unwrap(), 1);
    assert_eq!(storage.version_count(&outcome.document.id).await.unwrap(), 1);

    // The rebuilt artifact extracts back to the translated text
    let version = storage
        .get_version_by_id(&outcome.version.id)
        .await
        .unwrap()
        .expect("version exists");
    let text = doctrans_core::extract::pdf::extract_text(&version.content).unwrap();
    assert!(text.contains("Bonjour le Monde"), "got {text:?}");

    // Stored content is ciphertext, not the artifact bytes
    let raw = storage
        .raw_version_content(&outcome.version.id)
        .await
        .unwrap()
        .expect("raw content exists");
    assert_ne!(raw, version.content);
}

#[tokio::test]
async fn provider_outage_degrades_to_passthrough_artifact() {
    if system_font().is_none() {
        return;
    }
    let pipeline = pipeline_with(Arc::new(DownProvider), "").await;
    let original = pdf_with_text("Hello World");

    let outcome = pipeline
        .translate_document(translate_request(original, "hello.pdf", FileType::Pdf))
        .await
        .expect("passthrough must not fail the workflow");

    assert!(!outcome.translated, "passthrough must be detectable");

    let version = pipeline
        .storage()
        .get_version_by_id(&outcome.version.id)
        .await
        .unwrap()
        .expect("version exists");
    let text = doctrans_core::extract::pdf::extract_text(&version.content).unwrap();
    assert!(text.contains("Hello World"), "original text expected, got {text:?}");
}

#[tokio::test]
async fn malformed_upload_persists_nothing() {
    if system_font().is_none() {
        return;
    }
    let pipeline = pipeline_with(Arc::new(PhraseBookProvider::new()), "").await;

    let err = pipeline
        .translate_document(translate_request(
            b"not a pdf at all".to_vec(),
            "broken.pdf",
            FileType::Pdf,
        ))
        .await
        .expect_err("extraction must fail");

    assert_eq!(err.code(), "EXTRACTION_FAILED");
    assert_eq!(
        pipeline.storage().document_count("user-1").await.unwrap(),
        0
    );
}

#[tokio::test]
async fn image_upload_is_captioned_and_versioned() {
    if system_font().is_none() {
        return;
    }
    let pipeline = pipeline_with(Arc::new(PhraseBookProvider::new()), "Hello World").await;

    let outcome = pipeline
        .translate_document(translate_request(png_fixture(), "scan.png", FileType::Png))
        .await
        .expect("image workflow should succeed");

    let version = pipeline
        .storage()
        .get_version_by_id(&outcome.version.id)
        .await
        .unwrap()
        .expect("version exists");
    assert_eq!(version.file_type, FileType::Png);
    // The stored artifact is a decodable image of the original size
    let img = image::load_from_memory(&version.content).expect("valid image artifact");
    assert_eq!((img.width(), img.height()), (120, 80));
}

// =============================================================================
// Extraction Properties
// =============================================================================

#[tokio::test]
async fn extraction_is_monotonic_under_page_growth() {
    if system_font().is_none() {
        return;
    }
    let one_page = pdf_with_text("a short page");
    let more_text = (0..120)
        .map(|i| format!("a short page plus line {i}"))
        .collect::<Vec<_>>()
        .join("\n");
    let many_pages = pdf_with_text(&more_text);

    let short = doctrans_core::extract::pdf::extract_text(&one_page).unwrap();
    let long = doctrans_core::extract::pdf::extract_text(&many_pages).unwrap();
    assert!(long.len() > short.len());
}

// =============================================================================
// Edit Workflow
// =============================================================================

#[tokio::test]
async fn edit_appends_a_version_without_touching_the_old_one() {
    if system_font().is_none() {
        return;
    }
    let pipeline = pipeline_with(Arc::new(PhraseBookProvider::new()), "").await;
    let original = pdf_with_text("Hello World");

    let translated = pipeline
        .translate_document(translate_request(original, "hello.pdf", FileType::Pdf))
        .await
        .expect("translate first");

    let storage = pipeline.storage();
    let before = storage
        .raw_version_content(&translated.version.id)
        .await
        .unwrap()
        .expect("first version stored");

    let spec = EditSpec {
        replacements: vec![doctrans_core::TextReplacement {
            page: 0,
            target: "Bonjour le Monde".to_string(),
            replacement: "Salut le Monde".to_string(),
        }],
        annotations: vec![],
    };
    let edited = pipeline
        .edit_document("user-1", &translated.document.id, spec)
        .await
        .expect("edit should succeed");

    assert_eq!(edited.applied.len(), 1);
    assert!(edited.skipped.is_empty());
    assert_ne!(edited.version.id, translated.version.id);
    assert_eq!(
        storage.version_count(&translated.document.id).await.unwrap(),
        2
    );

    // Prior version bytes are untouched
    let after = storage
        .raw_version_content(&translated.version.id)
        .await
        .unwrap()
        .expect("first version still stored");
    assert_eq!(before, after);

    // The new latest version carries the edit
    let latest = storage
        .get_latest_version(&translated.document.id)
        .await
        .unwrap()
        .expect("latest version");
    assert_eq!(latest.id, edited.version.id);
    let text = doctrans_core::extract::pdf::extract_text(&latest.content).unwrap();
    assert!(text.contains("Salut le Monde"));
}

#[tokio::test]
async fn unmatched_edit_targets_are_reported_as_skipped() {
    if system_font().is_none() {
        return;
    }
    let pipeline = pipeline_with(Arc::new(PhraseBookProvider::new()), "").await;
    let original = pdf_with_text("Hello World");

    let translated = pipeline
        .translate_document(translate_request(original, "hello.pdf", FileType::Pdf))
        .await
        .expect("translate first");

    let spec = EditSpec {
        replacements: vec![doctrans_core::TextReplacement {
            page: 0,
            target: "this text is nowhere".to_string(),
            replacement: "irrelevant".to_string(),
        }],
        annotations: vec![],
    };
    let edited = pipeline
        .edit_document("user-1", &translated.document.id, spec)
        .await
        .expect("best-effort edit still succeeds");

    assert!(edited.applied.is_empty());
    assert_eq!(edited.skipped.len(), 1);
}

#[tokio::test]
async fn edit_of_unknown_document_is_not_found_and_writes_nothing() {
    if system_font().is_none() {
        return;
    }
    let pipeline = pipeline_with(Arc::new(PhraseBookProvider::new()), "").await;

    let err = pipeline
        .edit_document("user-1", "no-such-document", EditSpec::default())
        .await
        .expect_err("must fail");

    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(
        pipeline
            .storage()
            .version_count("no-such-document")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn edit_enforces_ownership() {
    if system_font().is_none() {
        return;
    }
    let pipeline = pipeline_with(Arc::new(PhraseBookProvider::new()), "").await;
    let original = pdf_with_text("Hello World");

    let translated = pipeline
        .translate_document(translate_request(original, "hello.pdf", FileType::Pdf))
        .await
        .expect("translate first");

    let err = pipeline
        .edit_document("someone-else", &translated.document.id, EditSpec::default())
        .await
        .expect_err("foreign owner must not see the document");
    assert_eq!(err.code(), "NOT_FOUND");
}
