//! Doctrans Core Library
//!
//! This library provides the document processing and versioned storage
//! pipeline:
//! - Content extraction (PDF text layer, image OCR with caching)
//! - Translation via tiered provider backends with passthrough fallback
//! - Document rebuilding (re-rendered PDFs, captioned images)
//! - Structured PDF editing
//! - Encrypted, append-only version storage
//! - Workflow orchestration with an explicit state machine

pub mod config;
pub mod editor;
pub mod error;
pub mod extract;
pub mod pdf_encoding;
pub mod pipeline;
pub mod queue;
pub mod rebuild;
pub mod storage;
pub mod translate;
pub mod util;

pub use config::{AppConfig, FileType, Lang, TextColor, Tier, TranslatorConfig, DEFAULT_TARGET_LANG};
pub use editor::{AnnotationSpec, EditOutcome, EditSpec, PdfEditor, TextReplacement};
pub use error::{Error, Result};
pub use extract::{ContentExtractor, Extracted, LanguageDetector, TextRecognizer, WhatlangDetector};
pub use pipeline::{
    DocumentPipeline, EditedVersion, TranslateRequest, TranslatedDocument, WorkflowState,
};
pub use queue::{QueueConfig, TaskQueue, TranslationJob};
pub use rebuild::{DocumentRebuilder, SystemFont};
pub use storage::{DocumentHandle, StorageAdapter, StoredDocument, StoredVersion, VersionHandle};
pub use translate::{
    create_provider, Translation, TranslationProvider, TranslationService, UsageCounter,
};

use std::sync::Arc;

/// Assemble a ready-to-run pipeline from configuration.
///
/// Wires the default collaborators: whatlang detection, the configured
/// translation tier, system font discovery, and the configured storage
/// backend. The OCR recognizer is the neural engine when the `ocr`
/// feature is enabled, otherwise a recognizer that rejects image input.
///
/// Callers needing custom collaborators (tests, embedded deployments)
/// construct [`DocumentPipeline`] directly instead.
pub async fn assemble_pipeline(config: &AppConfig) -> Result<DocumentPipeline> {
    config.validate()?;

    let recognizer: Arc<dyn TextRecognizer> = default_recognizer()?;
    let extractor = Arc::new(ContentExtractor::new(
        recognizer,
        Arc::new(WhatlangDetector::new()),
        &config.ocr,
    ));

    let usage = Arc::new(UsageCounter::new(config.usage.clone()));
    let translator = TranslationService::from_config(&config.translator, usage)?;

    let rebuilder = Arc::new(DocumentRebuilder::new()?);
    let storage = Arc::new(StorageAdapter::connect(&config.storage).await?);

    Ok(DocumentPipeline::new(
        extractor, translator, rebuilder, storage,
    ))
}

#[cfg(feature = "ocr")]
fn default_recognizer() -> Result<Arc<dyn TextRecognizer>> {
    Ok(Arc::new(extract::ocr::ocrs_backend::OcrsRecognizer::with_defaults()?))
}

#[cfg(not(feature = "ocr"))]
#[allow(clippy::unnecessary_wraps)] // signature shared with the ocr-enabled variant
fn default_recognizer() -> Result<Arc<dyn TextRecognizer>> {
    Ok(Arc::new(extract::ocr::UnavailableRecognizer))
}
