use thiserror::Error;

/// Unified error type for doctrans-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Content extraction (PDF parsing, image OCR)
/// - Translation operations (API requests, responses, rate limiting)
/// - Document rebuilding and editing
/// - Encrypted storage (persistence, crypto)
/// - Configuration operations (loading, validation)
/// - General I/O operations
///
/// Every variant maps to a stable machine-readable code via [`Error::code`],
/// which boundary layers pair with the human-readable `Display` message.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Extraction Errors
    // ==========================================================================
    /// Source bytes are not a valid document of the declared type
    #[error("failed to extract content: {0}")]
    Extraction(String),

    /// Image could not be decoded or recognized
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// A language-detection call failed.
    ///
    /// Never surfaced from the extraction path, which degrades to an
    /// "auto" language marker instead.
    #[error("language detection failed: {0}")]
    Detection(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Maximum retry attempts exceeded for translation
    #[error("translation failed after maximum retries")]
    TranslationMaxRetriesExceeded,

    // ==========================================================================
    // Rebuild & Edit Errors
    // ==========================================================================
    /// No renderable font available on the host
    #[error("no usable text rendering font found on this host")]
    FontUnavailable,

    /// Failed to produce a rebuilt artifact
    #[error("failed to rebuild document: {0}")]
    Rebuild(String),

    /// Failed to apply an edit to a PDF version
    #[error("failed to edit document: {0}")]
    Edit(String),

    // ==========================================================================
    // Storage Errors
    // ==========================================================================
    /// Referenced Document/Version absent or not owned by caller
    #[error("not found: {0}")]
    NotFound(String),

    /// Persistence layer failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Content encryption or decryption failed
    #[error("encryption error: {0}")]
    Encryption(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code for client-side branching.
    ///
    /// Codes are part of the boundary contract and must not change once
    /// published.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Extraction(_) => "EXTRACTION_FAILED",
            Self::Ocr(_) => "OCR_FAILED",
            Self::Detection(_) => "LANGUAGE_DETECTION_FAILED",
            Self::TranslationRequest(_)
            | Self::TranslationInvalidResponse(_)
            | Self::TranslationMaxRetriesExceeded => "TRANSLATION_FAILED",
            Self::TranslationRateLimited { .. } => "TRANSLATION_RATE_LIMITED",
            Self::TranslationTimeout => "TRANSLATION_TIMEOUT",
            Self::FontUnavailable => "FONT_UNAVAILABLE",
            Self::Rebuild(_) => "REBUILD_FAILED",
            Self::Edit(_) => "EDIT_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Storage(_) => "STORAGE_FAILED",
            Self::Encryption(_) => "ENCRYPTION_FAILED",
            Self::ConfigLoad(_) | Self::ConfigInvalid { .. } => "CONFIG_INVALID",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Whether a retry of the whole workflow could plausibly succeed.
    ///
    /// Used by the background task queue to decide between retrying and
    /// giving up. Malformed input never becomes valid by retrying.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TranslationRequest(_)
                | Self::TranslationTimeout
                | Self::TranslationRateLimited { .. }
                | Self::Storage(_)
                | Self::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::Extraction("bad".into()).code(), "EXTRACTION_FAILED");
        assert_eq!(Error::NotFound("doc 7".into()).code(), "NOT_FOUND");
        assert_eq!(Error::FontUnavailable.code(), "FONT_UNAVAILABLE");
        assert_eq!(
            Error::TranslationMaxRetriesExceeded.code(),
            "TRANSLATION_FAILED"
        );
    }

    #[test]
    fn malformed_input_is_not_transient() {
        assert!(!Error::Extraction("not a pdf".into()).is_transient());
        assert!(Error::Storage("disk full".into()).is_transient());
    }
}
