//! Pluggable source-language detection.
//!
//! Detection is best-effort by contract: a failed or unreliable detection
//! yields `None`, and the extractor degrades to the "auto" marker instead
//! of failing the workflow.

use crate::config::Lang;

/// Source-language detection capability.
///
/// Implementations must be cheap enough to run on every extraction; only a
/// prefix of the text is passed in.
pub trait LanguageDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Best-effort detection. `None` means "could not tell", which is a
    /// legitimate result, not an error.
    fn detect(&self, text: &str) -> Option<Lang>;
}

/// Statistical detector backed by whatlang.
pub struct WhatlangDetector {
    /// Minimum confidence before a guess is reported
    min_confidence: f64,
}

impl WhatlangDetector {
    pub const fn new() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for WhatlangDetector {
    fn name(&self) -> &'static str {
        "whatlang"
    }

    fn detect(&self, text: &str) -> Option<Lang> {
        let info = whatlang::detect(text)?;
        if info.confidence() < self.min_confidence {
            return None;
        }
        Some(Lang::new(iso639_1(info.lang())))
    }
}

/// Detector that never guesses; every document is reported as "auto".
///
/// Useful for deployments where the provider's own detection is trusted.
pub struct NoopDetector;

impl LanguageDetector for NoopDetector {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn detect(&self, _text: &str) -> Option<Lang> {
        None
    }
}

/// Map whatlang's ISO 639-3 codes to the 639-1 codes the translation
/// providers speak. Languages without a common 639-1 code keep their
/// 639-3 code, which providers treat as opaque.
fn iso639_1(lang: whatlang::Lang) -> &'static str {
    use whatlang::Lang as W;
    match lang {
        W::Eng => "en",
        W::Fra => "fr",
        W::Deu => "de",
        W::Spa => "es",
        W::Ita => "it",
        W::Por => "pt",
        W::Nld => "nl",
        W::Rus => "ru",
        W::Ukr => "uk",
        W::Pol => "pl",
        W::Swe => "sv",
        W::Fin => "fi",
        W::Tur => "tr",
        W::Ara => "ar",
        W::Heb => "he",
        W::Hin => "hi",
        W::Jpn => "ja",
        W::Kor => "ko",
        W::Cmn => "zh",
        other => other.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english_prose() {
        let detector = WhatlangDetector::new();
        let lang = detector.detect(
            "The quick brown fox jumps over the lazy dog, and then the dog \
             wakes up and chases the fox across the meadow.",
        );
        assert_eq!(lang, Some(Lang::new("en")));
    }

    #[test]
    fn short_ambiguous_input_yields_none() {
        let detector = WhatlangDetector::new();
        // Nothing statistical to work with
        assert_eq!(detector.detect(""), None);
    }

    #[test]
    fn noop_never_guesses() {
        assert_eq!(NoopDetector.detect("plenty of english text here"), None);
    }
}
