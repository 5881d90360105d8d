//! Translation: provider backends, tier dispatch, usage accounting, and
//! the passthrough fallback policy.
//!
//! The orchestrator only ever sees [`TranslationService::translate`],
//! which cannot fail: when the provider is down after all retries, the
//! original text comes back with `translated = false`.

mod deepseek;
mod libre;
pub mod usage;

pub use deepseek::DeepSeekProvider;
pub use libre::LibreProvider;
pub use usage::{UsageCounter, UsageSnapshot};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{Lang, Tier, TranslatorConfig};
use crate::error::Result;

/// Information about a provider backend
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this provider requires an API key
    pub requires_api_key: bool,
    /// Whether this provider reports the detected source language
    pub supports_auto_detect: bool,
}

/// Raw provider response, before the service applies its policies.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub text: String,
    pub detected_source: Option<Lang>,
}

/// Trait for translation provider backends.
///
/// Both tiers implement the same shape, so everything above the factory
/// is provider-agnostic.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Get information about this provider
    fn info(&self) -> ProviderInfo;

    /// Get the provider name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate text from source language to target language
    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<ProviderReply>;
}

/// Create a provider for the configured tier.
pub fn create_provider(config: &TranslatorConfig) -> Result<Arc<dyn TranslationProvider>> {
    Ok(match config.tier {
        Tier::Free => Arc::new(LibreProvider::new(config)),
        Tier::Premium => Arc::new(DeepSeekProvider::new(config)?),
    })
}

/// Outcome of a translation call.
///
/// `translated` tells the caller whether the text is actually in the
/// target language; `false` means the passthrough fallback fired and
/// `text` is the unmodified input.
#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    /// Best-known source language (provider-detected when available)
    pub source_lang: Lang,
    pub translated: bool,
}

/// Translation service: provider + usage accounting + fallback policy.
pub struct TranslationService {
    provider: Arc<dyn TranslationProvider>,
    usage: Arc<UsageCounter>,
}

impl TranslationService {
    pub fn new(provider: Arc<dyn TranslationProvider>, usage: Arc<UsageCounter>) -> Self {
        Self { provider, usage }
    }

    pub fn from_config(config: &TranslatorConfig, usage: Arc<UsageCounter>) -> Result<Self> {
        Ok(Self::new(create_provider(config)?, usage))
    }

    pub fn provider_info(&self) -> ProviderInfo {
        self.provider.info()
    }

    pub fn usage(&self) -> UsageSnapshot {
        self.usage.current()
    }

    /// Translate `text` into `target`, degrading to passthrough on failure.
    ///
    /// This method never errors: provider failures after all retries are
    /// absorbed and reported through `translated = false`. Character usage
    /// is recorded whenever the provider is consulted.
    pub async fn translate(&self, text: &str, target: &Lang, source: &Lang) -> Translation {
        // Nothing to do for empty input or same-language requests
        if text.trim().is_empty() || (!source.is_auto() && source == target) {
            return Translation {
                text: text.to_string(),
                source_lang: source.clone(),
                translated: true,
            };
        }

        let snapshot = self.usage.record(text.chars().count() as u64);
        if snapshot.free_remaining == 0 {
            debug!(
                chars_used = snapshot.chars_used,
                overage_cost = snapshot.overage_cost,
                "free tier exhausted, call proceeds at overage pricing"
            );
        }

        match self.provider.translate(text, source, target).await {
            Ok(reply) => Translation {
                text: reply.text,
                source_lang: reply.detected_source.unwrap_or_else(|| source.clone()),
                translated: true,
            },
            Err(e) => {
                // Deliberate fallback policy: the pipeline continues with
                // the original text rather than failing the workflow.
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    "translation failed after retries, passing original text through"
                );
                Translation {
                    text: text.to_string(),
                    source_lang: source.clone(),
                    translated: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UsageConfig;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranslationProvider for FailingProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                name: "failing",
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::TranslationRequest("connection refused".to_string()))
        }
    }

    struct UpperProvider;

    #[async_trait]
    impl TranslationProvider for UpperProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                name: "upper",
                requires_api_key: false,
                supports_auto_detect: true,
            }
        }

        async fn translate(
            &self,
            text: &str,
            _source: &Lang,
            _target: &Lang,
        ) -> Result<ProviderReply> {
            Ok(ProviderReply {
                text: text.to_uppercase(),
                detected_source: Some(Lang::new("fr")),
            })
        }
    }

    fn usage() -> Arc<UsageCounter> {
        Arc::new(UsageCounter::new(UsageConfig::default()))
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_passthrough() {
        let service = TranslationService::new(
            Arc::new(FailingProvider {
                calls: AtomicUsize::new(0),
            }),
            usage(),
        );

        let result = service
            .translate("Bonjour le monde", &Lang::new("en"), &Lang::auto())
            .await;

        assert_eq!(result.text, "Bonjour le monde");
        assert!(!result.translated);
    }

    #[tokio::test]
    async fn successful_translation_reports_detected_source() {
        let service = TranslationService::new(Arc::new(UpperProvider), usage());
        let result = service
            .translate("bonjour", &Lang::new("en"), &Lang::auto())
            .await;

        assert_eq!(result.text, "BONJOUR");
        assert_eq!(result.source_lang, Lang::new("fr"));
        assert!(result.translated);
    }

    #[tokio::test]
    async fn empty_text_skips_the_provider() {
        let counter = usage();
        let service = TranslationService::new(Arc::new(UpperProvider), counter.clone());
        let result = service
            .translate("   ", &Lang::new("en"), &Lang::auto())
            .await;

        assert_eq!(result.text, "   ");
        assert!(result.translated);
        assert_eq!(counter.current().chars_used, 0);
    }

    #[tokio::test]
    async fn same_language_request_is_a_no_op() {
        let service = TranslationService::new(Arc::new(UpperProvider), usage());
        let result = service
            .translate("hello", &Lang::new("en"), &Lang::new("en"))
            .await;
        assert_eq!(result.text, "hello");
        assert!(result.translated);
    }

    #[tokio::test]
    async fn usage_is_recorded_per_call() {
        let counter = usage();
        let service = TranslationService::new(Arc::new(UpperProvider), counter.clone());
        service
            .translate("12345", &Lang::new("en"), &Lang::auto())
            .await;
        assert_eq!(counter.current().chars_used, 5);
    }
}
