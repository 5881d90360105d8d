//! Free-tier translation provider for LibreTranslate-compatible APIs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{ProviderInfo, ProviderReply, TranslationProvider};
use crate::config::{Lang, TranslatorConfig};
use crate::error::{Error, Result};

/// LibreTranslate-compatible provider.
///
/// Free tier: no API key required, server detects the source language
/// when asked to translate from "auto".
pub struct LibreProvider {
    client: Client,
    /// Base URL of the LibreTranslate server
    pub api_base: String,
    /// Total attempts per call (first try included)
    pub retry_count: u32,
    /// Base delay for exponential backoff between attempts
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
    #[serde(rename = "detectedLanguage")]
    detected_language: Option<DetectedLanguage>,
}

#[derive(Debug, Deserialize)]
struct DetectedLanguage {
    language: String,
}

impl LibreProvider {
    /// Create a provider from configuration.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created, which should only happen
    /// in extreme circumstances (e.g., TLS backend unavailable on the system).
    #[allow(clippy::expect_used)]
    pub fn new(config: &TranslatorConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_base: config.free_api_base.clone(),
            retry_count: config.retry_count,
            retry_base_delay_ms: config.retry_base_delay_ms,
        }
    }

    /// Make API request with retry and exponential backoff.
    async fn request_with_retry(
        &self,
        text: &str,
        source: &Lang,
        target: &Lang,
    ) -> Result<ProviderReply> {
        let url = format!("{}/translate", self.api_base.trim_end_matches('/'));
        let request = TranslateRequest {
            q: text,
            source: source.as_str(),
            target: target.as_str(),
            format: "text",
        };

        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!(
                "Translation request attempt {}/{} to {}",
                attempt + 1,
                self.retry_count,
                url
            );

            match self.client.post(&url).json(&request).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.json::<TranslateResponse>().await {
                            Ok(reply) => {
                                return Ok(ProviderReply {
                                    text: reply.translated_text,
                                    detected_source: reply
                                        .detected_language
                                        .map(|d| Lang::new(d.language)),
                                });
                            }
                            Err(e) => {
                                warn!("Failed to parse response: {}", e);
                                last_error = Some(Error::TranslationInvalidResponse(e.to_string()));
                            }
                        }
                    } else if response.status().as_u16() == 429 {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse().ok());

                        warn!("Rate limited, retry after {:?}s", retry_after);
                        last_error = Some(Error::TranslationRateLimited { retry_after });

                        // Wait longer on rate limit
                        let wait_time = retry_after.unwrap_or(5) * 1000;
                        tokio::time::sleep(Duration::from_millis(wait_time)).await;
                        continue;
                    } else {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        warn!("API error: {} - {}", status, body);
                        last_error =
                            Some(Error::TranslationRequest(format!("HTTP {status}: {body}")));
                    }
                }
                Err(e) => {
                    warn!("Request failed: {}", e);
                    if e.is_timeout() {
                        last_error = Some(Error::TranslationTimeout);
                    } else {
                        last_error = Some(Error::TranslationRequest(e.to_string()));
                    }
                }
            }

            // Exponential backoff before the next attempt
            if attempt < self.retry_count - 1 {
                let delay = self.retry_base_delay_ms.saturating_mul(1 << attempt);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        error!("Translation failed after {} attempts", self.retry_count);
        Err(last_error.unwrap_or(Error::TranslationMaxRetriesExceeded))
    }
}

#[async_trait]
impl TranslationProvider for LibreProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "libre",
            requires_api_key: false,
            supports_auto_detect: true,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<ProviderReply> {
        self.request_with_retry(text, source, target).await
    }
}
