//! Premium-tier translation provider for OpenAI-chat-compatible APIs
//! (DeepSeek and friends).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{ProviderInfo, ProviderReply, TranslationProvider};
use crate::config::{Lang, TranslatorConfig};
use crate::error::{Error, Result};

/// Chat-completion translator for the premium tier.
///
/// Same contract as the free provider; the model cannot report a detected
/// source language, so `detected_source` is always `None`.
pub struct DeepSeekProvider {
    client: Client,
    /// Base URL for the API (e.g., "https://api.deepseek.com/v1")
    pub api_base: String,
    /// API key, mandatory for this tier
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Total attempts per call (first try included)
    pub retry_count: u32,
    /// Base delay for exponential backoff between attempts
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl DeepSeekProvider {
    /// Create a provider from configuration.
    ///
    /// Returns `Error::ConfigInvalid` when no API key is configured; the
    /// premium backend cannot run keyless.
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::ConfigInvalid {
                field: "translator.api_key".to_string(),
                reason: "premium tier requires an API key".to_string(),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::TranslationRequest(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.premium_api_base.clone(),
            api_key,
            model: config.model.clone(),
            retry_count: config.retry_count,
            retry_base_delay_ms: config.retry_base_delay_ms,
        })
    }

    /// Create translation prompt
    fn create_prompt(text: &str, source: &Lang, target: &Lang) -> String {
        let source_hint = if source.is_auto() {
            String::new()
        } else {
            format!(" from {}", language_name(source))
        };
        format!(
            "Translate the following text{} into {}. Output only the translation, no explanations.\n\nText: \"{}\"",
            source_hint,
            language_name(target),
            text
        )
    }

    /// Make API request with retry and exponential backoff.
    async fn request_with_retry(
        &self,
        text: &str,
        source: &Lang,
        target: &Lang,
    ) -> Result<ProviderReply> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: Self::create_prompt(text, source, target),
            }],
            // Lower temperature for more consistent translations
            temperature: 0.3,
        };

        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!(
                "Translation request attempt {}/{} to {}",
                attempt + 1,
                self.retry_count,
                url
            );

            let req = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request);

            match req.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.json::<ChatResponse>().await {
                            Ok(chat_response) => {
                                if let Some(choice) = chat_response.choices.first() {
                                    let translated = choice.message.content.trim();
                                    // Remove quotes if the model wrapped the response
                                    let translated = translated
                                        .trim_start_matches('"')
                                        .trim_end_matches('"')
                                        .to_string();
                                    return Ok(ProviderReply {
                                        text: translated,
                                        detected_source: None,
                                    });
                                }
                                last_error = Some(Error::TranslationInvalidResponse(
                                    "No choices in response".to_string(),
                                ));
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
impl TranslationProvider for DeepSeekProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "deepseek",
            requires_api_key: true,
            supports_auto_detect: false,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<ProviderReply> {
        self.request_with_retry(text, source, target).await
    }
}

/// Convert language code to human-readable name for prompts
fn language_name(lang: &Lang) -> &'static str {
    match lang.as_str() {
        "en" => "English",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "ru" => "Russian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        // The model understands most ISO codes directly
        _ => "the specified language",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_names_cover_common_codes() {
        assert_eq!(language_name(&Lang::new("en")), "English");
        assert_eq!(language_name(&Lang::new("zh")), "Chinese");
        assert_eq!(language_name(&Lang::new("xx")), "the specified language");
    }

    #[test]
    fn prompt_omits_source_hint_for_auto() {
        let prompt = DeepSeekProvider::create_prompt("Salut", &Lang::auto(), &Lang::new("en"));
        assert!(!prompt.contains("from"));
        assert!(prompt.contains("into English"));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = TranslatorConfig::default();
        assert!(matches!(
            DeepSeekProvider::new(&config),
            Err(Error::ConfigInvalid { .. })
        ));
    }
}
