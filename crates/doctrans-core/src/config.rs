use serde::{Deserialize, Serialize};

/// Language codes following ISO 639-1, plus the special "auto" marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The "source language unknown / let the provider decide" marker.
    pub fn auto() -> Self {
        Self::new("auto")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_auto(&self) -> bool {
        self.0 == "auto"
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

fn default_target_lang() -> Lang {
    Lang::new("en")
}

/// Supported upload formats.
///
/// Anything else is rejected at the boundary before the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Jpg,
    Jpeg,
    Png,
}

impl FileType {
    /// Parse from a filename extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Parse from a full filename.
    pub fn from_filename(name: &str) -> Option<Self> {
        name.rsplit('.').next().and_then(Self::from_extension)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub const fn is_image(self) -> bool {
        matches!(self, Self::Jpg | Self::Jpeg | Self::Png)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Annotation text color, normalized RGB in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn dark_red() -> Self {
        Self::new(0.8, 0.0, 0.0)
    }

    /// Convert to RGB bytes (0-255)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_rgb_bytes(&self) -> (u8, u8, u8) {
        // Values are clamped to 0.0-1.0 range, so conversion is safe
        (
            (self.r.clamp(0.0, 1.0) * 255.0) as u8,
            (self.g.clamp(0.0, 1.0) * 255.0) as u8,
            (self.b.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Translation tier selecting the provider backend.
///
/// Both backends expose the same contract; the orchestrator never needs to
/// know which one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
}

/// Translator backend configuration.
///
/// The free tier talks to a LibreTranslate-compatible endpoint; the premium
/// tier to an OpenAI-chat-compatible endpoint (DeepSeek and friends).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub tier: Tier,
    #[serde(default = "default_free_api_base")]
    pub free_api_base: String,
    #[serde(default = "default_premium_api_base")]
    pub premium_api_base: String,
    pub api_key: Option<String>,
    #[serde(default = "default_premium_model")]
    pub model: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per translation call (first try included)
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Base delay for exponential backoff between attempts
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_free_api_base() -> String {
    "http://localhost:5001".to_string()
}

fn default_premium_api_base() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_premium_model() -> String {
    "deepseek-chat".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_retry_count() -> u32 {
    3
}

const fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            tier: Tier::Free,
            free_api_base: default_free_api_base(),
            premium_api_base: default_premium_api_base(),
            api_key: None,
            model: default_premium_model(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

/// Monthly character-usage accounting for tiered cost calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Characters included per calendar month before overage pricing
    #[serde(default = "default_free_tier_chars")]
    pub free_tier_chars: u64,
    /// USD per million characters beyond the free tier
    #[serde(default = "default_overage_rate")]
    pub overage_rate_per_million: f64,
}

const fn default_free_tier_chars() -> u64 {
    500_000
}

const fn default_overage_rate() -> f64 {
    0.15
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            free_tier_chars: default_free_tier_chars(),
            overage_rate_per_million: default_overage_rate(),
        }
    }
}

/// OCR cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Maximum cached recognition results (LRU eviction)
    #[serde(default = "default_ocr_cache_entries")]
    pub cache_max_entries: u64,
}

const fn default_ocr_cache_entries() -> u64 {
    256
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            cache_max_entries: default_ocr_cache_entries(),
        }
    }
}

/// Storage adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sqlx connection URL, e.g. "sqlite://doctrans.db?mode=rwc"
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Passphrase for content encryption at rest.
    ///
    /// Read once at startup; every Document/Version payload is encrypted
    /// with it before hitting the database.
    pub encryption_passphrase: String,
}

fn default_database_url() -> String {
    "sqlite://doctrans.db?mode=rwc".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            encryption_passphrase: String::new(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default target language when the caller does not specify one
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Translator backend configuration
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Usage accounting configuration
    #[serde(default)]
    pub usage: UsageConfig,

    /// OCR configuration
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_lang: default_target_lang(),
            translator: TranslatorConfig::default(),
            usage: UsageConfig::default(),
            ocr: OcrConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}")))
    }

    /// Load from default locations (~/.config/doctrans/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("doctrans").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        // Return defaults
        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.storage.encryption_passphrase.is_empty() {
            return Err(crate::error::Error::ConfigInvalid {
                field: "storage.encryption_passphrase".to_string(),
                reason: "must not be empty; content is always encrypted at rest".to_string(),
            });
        }
        if self.translator.tier == Tier::Premium && self.translator.api_key.is_none() {
            return Err(crate::error::Error::ConfigInvalid {
                field: "translator.api_key".to_string(),
                reason: "premium tier requires an API key".to_string(),
            });
        }
        Ok(())
    }
}

/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "en";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_from_filename() {
        assert_eq!(FileType::from_filename("scan.PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_filename("photo.jpeg"), Some(FileType::Jpeg));
        assert_eq!(FileType::from_filename("notes.docx"), None);
    }

    #[test]
    fn validate_requires_passphrase() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.encryption_passphrase = "s3cret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn premium_requires_api_key() {
        let mut config = AppConfig::default();
        config.storage.encryption_passphrase = "s3cret".to_string();
        config.translator.tier = Tier::Premium;
        assert!(config.validate().is_err());

        config.translator.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
    }
}
