use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_PROVIDER: &str = "mistral";
pub const DEFAULT_MODEL: &str = "mistral-tiny";
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_CADENCE_MS: u64 = 100;
pub const DEFAULT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    pub chat: Option<ChatConfig>,
    pub topics: Option<TopicsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LlmConfig {
    pub provider: Option<String>,         // used for the <PROVIDER>_API_KEY lookup
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub style: Option<String>,            // "chat" | "text"
    pub request_timeout_secs: Option<u64>,
    pub log_preview_chars: Option<usize>, // how many chars of prompt/answer to log
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChatConfig {
    pub cadence_ms: Option<u64>,
    pub suggestions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TopicsConfig {
    pub enabled: Option<bool>,
    pub keywords: Option<Vec<String>>,
    pub decline_reply: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl LlmConfig {
    pub fn provider(&self) -> String {
        self.provider.clone().unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }

    pub fn model(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Credential from config, falling back to `<PROVIDER>_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(format!("{}_API_KEY", self.provider().to_uppercase())).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn preview_chars(&self) -> usize {
        self.log_preview_chars.unwrap_or(DEFAULT_PREVIEW_CHARS)
    }
}

impl AppConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(
            self.chat
                .as_ref()
                .and_then(|c| c.cadence_ms)
                .unwrap_or(DEFAULT_CADENCE_MS),
        )
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.chat
            .as_ref()
            .and_then(|c| c.suggestions.clone())
            .unwrap_or_else(|| {
                vec![
                    "How do I build trust?".to_string(),
                    "How can I set healthy boundaries?".to_string(),
                    "How do I improve communication with my partner?".to_string(),
                ]
            })
    }

    pub fn log_level(&self) -> String {
        self.logging
            .as_ref()
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "info".to_string())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<AppConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: AppConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(cfg)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    load_config(path)
}
