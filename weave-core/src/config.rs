//! Configuration types for Weave

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model used by the scenarios.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Default embedding model used by the similarity router.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Main configuration for Weave
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WeaveConfig {
    /// LLM provider settings
    pub llm: LlmSettings,

    /// Memory-entry generator settings
    pub memory: MemorySettings,
}

/// LLM provider settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider type
    pub provider: ProviderKind,

    /// Chat model name
    pub model: String,

    /// Embedding model name
    pub embedding_model: String,

    /// API base URL
    pub base_url: String,

    /// API key. Prefer the `OPENAI_API_KEY` environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI or any OpenAI-compatible endpoint
    OpenAI,
}

/// Memory-entry generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Directory that receives generated entries
    pub dir: PathBuf,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".github/agents/memory"),
        }
    }
}

impl MemorySettings {
    /// Location of the optional entry template.
    pub fn template_path(&self) -> PathBuf {
        self.dir.join("templates").join("bmad-template.md")
    }
}

impl WeaveConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `weave.toml` in the working directory
    /// 3. File named by `WEAVE_CONFIG_PATH`
    /// 4. `WEAVE_` environment variables (`__` separates sections,
    ///    e.g. `WEAVE_LLM__MODEL`)
    /// 5. Provider variables: `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is malformed.
    pub fn load() -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(WeaveConfig::default()))
            .merge(Toml::file("weave.toml"));

        if let Ok(path) = std::env::var("WEAVE_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let mut config: WeaveConfig = figment
            .merge(Env::prefixed("WEAVE_").split("__"))
            .extract()
            .map_err(|e| {
                crate::error::WeaveError::Configuration(format!(
                    "Failed to load configuration: {}",
                    e
                ))
            })?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// Provider environment variables still apply on top of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let mut config: WeaveConfig = Figment::from(Serialized::defaults(WeaveConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                crate::error::WeaveError::Configuration(format!(
                    "Failed to load configuration file: {}",
                    e
                ))
            })?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = std::env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            self.llm.base_url = base_url;
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(crate::error::WeaveError::Configuration(
                "llm.model must not be empty".to_string(),
            ));
        }
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(crate::error::WeaveError::Configuration(format!(
                "llm.base_url must be an http(s) URL, got '{}'",
                self.llm.base_url
            )));
        }
        Ok(())
    }
}
