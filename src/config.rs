use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,

    #[serde(default)]
    pub builder: BuilderConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String, // "gemini", "ollama" or "openai"
    #[serde(default = "default_retry_count")]
    pub retry_count: usize,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
    pub gemini: Option<GeminiConfig>,
    pub ollama: Option<OllamaConfig>,
    pub openai: Option<OpenAIConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

/// Knobs for the generation pipeline itself.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BuilderConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_use_prompt_caching")]
    pub use_prompt_caching: bool,

    /// Hard timeout applied to every generation call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Cap on concurrent per-section composition calls.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// When set, a section whose composition exhausts retries is kept in
    /// the script marked as failed instead of aborting the whole build.
    #[serde(default)]
    pub allow_partial: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            use_prompt_caching: default_use_prompt_caching(),
            request_timeout_seconds: default_request_timeout(),
            max_concurrency: default_max_concurrency(),
            allow_partial: false,
        }
    }
}

fn default_retry_count() -> usize {
    3
}
fn default_retry_delay() -> u64 {
    10
}
fn default_temperature() -> f32 {
    0.6
}
fn default_max_output_tokens() -> u32 {
    8000
}
fn default_use_prompt_caching() -> bool {
    true
}
fn default_request_timeout() -> u64 {
    120
}
fn default_max_concurrency() -> usize {
    4
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.yml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("{} not found. Please create one.", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }
}
