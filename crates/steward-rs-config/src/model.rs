//! Configuration schema for Steward.

use serde::{Deserialize, Serialize};

/// Default location of the memory document, relative to the working directory.
pub const DEFAULT_MEMORY_PATH: &str = "data/user_memory.json";

/// Root config for the Steward assistant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StewardConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

impl StewardConfig {
    /// Defaults with selected sections replaced, for embedding without files.
    pub fn builder() -> StewardConfigBuilder {
        StewardConfigBuilder::default()
    }
}

/// Section-by-section construction of a `StewardConfig`.
#[derive(Debug, Default, Clone)]
pub struct StewardConfigBuilder {
    config: StewardConfig,
}

impl StewardConfigBuilder {
    pub fn llm(self, llm: LlmConfig) -> Self {
        self.edit(|config| config.llm = llm)
    }

    pub fn orchestrator(self, orchestrator: OrchestratorConfig) -> Self {
        self.edit(|config| config.orchestrator = orchestrator)
    }

    pub fn tools(self, tools: ToolsConfig) -> Self {
        self.edit(|config| config.tools = tools)
    }

    pub fn memory(self, memory: MemoryConfig) -> Self {
        self.edit(|config| config.memory = memory)
    }

    pub fn sessions(self, sessions: SessionsConfig) -> Self {
        self.edit(|config| config.sessions = sessions)
    }

    /// Finish, applying the same range checks as file loading.
    pub fn build(self) -> Result<StewardConfig, crate::ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    fn edit(mut self, apply: impl FnOnce(&mut StewardConfig)) -> Self {
        apply(&mut self.config);
        self
    }
}

/// Chat model backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// DeepSeek chat completions API.
    #[default]
    DeepSeek,
    /// OpenAI (or OpenAI-compatible) chat completions API.
    OpenAI,
}

impl LlmProviderKind {
    /// Return the provider as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProviderKind::DeepSeek => "deepseek",
            LlmProviderKind::OpenAI => "openai",
        }
    }

    /// Key variable used when `api_key_env` is not set.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            LlmProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
            LlmProviderKind::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key. Unset means the
    /// provider's conventional variable.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Endpoint override. Unset means the provider's own endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            model: default_model(),
            api_key_env: None,
            base_url: None,
            temperature: default_temperature(),
        }
    }
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

impl LlmConfig {
    /// The variable the API key is read from.
    pub fn api_key_var(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }
}

fn default_temperature() -> f32 {
    0.7
}

/// Configuration for the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Replaces the built-in persona prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Appended to the persona prompt as additional instructions.
    #[serde(default)]
    pub append_system_prompt: Option<String>,
    /// Maximum agent-node invocations per turn.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            append_system_prompt: None,
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_max_iterations() -> usize {
    10
}

/// Global tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Upper bound for a single tool invocation.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default)]
    pub weather: WeatherConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            weather: WeatherConfig::default(),
        }
    }
}

fn default_call_timeout_secs() -> u64 {
    30
}

/// Weather lookup endpoints and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            timeout_secs: default_weather_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_weather_timeout_secs() -> u64 {
    10
}

/// Embedding backend used by the semantic index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Deterministic feature-hashing embedder (offline).
    #[default]
    Hashing,
    /// Local sentence-embedding model (requires the `fastembed` feature).
    Fastembed,
    /// Embedding endpoint of the configured LLM provider.
    Llm,
}

/// Long-term memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Path of the memory document; defaults to `data/user_memory.json`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_search_k")]
    pub search_k: usize,
    #[serde(default)]
    pub embedder: EmbedderKind,
    #[serde(default = "default_hashing_dimensions")]
    pub hashing_dimensions: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            search_k: default_search_k(),
            embedder: EmbedderKind::default(),
            hashing_dimensions: default_hashing_dimensions(),
        }
    }
}

impl MemoryConfig {
    /// Configured memory path or the default location.
    pub fn resolved_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| DEFAULT_MEMORY_PATH.to_string())
    }
}

fn default_search_k() -> usize {
    3
}

fn default_hashing_dimensions() -> usize {
    256
}

/// Session checkpoint persistence.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionsConfig {
    /// Persist checkpoints as JSONL files instead of process memory only.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub path: Option<String>,
}
