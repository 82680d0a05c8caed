//! Assembly of the model provider, memory services and orchestrator from config.

use anyhow::Context;
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::deepseek::DeepSeek;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use steward_rs_config::{EmbedderKind, LlmConfig, LlmProviderKind, MemoryConfig, StewardConfig};
use steward_rs_core::{EventSink, LlmEmbedder, MissingCredentialsLLM, Orchestrator};
use steward_rs_memory::{Embedder, HashingEmbedder, MemoryStore, SemanticIndex};
use steward_rs_tools::{OpenMeteoWeather, TurnServices, WeatherProvider, builtin_tool_registry};

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// Build the chat model named by `config`.
///
/// When the API key variable is unset the returned provider fails every call
/// with a message naming the variable, so the console can still start.
pub fn build_llm(config: &LlmConfig) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let key_var = config.api_key_var();
    let api_key = std::env::var(key_var)
        .ok()
        .filter(|key| !key.trim().is_empty());
    let Some(api_key) = api_key else {
        return Ok(Arc::new(MissingCredentialsLLM::new(key_var)));
    };
    info!(
        "building LLM provider (provider={}, model={}, base_url_set={})",
        config.provider.as_str(),
        config.model,
        config.base_url.is_some()
    );
    match config.provider {
        LlmProviderKind::DeepSeek => build_deepseek(config, api_key),
        LlmProviderKind::OpenAI => build_openai(config, api_key),
    }
}

fn build_deepseek(config: &LlmConfig, api_key: String) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let mut builder = LLMBuilder::<DeepSeek>::new()
        .api_key(api_key)
        .model(config.model.clone())
        .temperature(config.temperature);
    if let Some(base_url) = provider_base_url(config) {
        builder = builder.base_url(base_url);
    }
    let llm: Arc<dyn LLMProvider> = builder
        .build()
        .context("failed to build DeepSeek LLM provider")?;
    Ok(llm)
}

fn build_openai(config: &LlmConfig, api_key: String) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let mut builder = LLMBuilder::<OpenAI>::new()
        .api_key(api_key)
        .model(config.model.clone())
        .temperature(config.temperature);
    if let Some(base_url) = provider_base_url(config) {
        builder = builder.base_url(base_url);
    }
    let llm: Arc<dyn LLMProvider> = builder
        .build()
        .context("failed to build OpenAI LLM provider")?;
    Ok(llm)
}

/// Endpoint handed to the builder. DeepSeek falls back to its public API;
/// OpenAI keeps the backend's own default when no override is set.
fn provider_base_url(config: &LlmConfig) -> Option<String> {
    match (&config.base_url, config.provider) {
        (Some(base_url), _) => Some(base_url.clone()),
        (None, LlmProviderKind::DeepSeek) => Some(DEEPSEEK_BASE_URL.to_string()),
        (None, LlmProviderKind::OpenAI) => None,
    }
}

/// Embedding backend for the semantic index.
pub fn build_embedder(
    config: &MemoryConfig,
    llm: Arc<dyn LLMProvider>,
) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.embedder {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.hashing_dimensions))),
        EmbedderKind::Llm => Ok(Arc::new(LlmEmbedder::new(llm))),
        #[cfg(feature = "fastembed")]
        EmbedderKind::Fastembed => {
            let embedder = steward_rs_memory::FastEmbedder::new()
                .context("failed to load local embedding model")?;
            Ok(Arc::new(embedder))
        }
        #[cfg(not(feature = "fastembed"))]
        EmbedderKind::Fastembed => {
            anyhow::bail!("memory.embedder = \"fastembed\" requires building with the fastembed feature")
        }
    }
}

/// Shared services for tool calls: memory store, index and weather lookup.
pub fn build_services(
    config: &StewardConfig,
    llm: Arc<dyn LLMProvider>,
) -> anyhow::Result<TurnServices> {
    let memory_path = PathBuf::from(config.memory.resolved_path());
    let store = Arc::new(MemoryStore::new(&memory_path));
    let embedder = build_embedder(&config.memory, llm)?;
    let index = Arc::new(SemanticIndex::new(store.clone(), embedder));

    let weather: Option<Arc<dyn WeatherProvider>> = if config.tools.weather.enabled {
        let provider = OpenMeteoWeather::from_config(&config.tools.weather)
            .context("failed to build weather client")?;
        Some(Arc::new(provider))
    } else {
        warn!("weather lookups disabled by config");
        None
    };

    Ok(TurnServices {
        memory: Some(store),
        index: Some(index),
        weather,
        ..TurnServices::default()
    })
}

/// Orchestrator over the built-in tools with services derived from `config`.
pub fn build_orchestrator(
    config: StewardConfig,
    llm: Arc<dyn LLMProvider>,
    event_sink: Option<Arc<dyn EventSink>>,
) -> anyhow::Result<Orchestrator> {
    let services = build_services(&config, llm.clone())?;
    let orchestrator = Orchestrator::new(
        config,
        llm,
        builtin_tool_registry(),
        services,
        None,
        event_sink,
    )
    .context("failed to build orchestrator")?;
    Ok(orchestrator)
}
