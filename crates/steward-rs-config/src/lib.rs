//! Settings for the Steward assistant.
//!
//! `StewardConfig` is assembled from JSON5 layers (per-user, project,
//! working directory, then explicit overrides). Every section has defaults,
//! so an empty file is a valid config.

mod error;
mod loader;
mod model;

pub use error::ConfigError;
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
pub use model::{
    DEFAULT_MEMORY_PATH, EmbedderKind, LlmConfig, LlmProviderKind, MemoryConfig, OrchestratorConfig, SessionsConfig,
    StewardConfig, StewardConfigBuilder, ToolsConfig, WeatherConfig,
};
