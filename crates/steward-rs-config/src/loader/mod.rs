//! Layered configuration loading.
//!
//! Layers are discovered in precedence order (user, project, cwd, runtime),
//! each one is schema-checked on its own so errors can name the file, and the
//! stack is folded into a single `StewardConfig`.

mod discovery;
mod layer;
mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, StewardConfig};
use log::{debug, info};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the project root and the working directory.
const DEFAULT_CONFIG_FILE: &str = "steward.json5";
/// Directory under `$HOME` holding the per-user file.
const DEFAULT_CONFIG_DIR: &str = ".steward";
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

/// The effective config together with the layers that produced it.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: StewardConfig,
    /// Contributing layers, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
}

/// Where a layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    User,
    Project,
    Cwd,
    /// Explicit override files; these win over everything else.
    Runtime,
}

/// A layer that contributed to a `LayeredConfig`.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: Option<PathBuf>,
}

/// Controls which files `load_layered_with_options` considers.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    pub cwd: PathBuf,
    /// Per-user file; `None` skips the user layer.
    pub user_config_path: Option<PathBuf>,
    /// Override files, applied in order after all discovered layers. Each must exist.
    pub runtime_paths: Vec<PathBuf>,
    /// Entries whose presence marks a directory as the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: discovery::default_user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn without_user_layer(mut self) -> Self {
        self.user_config_path = None;
        self
    }
}

impl StewardConfig {
    /// Parse one file, ignoring every other layer.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading config (path={})", path.display());
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::read(path, err))?;
        let value = json5::from_str(&contents)
            .map_err(|err| ConfigError::syntax(path.display().to_string(), err))?;
        finish(value, "config")
    }

    /// Parse JSON5 text, ignoring every other layer.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from text (len={})", contents.len());
        let value = json5::from_str(contents).map_err(|err| ConfigError::syntax("config", err))?;
        finish(value, "config")
    }

    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load every layer `options` describes and fold them, later layers winning.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let plan = discovery::plan_layers(&options)?;
        debug!("config layer plan has {} candidates", plan.len());

        let mut layers = Vec::with_capacity(plan.len());
        let mut effective = Value::Object(Map::new());
        for candidate in &plan {
            if let Some(loaded) = layer::read_layer(candidate)? {
                effective = layer::overlay(effective, loaded.value);
                layers.push(loaded.meta);
            }
        }

        let config = finish(effective, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Range checks that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems = [
            (
                self.orchestrator.max_iterations == 0,
                "orchestrator.max_iterations must be at least 1",
            ),
            (self.memory.search_k == 0, "memory.search_k must be at least 1"),
            (
                self.memory.hashing_dimensions == 0,
                "memory.hashing_dimensions must be at least 1",
            ),
            (
                !(0.0..=2.0).contains(&self.llm.temperature),
                "llm.temperature must be between 0 and 2",
            ),
        ];
        match problems.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(ConfigError::Invalid((*message).to_string())),
            None => Ok(()),
        }
    }
}

fn finish(value: Value, label: &str) -> Result<StewardConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: StewardConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
