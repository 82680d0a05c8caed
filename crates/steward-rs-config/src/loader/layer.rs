//! Reading, validating and stacking individual layers.

use super::discovery::LayerCandidate;
use super::{ConfigLayer, ConfigLayerSource, schema};
use crate::ConfigError;
use log::debug;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;

/// A layer that was found on disk and passed schema validation.
#[derive(Debug, Clone)]
pub(super) struct LoadedLayer {
    pub(super) meta: ConfigLayer,
    pub(super) value: Value,
}

/// Read `candidate`. Returns `None` when an optional file does not exist.
pub(super) fn read_layer(candidate: &LayerCandidate) -> Result<Option<LoadedLayer>, ConfigError> {
    let contents = match fs::read_to_string(&candidate.path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound && !candidate.required => {
            debug!(
                "no {:?} layer at {}",
                candidate.source,
                candidate.path.display()
            );
            return Ok(None);
        }
        Err(err) => return Err(ConfigError::read(&candidate.path, err)),
    };
    let label = label(candidate);
    let value: Value =
        json5::from_str(&contents).map_err(|err| ConfigError::syntax(label.clone(), err))?;
    schema::validate_layer_schema(&value, &label)?;
    debug!(
        "loaded {:?} layer (path={})",
        candidate.source,
        candidate.path.display()
    );
    Ok(Some(LoadedLayer {
        meta: ConfigLayer {
            source: candidate.source,
            path: Some(candidate.path.clone()),
        },
        value,
    }))
}

/// Prefix used in validation errors, e.g. `cwd(/work/steward.json5)`.
fn label(candidate: &LayerCandidate) -> String {
    let source = match candidate.source {
        ConfigLayerSource::User => "user",
        ConfigLayerSource::Project => "project",
        ConfigLayerSource::Cwd => "cwd",
        ConfigLayerSource::Runtime => "runtime",
    };
    format!("{source}({})", candidate.path.display())
}

/// Apply `top` over `base`. Objects merge key by key; any other value in
/// `top` replaces what was there.
pub(super) fn overlay(base: Value, top: Value) -> Value {
    match (base, top) {
        (Value::Object(mut merged), Value::Object(top)) => {
            for (key, value) in top {
                let combined = match merged.remove(&key) {
                    Some(existing) => overlay(existing, value),
                    None => value,
                };
                merged.insert(key, combined);
            }
            Value::Object(merged)
        }
        (_, top) => top,
    }
}
