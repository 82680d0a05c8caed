//! Config loading errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading or validating config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Contents are not valid JSON5; `origin` names the file or `config`.
    #[error("{origin} is not valid JSON5: {source}")]
    Syntax {
        origin: String,
        #[source]
        source: json5::Error,
    },
    /// The merged document does not deserialize into `StewardConfig`.
    #[error("failed to decode config: {0}")]
    Decode(#[from] serde_json::Error),
    /// A field failed schema validation; `path` is `<layer>:<dotted.path>`.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// A semantic constraint on the effective config failed.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn syntax(origin: impl Into<String>, source: json5::Error) -> Self {
        ConfigError::Syntax {
            origin: origin.into(),
            source,
        }
    }
}
