//! Where config layers live and the order they apply in.

use super::{ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, LayeredConfigOptions};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A file that may contribute a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct LayerCandidate {
    pub(super) source: ConfigLayerSource,
    pub(super) path: PathBuf,
    /// Missing optional files are skipped; missing required ones are errors.
    pub(super) required: bool,
}

/// `~/.steward/steward.json5`, when a home directory exists.
pub(super) fn default_user_config_path() -> Option<PathBuf> {
    let dirs = UserDirs::new()?;
    Some(
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE),
    )
}

/// Candidate layers ordered from lowest to highest precedence.
///
/// Local files that resolve to the same path (project root == cwd) appear once.
pub(super) fn plan_layers(options: &LayeredConfigOptions) -> Result<Vec<LayerCandidate>, ConfigError> {
    let cwd = resolve_cwd(&options.cwd)?;
    let mut optional = Vec::with_capacity(3);
    if let Some(path) = &options.user_config_path {
        optional.push((ConfigLayerSource::User, path.clone()));
    }
    match project_root(&cwd, &options.project_root_markers) {
        Some(root) => optional.push((ConfigLayerSource::Project, root.join(DEFAULT_CONFIG_FILE))),
        None => debug!("no project root above {}", cwd.display()),
    }
    optional.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));

    let mut seen = HashSet::new();
    let mut plan: Vec<LayerCandidate> = optional
        .into_iter()
        .filter(|(source, path)| {
            let fresh = seen.insert(identity(path));
            if !fresh {
                debug!("dropping duplicate {:?} layer ({})", source, path.display());
            }
            fresh
        })
        .map(|(source, path)| LayerCandidate {
            source,
            path,
            required: false,
        })
        .collect();
    plan.extend(options.runtime_paths.iter().map(|path| LayerCandidate {
        source: ConfigLayerSource::Runtime,
        path: path.clone(),
        required: true,
    }));
    Ok(plan)
}

fn resolve_cwd(cwd: &Path) -> Result<PathBuf, ConfigError> {
    match cwd.canonicalize() {
        Ok(path) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(cwd.to_path_buf()),
        Err(err) => Err(ConfigError::read(cwd, err)),
    }
}

fn identity(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn project_root(cwd: &Path, markers: &[String]) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|dir| markers.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}
