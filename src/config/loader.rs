//! Configuration file discovery and loading.
//!
//! Configuration is optional. Lookup order:
//! 1. An explicit `--config <path>` (must exist)
//! 2. `imgprep.yml` in the project directory
//! 3. Built-in defaults

use crate::config::schema::ProvisionConfig;
use crate::error::{ProvisionError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Conventional config file name inside the project directory.
pub const CONFIG_FILE_NAME: &str = "imgprep.yml";

/// Find the project config file, if present.
pub fn find_project_config(project_root: &Path) -> Option<PathBuf> {
    let path = project_root.join(CONFIG_FILE_NAME);
    if path.is_file() {
        Some(path)
    } else {
        None
    }
}

/// Load a single config file and parse it into `ProvisionConfig`.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParse` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<ProvisionConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProvisionError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ProvisionError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into `ProvisionConfig`.
///
/// An empty document yields the defaults.
pub fn parse_config(content: &str, source_path: &Path) -> Result<ProvisionConfig> {
    if content.trim().is_empty() {
        return Ok(ProvisionConfig::default());
    }

    serde_yaml::from_str(content).map_err(|e| ProvisionError::ConfigParse {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load config with optional path override.
///
/// Relative override paths are resolved against the project root.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<ProvisionConfig> {
    if let Some(override_path) = config_override {
        let path = if override_path.is_absolute() {
            override_path.to_path_buf()
        } else {
            project_root.join(override_path)
        };
        tracing::debug!("Loading config from {}", path.display());
        return load_config_file(&path);
    }

    match find_project_config(project_root) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            load_config_file(&path)
        }
        None => {
            tracing::debug!("No {} found, using built-in defaults", CONFIG_FILE_NAME);
            Ok(ProvisionConfig::default())
        }
    }
}
