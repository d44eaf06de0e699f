//! Locating and reading the TOML configuration.

use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::types::AuditConfig;

/// Per-directory config file name.
pub const LOCAL_CONFIG_FILE: &str = ".folder-audit.toml";

/// Where [`load`] looks when no file is named: the working directory, then
/// the user config directory.
fn default_locations() -> Vec<PathBuf> {
    let user = dirs::config_dir().map(|dir| dir.join("folder-audit").join("config.toml"));
    std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE))
        .chain(user)
        .collect()
}

/// Load the configuration.
///
/// An explicitly named file must exist. Otherwise the first file found in the
/// default locations is used, and defaults apply when there is none.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or names a folder
/// or file that can never match an event.
pub fn load(explicit: Option<&Path>) -> Result<AuditConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_file(path);
    }

    match default_locations().into_iter().find(|path| path.is_file()) {
        Some(path) => load_file(&path),
        None => {
            tracing::debug!("No config file found, using defaults");
            Ok(AuditConfig::default())
        }
    }
}

/// Read one config file. A relative `log_path` is taken relative to the
/// file's own directory.
///
/// # Errors
///
/// Same as [`load`].
pub fn load_file(path: &Path) -> Result<AuditConfig, ConfigError> {
    tracing::debug!(path = %path.display(), "Loading config file");
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: AuditConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    config.validate().map_err(|source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    config.anchor_log_path(base);
    Ok(config)
}
