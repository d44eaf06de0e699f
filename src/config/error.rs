//! Configuration error types.

use std::path::PathBuf;

/// A setting that can never take effect as written.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSetting {
    /// Monitored folders are compared against absolute parent paths.
    #[error("monitored folder {0:?} is not an absolute path")]
    RelativeFolder(String),

    /// A trailing separator never equals a parent path.
    #[error("monitored folder {0:?} ends with a path separator")]
    TrailingSeparator(String),

    /// Ignored files are matched by bare file name.
    #[error("ignored file {0:?} is not a bare file name")]
    NotBareName(String),
}

/// Errors that can occur while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid setting in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: InvalidSetting,
    },
}
