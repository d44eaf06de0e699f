//! Configuration module.

mod error;
mod loader;
mod types;

pub use error::{ConfigError, InvalidSetting};
pub use loader::{load, load_file, LOCAL_CONFIG_FILE};
pub use types::{check_ignored_name, check_monitored_folder, AuditConfig};
