//! Configuration types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::InvalidSetting;
use crate::audit::default_log_path;
use crate::dispatch::FailureMode;
use crate::pipeline::PolicySnapshot;

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Audit log file.
    pub log_path: PathBuf,
    /// Folders whose direct children are audited.
    pub monitored_folders: Vec<String>,
    /// Bare file names never audited.
    pub ignored_files: Vec<String>,
    /// Force data to disk after every append.
    pub sync_writes: bool,
    /// Whether auditing stops or carries on after a failed append.
    pub on_write_failure: FailureMode,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            monitored_folders: Vec::new(),
            ignored_files: Vec::new(),
            sync_writes: false,
            on_write_failure: FailureMode::Stop,
        }
    }
}

impl AuditConfig {
    /// Initial policy described by this configuration.
    #[must_use]
    pub fn policy_snapshot(&self) -> PolicySnapshot {
        PolicySnapshot::new(
            self.monitored_folders.iter().cloned(),
            self.ignored_files.iter().cloned(),
        )
    }

    /// Check that every folder and file name can actually match an event.
    ///
    /// # Errors
    ///
    /// Returns the first setting that can never match.
    pub fn validate(&self) -> Result<(), InvalidSetting> {
        self.monitored_folders
            .iter()
            .try_for_each(|folder| check_monitored_folder(folder))?;
        self.ignored_files
            .iter()
            .try_for_each(|name| check_ignored_name(name))
    }

    /// Anchor a relative `log_path` at `base`, the directory of the file it
    /// was read from.
    pub(crate) fn anchor_log_path(&mut self, base: &Path) {
        if self.log_path.is_relative() {
            self.log_path = base.join(&self.log_path);
        }
    }
}

/// Check a folder before it joins the Monitored Folder Set.
///
/// # Errors
///
/// Returns an error for relative paths and paths with a trailing separator.
pub fn check_monitored_folder(folder: &str) -> Result<(), InvalidSetting> {
    if !Path::new(folder).is_absolute() {
        return Err(InvalidSetting::RelativeFolder(folder.to_string()));
    }
    if folder.len() > 1 && folder.ends_with('/') {
        return Err(InvalidSetting::TrailingSeparator(folder.to_string()));
    }
    Ok(())
}

/// Check a name before it joins the Ignored File Set.
///
/// # Errors
///
/// Returns an error unless `name` is a single path component.
pub fn check_ignored_name(name: &str) -> Result<(), InvalidSetting> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(InvalidSetting::NotBareName(name.to_string()));
    }
    Ok(())
}
