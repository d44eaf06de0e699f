//! Folder/file policy applied to every resolved event.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Immutable view of the policy at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySnapshot {
    monitored_folders: Vec<String>,
    ignored_files: HashSet<String>,
}

impl PolicySnapshot {
    pub fn new<F, I>(monitored_folders: F, ignored_files: I) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut snapshot = Self::default();
        for folder in monitored_folders {
            let folder = folder.into();
            if !snapshot.monitored_folders.contains(&folder) {
                snapshot.monitored_folders.push(folder);
            }
        }
        snapshot.ignored_files = ignored_files.into_iter().map(Into::into).collect();
        snapshot
    }

    #[must_use]
    pub fn monitored_folders(&self) -> &[String] {
        &self.monitored_folders
    }

    #[must_use]
    pub fn ignored_files(&self) -> &HashSet<String> {
        &self.ignored_files
    }

    /// Decide whether a file in `parent` named `file_name` is recorded.
    ///
    /// The parent must equal a monitored folder exactly; files deeper below
    /// a monitored folder are not covered.
    #[must_use]
    pub fn accepts(&self, parent: &str, file_name: &str) -> bool {
        self.monitored_folders.iter().any(|folder| folder == parent)
            && !self.ignored_files.contains(file_name)
    }
}

/// Shared, concurrently mutable policy.
///
/// Readers take a cheap `Arc` snapshot; writers publish a modified copy.
/// A reader never sees a half-applied change.
#[derive(Debug, Default)]
pub struct Policy {
    current: RwLock<Arc<PolicySnapshot>>,
}

impl Policy {
    #[must_use]
    pub fn new(snapshot: PolicySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Current policy.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    #[must_use]
    pub fn accepts(&self, parent: &str, file_name: &str) -> bool {
        self.snapshot().accepts(parent, file_name)
    }

    /// Replace the whole policy.
    pub fn replace(&self, snapshot: PolicySnapshot) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(snapshot);
    }

    fn update(&self, change: impl FnOnce(&mut PolicySnapshot)) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = PolicySnapshot::clone(&guard);
        change(&mut next);
        *guard = Arc::new(next);
    }

    /// Start monitoring `folder`. Returns `false` if it was already monitored.
    pub fn add_monitored_folder(&self, folder: impl Into<String>) -> bool {
        let folder = folder.into();
        let mut added = false;
        self.update(|policy| {
            if !policy.monitored_folders.contains(&folder) {
                tracing::info!(folder = %folder, "Monitoring folder");
                policy.monitored_folders.push(folder);
                added = true;
            }
        });
        added
    }

    /// Stop monitoring `folder`. Returns `false` if it was not monitored.
    pub fn remove_monitored_folder(&self, folder: &str) -> bool {
        let mut removed = false;
        self.update(|policy| {
            let before = policy.monitored_folders.len();
            policy.monitored_folders.retain(|f| f != folder);
            removed = policy.monitored_folders.len() != before;
        });
        if removed {
            tracing::info!(folder = %folder, "Stopped monitoring folder");
        }
        removed
    }

    pub fn set_monitored_folders<I>(&self, folders: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let folders = PolicySnapshot::new(folders, std::iter::empty::<String>()).monitored_folders;
        self.update(|policy| policy.monitored_folders = folders);
    }

    /// Exclude a file name everywhere. Returns `false` if already ignored.
    pub fn ignore_file(&self, file_name: impl Into<String>) -> bool {
        let file_name = file_name.into();
        let mut added = false;
        self.update(|policy| added = policy.ignored_files.insert(file_name));
        added
    }

    /// Returns `false` if the name was not ignored.
    pub fn unignore_file(&self, file_name: &str) -> bool {
        let mut removed = false;
        self.update(|policy| removed = policy.ignored_files.remove(file_name));
        removed
    }

    pub fn set_ignored_files<I>(&self, file_names: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let file_names: HashSet<String> = file_names.into_iter().map(Into::into).collect();
        self.update(|policy| policy.ignored_files = file_names);
    }
}
