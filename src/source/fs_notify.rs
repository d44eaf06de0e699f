//! Event source backed by the platform file watcher (`notify`).
//!
//! For hosts without a kernel security event source. The watcher cannot tell
//! which process touched a file, so events carry [`UNATTRIBUTED_PID`] and the
//! file owner's uid (or this process's effective uid once the file is gone).
//! Muting is unsupported; the ignored-file policy keeps the audit log's own
//! writes out of the trail.
//!
//! Renames are reported under their old path. Backends that pair the two
//! halves (inotify) mark the old one as "from". Backends that emit an
//! undirected rename for each path (FSEvents) are told apart by whether the
//! path still exists: the new name does, the old one does not. A file renamed
//! onto a name that is recreated before the notification is handled is
//! therefore missed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use notify::event::{AccessKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::error::{ConnectError, SourceError};
use super::event::{Destination, FileRef, ProcessIdentity, RawEvent, RawPayload};
use super::manager::{EventCallback, EventSource};
use crate::audit::EventKind;

/// Process ID reported for events whose originator is unknown.
pub const UNATTRIBUTED_PID: i32 = 0;

/// Watches a fixed set of folders, non-recursively.
pub struct FsNotifySource {
    folders: Vec<PathBuf>,
    kinds: Arc<RwLock<HashSet<EventKind>>>,
    watcher: Option<RecommendedWatcher>,
    watching: bool,
    epoch: Instant,
}

impl FsNotifySource {
    pub fn new<I>(folders: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        Self {
            folders: folders.into_iter().map(Into::into).collect(),
            kinds: Arc::new(RwLock::new(HashSet::new())),
            watcher: None,
            watching: false,
            epoch: Instant::now(),
        }
    }

    #[must_use]
    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }
}

impl EventSource for FsNotifySource {
    fn connect(&mut self, callback: EventCallback) -> Result<(), ConnectError> {
        let kinds = Arc::clone(&self.kinds);
        let epoch = self.epoch;

        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "File watcher error");
                    return;
                }
            };
            let Some(payload) = translate(&event) else {
                return;
            };
            let subscribed = kinds
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&payload.kind());
            if subscribed {
                let time = u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
                let process = identity_for(event.paths.first().map(PathBuf::as_path));
                callback(RawEvent::new(time, process, payload));
            }
        })
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create file watcher");
            connect_error(&e)
        })?;

        self.watcher = Some(watcher);
        Ok(())
    }

    fn subscribe(&mut self, kinds: &[EventKind]) -> Result<(), ConnectError> {
        let Some(watcher) = self.watcher.as_mut() else {
            return Err(ConnectError::InvalidArgument);
        };

        for folder in &self.folders {
            watcher
                .watch(folder, RecursiveMode::NonRecursive)
                .map_err(|e| {
                    tracing::error!(folder = %folder.display(), error = %e, "Failed to watch folder");
                    connect_error(&e)
                })?;
            tracing::debug!(folder = %folder.display(), "Watching folder");
        }

        *self.kinds.write().unwrap_or_else(PoisonError::into_inner) =
            kinds.iter().copied().collect();
        self.watching = true;
        Ok(())
    }

    fn mute_current_process(&mut self) -> Result<(), SourceError> {
        Err(SourceError::Unsupported(
            "file watcher cannot attribute events to processes",
        ))
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        let mut watcher = self.watcher.take().ok_or(SourceError::NotConnected)?;
        let was_watching = std::mem::replace(&mut self.watching, false);
        self.kinds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let mut first_error = None;
        if was_watching {
            for folder in &self.folders {
                if let Err(source) = watcher.unwatch(folder) {
                    first_error.get_or_insert(SourceError::Watch {
                        path: folder.display().to_string(),
                        source,
                    });
                }
            }
        }
        // Dropping the watcher releases the callback.
        drop(watcher);
        first_error.map_or(Ok(()), Err)
    }

    fn watch_folder(&mut self, folder: &Path) -> Result<(), SourceError> {
        if self.folders.iter().any(|f| f == folder) {
            return Ok(());
        }
        if let (true, Some(watcher)) = (self.watching, self.watcher.as_mut()) {
            watcher
                .watch(folder, RecursiveMode::NonRecursive)
                .map_err(|source| SourceError::Watch {
                    path: folder.display().to_string(),
                    source,
                })?;
            tracing::debug!(folder = %folder.display(), "Watching folder");
        }
        self.folders.push(folder.to_path_buf());
        Ok(())
    }

    fn unwatch_folder(&mut self, folder: &Path) -> Result<(), SourceError> {
        let Some(index) = self.folders.iter().position(|f| f == folder) else {
            return Ok(());
        };
        self.folders.remove(index);
        if let (true, Some(watcher)) = (self.watching, self.watcher.as_mut()) {
            watcher.unwatch(folder).map_err(|source| SourceError::Watch {
                path: folder.display().to_string(),
                source,
            })?;
            tracing::debug!(folder = %folder.display(), "Stopped watching folder");
        }
        Ok(())
    }
}

fn connect_error(error: &notify::Error) -> ConnectError {
    match &error.kind {
        notify::ErrorKind::PathNotFound | notify::ErrorKind::InvalidConfig(_) => {
            ConnectError::InvalidArgument
        }
        notify::ErrorKind::MaxFilesWatch => ConnectError::TooManyClients,
        notify::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            ConnectError::NotPermitted
        }
        _ => ConnectError::InternalError,
    }
}

fn file_ref(path: &Path) -> FileRef {
    FileRef {
        path: path.to_str().map(String::from),
    }
}

/// Map a watcher notification to a raw payload. Notifications with no
/// audited counterpart yield `None`.
///
/// Renames are taken from the "from" half, or from an undirected rename of a
/// path that no longer exists, so a move is reported once under its old path.
fn translate(event: &notify::Event) -> Option<RawPayload> {
    let first = event.paths.first()?;

    match &event.kind {
        notify::EventKind::Create(_) => Some(RawPayload::Create {
            destination: Destination::ExistingFile(file_ref(first)),
        }),
        notify::EventKind::Access(AccessKind::Open(_)) => Some(RawPayload::Open {
            file: file_ref(first),
        }),
        notify::EventKind::Modify(ModifyKind::Name(
            mode @ (RenameMode::From | RenameMode::Any),
        )) => {
            // An undirected rename of a path that still exists is the new name.
            if *mode == RenameMode::Any && first.symlink_metadata().is_ok() {
                return None;
            }
            Some(RawPayload::Rename {
                source: file_ref(first),
                destination: Destination::ExistingFile(
                    event.paths.get(1).map_or_else(FileRef::unresolved, |p| file_ref(p)),
                ),
            })
        }
        notify::EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
            Some(RawPayload::Write {
                target: file_ref(first),
            })
        }
        notify::EventKind::Remove(_) => Some(RawPayload::Unlink {
            target: file_ref(first),
            parent_dir: first.parent().map_or_else(FileRef::unresolved, file_ref),
        }),
        _ => None,
    }
}

#[cfg(unix)]
fn identity_for(path: Option<&Path>) -> ProcessIdentity {
    use std::os::unix::fs::MetadataExt;

    let euid = path
        .and_then(|p| std::fs::symlink_metadata(p).ok())
        .map_or_else(|| nix::unistd::geteuid().as_raw(), |meta| meta.uid());
    ProcessIdentity {
        pid: UNATTRIBUTED_PID,
        euid,
    }
}

#[cfg(not(unix))]
fn identity_for(_path: Option<&Path>) -> ProcessIdentity {
    ProcessIdentity {
        pid: UNATTRIBUTED_PID,
        euid: 0,
    }
}
