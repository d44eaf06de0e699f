//! Append-only audit log writer.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::error::AuditError;
use super::record::{AuditRecord, EventKind};
use crate::dispatch::EventHandler;

/// Returns the default path for the audit log.
///
/// This is `~/.local/share/folder-audit/audit.log` on Linux.
#[must_use]
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folder-audit")
        .join("audit.log")
}

/// Writer that appends encoded records to the end of a log file.
///
/// Every append seeks to the current end of file before writing, so growth
/// or truncation of the file by someone else between appends is tolerated.
/// Appends through clones of the same logger are serialized by a mutex.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    file: Arc<Mutex<File>>,
    path: PathBuf,
    sync_writes: bool,
}

impl AuditLogger {
    /// Open (or create) the log file at `path` for appending.
    ///
    /// Creates parent directories if they don't exist. Existing content is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|source| {
                    AuditError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .await
            .map_err(|source| AuditError::Open {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Opened audit log");

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path,
            sync_writes: false,
        })
    }

    /// Force file data to disk after every append.
    #[must_use]
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Returns the path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the log file's base name, if it is valid UTF-8.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Append one record at the current end of the file.
    ///
    /// A record that cannot be encoded is logged and skipped; that is not an
    /// error for the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if seeking to the end or writing fails.
    pub async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let line = match record.encode() {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    pid = record.process_id(),
                    kind = %record.event_kind(),
                    "Skipping audit record that cannot be encoded"
                );
                return Ok(());
            }
        };

        let mut file = self.file.lock().await;
        write_at_end(&mut file, line.as_bytes(), self.sync_writes)
            .await
            .map_err(|source| AuditError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

async fn write_at_end(file: &mut File, bytes: &[u8], sync: bool) -> std::io::Result<()> {
    file.seek(SeekFrom::End(0)).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    if sync {
        file.sync_data().await?;
    }
    Ok(())
}

#[async_trait]
impl EventHandler for AuditLogger {
    type Error = AuditError;

    async fn on_event(&mut self, _kind: EventKind, record: AuditRecord) -> Result<(), AuditError> {
        self.append(&record).await
    }
}
