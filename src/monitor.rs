//! Wires the audit logger, policy, dispatch queue and event subscription
//! together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::audit::{AuditError, AuditLogger};
use crate::config::{check_monitored_folder, AuditConfig, InvalidSetting};
use crate::dispatch::{DispatchError, DispatchQueue};
use crate::pipeline::{EventPipeline, Policy, UserResolver};
use crate::source::{ConnectError, EventSource, SourceError, SubscriptionManager};

/// Errors reported while starting or reconfiguring the monitor.
#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("Failed to connect to event source: {0}")]
    Connect(#[from] ConnectError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] InvalidSetting),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// A running audit monitor.
pub struct Monitor<S: EventSource> {
    manager: SubscriptionManager<S>,
    queue: DispatchQueue<AuditError>,
    policy: Arc<Policy>,
    log_path: PathBuf,
}

impl<S: EventSource> Monitor<S> {
    /// Open the log, start the dispatch queue and connect to `source`.
    ///
    /// The log file's own name is added to the ignored files before any
    /// event can arrive.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured folder or file name can never match,
    /// the log cannot be opened or the connection fails. Nothing is left
    /// running on error.
    pub async fn start(
        config: &AuditConfig,
        source: S,
        users: impl UserResolver + 'static,
    ) -> Result<Self, MonitorError> {
        config.validate()?;
        let logger = AuditLogger::open(&config.log_path)
            .await?
            .with_sync_writes(config.sync_writes);
        let log_path = logger.path().to_path_buf();

        let policy = Arc::new(Policy::new(config.policy_snapshot()));
        if let Some(name) = logger.file_name() {
            policy.ignore_file(name);
        }

        let pipeline = Arc::new(EventPipeline::new(Arc::clone(&policy), users));
        let queue = DispatchQueue::spawn_with(logger, config.on_write_failure);
        let mut manager = SubscriptionManager::new(source, pipeline, queue.dispatcher());
        manager.connect()?;

        tracing::info!(
            log = %log_path.display(),
            folders = policy.snapshot().monitored_folders().len(),
            "Audit monitor started"
        );

        Ok(Self {
            manager,
            queue,
            policy,
            log_path,
        })
    }

    /// Live policy; changes apply to the next event without reconnecting.
    ///
    /// Folders added here are not registered with the event source. Use
    /// [`Monitor::add_monitored_folder`] for sources that watch per folder.
    #[must_use]
    pub fn policy(&self) -> Arc<Policy> {
        Arc::clone(&self.policy)
    }

    /// Start auditing `folder` without reconnecting. Returns `false` if it
    /// was already monitored.
    ///
    /// # Errors
    ///
    /// Returns an error if `folder` is not a usable absolute path or the
    /// source cannot watch it.
    pub fn add_monitored_folder(&mut self, folder: &str) -> Result<bool, MonitorError> {
        check_monitored_folder(folder)?;
        Ok(self.manager.add_monitored_folder(folder)?)
    }

    /// Stop auditing `folder`. Returns `false` if it was not monitored.
    pub fn remove_monitored_folder(&mut self, folder: &str) -> bool {
        self.manager.remove_monitored_folder(folder)
    }

    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Token cancelled when the dispatch queue stops, e.g. after a failed append.
    #[must_use]
    pub fn stopped_token(&self) -> CancellationToken {
        self.queue.stopped_token()
    }

    /// Disconnect, then persist every record already enqueued.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Returns the first append failure with the number of records lost.
    pub async fn shutdown(self) -> Result<u64, DispatchError<AuditError>> {
        let Self {
            mut manager, queue, ..
        } = self;
        manager.disconnect();
        drop(manager);

        let written = queue.drain().await?;
        tracing::info!(written, "Audit monitor stopped");
        Ok(written)
    }
}
