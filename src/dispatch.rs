//! Ordered single-consumer dispatch queue.
//!
//! Decouples the event source's callback thread, which must return
//! immediately, from the handler that persists records. Producers enqueue
//! without blocking; one consumer task hands records to the handler strictly
//! in submission order, one at a time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditRecord, EventKind};

/// Receives every accepted record on the dispatch consumer task.
#[async_trait]
pub trait EventHandler: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handle one record. What a failure does to the queue depends on its
    /// [`FailureMode`].
    async fn on_event(&mut self, kind: EventKind, record: AuditRecord) -> Result<(), Self::Error>;
}

/// How the consumer reacts to a handler failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop at the first failure. Records still queued are reported as lost.
    #[default]
    Stop,
    /// Log the failure and keep handling later records.
    Continue,
}

/// Errors reported when the queue is drained.
#[derive(thiserror::Error, Debug)]
pub enum DispatchError<E: std::error::Error + 'static> {
    /// The handler failed. `lost` counts accepted records that were never
    /// handled successfully, the failing ones included.
    #[error("Event handler failed, {lost} accepted records not handled: {source}")]
    Handler {
        #[source]
        source: E,
        handled: u64,
        lost: u64,
    },

    /// The consumer task panicked or was aborted.
    #[error("Dispatch task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

/// Cheap, cloneable producer side of a [`DispatchQueue`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<AuditRecord>,
}

impl Dispatcher {
    /// Enqueue a record without blocking. Safe to call from any thread.
    ///
    /// Returns `false` if the consumer has stopped and the record was dropped.
    pub fn submit(&self, record: AuditRecord) -> bool {
        match self.tx.send(record) {
            Ok(()) => true,
            Err(mpsc::error::SendError(record)) => {
                tracing::warn!(
                    kind = %record.event_kind(),
                    pid = record.process_id(),
                    "Dispatch queue closed, dropping record"
                );
                false
            }
        }
    }

    /// Check whether the consumer is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Background queue owning the consumer task.
pub struct DispatchQueue<E: std::error::Error + Send + Sync + 'static> {
    dispatcher: Dispatcher,
    consumer: JoinHandle<Result<u64, DispatchError<E>>>,
    stopped: CancellationToken,
}

impl<E: std::error::Error + Send + Sync + 'static> DispatchQueue<E> {
    /// Start the consumer task on the current tokio runtime, stopping at the
    /// first handler failure.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<H>(handler: H) -> Self
    where
        H: EventHandler<Error = E>,
    {
        Self::spawn_with(handler, FailureMode::Stop)
    }

    /// Start the consumer task with an explicit [`FailureMode`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn_with<H>(handler: H, mode: FailureMode) -> Self
    where
        H: EventHandler<Error = E>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let stopped = CancellationToken::new();
        let consumer = tokio::spawn(consume(handler, rx, mode, stopped.clone()));

        Self {
            dispatcher: Dispatcher { tx },
            consumer,
            stopped,
        }
    }

    /// Get a producer handle.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Token cancelled once the consumer exits, whether drained or failed.
    #[must_use]
    pub fn stopped_token(&self) -> CancellationToken {
        self.stopped.clone()
    }

    /// Close this queue's producer handle and wait for the consumer to finish.
    ///
    /// Completes once every other [`Dispatcher`] clone has been dropped and
    /// all records already enqueued have been handled. Returns the number of
    /// records handled.
    ///
    /// # Errors
    ///
    /// Returns the first handler error together with the number of records
    /// lost, or a join error if the consumer task panicked.
    pub async fn drain(self) -> Result<u64, DispatchError<E>> {
        let Self {
            dispatcher,
            consumer,
            stopped: _,
        } = self;
        drop(dispatcher);
        consumer.await?
    }
}

async fn consume<H: EventHandler>(
    mut handler: H,
    mut rx: mpsc::UnboundedReceiver<AuditRecord>,
    mode: FailureMode,
    stopped: CancellationToken,
) -> Result<u64, DispatchError<H::Error>> {
    let _stopped = stopped.drop_guard();
    let mut handled = 0u64;
    let mut lost = 0u64;
    let mut first_error = None;

    while let Some(record) = rx.recv().await {
        let kind = record.event_kind();
        let (file_name, timestamp, pid) = (
            record.file_name().to_string(),
            record.timestamp(),
            record.process_id(),
        );
        let Err(e) = handler.on_event(kind, record).await else {
            handled += 1;
            continue;
        };

        lost += 1;
        tracing::error!(error = %e, file = %file_name, %kind, timestamp, pid, "Record not persisted");
        first_error.get_or_insert(e);
        if mode == FailureMode::Stop {
            rx.close();
            while let Ok(pending) = rx.try_recv() {
                lost += 1;
                report_lost(&pending);
            }
            tracing::error!(handled, lost, "Dispatch stopped after handler failure");
            break;
        }
    }

    match first_error {
        Some(source) => Err(DispatchError::Handler {
            source,
            handled,
            lost,
        }),
        None => {
            tracing::debug!(handled, "Dispatch queue drained");
            Ok(handled)
        }
    }
}

fn report_lost(record: &AuditRecord) {
    tracing::error!(
        file = %record.file_name(),
        kind = %record.event_kind(),
        timestamp = record.timestamp(),
        pid = record.process_id(),
        "Queued record dropped after handler failure"
    );
}
