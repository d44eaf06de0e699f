//! Subscription lifecycle against an event source.

use std::path::Path;
use std::sync::Arc;

use super::error::{ConnectError, SourceError};
use super::event::RawEvent;
use crate::audit::EventKind;
use crate::dispatch::Dispatcher;
use crate::pipeline::EventPipeline;

/// Callback an event source invokes for every notification.
///
/// It runs on the source's own thread and returns without blocking.
pub type EventCallback = Arc<dyn Fn(RawEvent) + Send + Sync>;

/// A system-wide file event source.
///
/// Implementations deliver events by calling the callback handed to
/// [`EventSource::connect`] until [`EventSource::disconnect`] returns, and
/// must release the callback on disconnect.
pub trait EventSource: Send {
    /// Establish the connection and register the callback.
    ///
    /// # Errors
    ///
    /// Returns why the connection could not be established.
    fn connect(&mut self, callback: EventCallback) -> Result<(), ConnectError>;

    /// Declare the event kinds to deliver.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is refused.
    fn subscribe(&mut self, kinds: &[EventKind]) -> Result<(), ConnectError>;

    /// Suppress events caused by the current process.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot mute this process.
    fn mute_current_process(&mut self) -> Result<(), SourceError>;

    /// Tear the connection down.
    ///
    /// # Errors
    ///
    /// Returns an error if teardown fails.
    fn disconnect(&mut self) -> Result<(), SourceError>;

    /// Start delivering events for a newly monitored folder.
    ///
    /// Sources that observe the whole system have nothing to do here.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be watched.
    fn watch_folder(&mut self, _folder: &Path) -> Result<(), SourceError> {
        Ok(())
    }

    /// Stop delivering events for a folder that is no longer monitored.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch could not be removed.
    fn unwatch_folder(&mut self, _folder: &Path) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Connection state of a [`SubscriptionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Disconnected,
    Connected,
}

/// Owns the connection to an event source and routes its events through the
/// pipeline onto the dispatch queue.
pub struct SubscriptionManager<S: EventSource> {
    source: S,
    pipeline: Arc<EventPipeline>,
    dispatcher: Dispatcher,
    self_pid: i32,
    state: SubscriptionState,
}

impl<S: EventSource> SubscriptionManager<S> {
    pub fn new(source: S, pipeline: Arc<EventPipeline>, dispatcher: Dispatcher) -> Self {
        Self {
            source,
            pipeline,
            dispatcher,
            self_pid: current_pid(),
            state: SubscriptionState::Disconnected,
        }
    }

    /// Override the pid treated as "this process".
    #[must_use]
    pub fn with_self_pid(mut self, pid: i32) -> Self {
        self.self_pid = pid;
        self
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SubscriptionState::Connected
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Connect, subscribe to every [`EventKind`] and mute this process.
    ///
    /// A failed mute is logged and tolerated; the ignored-file policy still
    /// keeps the audit log's own writes out of the trail. Calling this while
    /// connected is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the connection or subscription failure. No subscription is
    /// left behind on error.
    pub fn connect(&mut self) -> Result<(), ConnectError> {
        if self.is_connected() {
            tracing::debug!("Already connected to event source");
            return Ok(());
        }

        self.source.connect(self.callback()).map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to event source");
            e
        })?;

        if let Err(e) = self.source.subscribe(&EventKind::ALL) {
            tracing::error!(error = %e, "Failed to subscribe to file events");
            if let Err(teardown) = self.source.disconnect() {
                tracing::warn!(error = %teardown, "Teardown after failed subscribe also failed");
            }
            return Err(e);
        }

        if let Err(e) = self.source.mute_current_process() {
            tracing::warn!(
                error = %e,
                "Could not mute own process, relying on ignored files"
            );
        }

        self.state = SubscriptionState::Connected;
        tracing::info!(pid = self.self_pid, "Subscribed to file events");
        Ok(())
    }

    /// Tear the subscription down. Idempotent; teardown failures are logged.
    ///
    /// Records already enqueued are not flushed here; drain the dispatch
    /// queue afterwards to persist them.
    pub fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        if let Err(e) = self.source.disconnect() {
            tracing::warn!(error = %e, "Event source teardown failed");
        }
        self.state = SubscriptionState::Disconnected;
        tracing::info!("Disconnected from event source");
    }

    /// Monitor `folder` from now on, registering it with the source first.
    /// Returns `false` if it was already monitored.
    ///
    /// # Errors
    ///
    /// Returns the source's error; the policy is left unchanged.
    pub fn add_monitored_folder(&mut self, folder: &str) -> Result<bool, SourceError> {
        let policy = self.pipeline.policy();
        if policy.snapshot().monitored_folders().iter().any(|f| f == folder) {
            return Ok(false);
        }
        self.source.watch_folder(Path::new(folder))?;
        Ok(policy.add_monitored_folder(folder))
    }

    /// Stop monitoring `folder`. Events from it are filtered out even if the
    /// source fails to drop its watch. Returns `false` if it was not monitored.
    pub fn remove_monitored_folder(&mut self, folder: &str) -> bool {
        if !self.pipeline.policy().remove_monitored_folder(folder) {
            return false;
        }
        if let Err(e) = self.source.unwatch_folder(Path::new(folder)) {
            tracing::warn!(folder = %folder, error = %e, "Failed to release folder watch");
        }
        true
    }

    fn callback(&self) -> EventCallback {
        let pipeline = Arc::clone(&self.pipeline);
        let dispatcher = self.dispatcher.clone();
        let self_pid = self.self_pid;
        Arc::new(move |event: RawEvent| {
            handle_event(&pipeline, &dispatcher, self_pid, &event);
        })
    }
}

impl<S: EventSource> Drop for SubscriptionManager<S> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn handle_event(pipeline: &EventPipeline, dispatcher: &Dispatcher, self_pid: i32, event: &RawEvent) {
    if event.process.pid == self_pid {
        tracing::trace!(event_type = event.event_type, "Ignoring event from own process");
        return;
    }
    if let Some(record) = pipeline.process(event) {
        dispatcher.submit(record);
    }
}

fn current_pid() -> i32 {
    i32::try_from(std::process::id()).unwrap_or(-1)
}
