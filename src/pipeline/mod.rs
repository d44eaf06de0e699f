//! Per-event decode, filter and build stage.
//!
//! Runs on the event source's callback thread, so it only does in-memory
//! work: resolve the path, consult the policy, resolve the user.

mod builder;
mod filter;
mod path;

use std::sync::Arc;

pub use builder::{build_record, SystemUserResolver, UserResolver};
pub use filter::{Policy, PolicySnapshot};
pub use path::{resolve_path, split_path};

use crate::audit::{AuditRecord, EventKind};
use crate::source::RawEvent;

/// Turns raw events into audit records, or drops them.
pub struct EventPipeline {
    policy: Arc<Policy>,
    users: Box<dyn UserResolver>,
}

impl EventPipeline {
    pub fn new(policy: Arc<Policy>, users: impl UserResolver + 'static) -> Self {
        Self {
            policy,
            users: Box::new(users),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    /// Process one event. Returns the record to persist, or `None` if the
    /// event is undecodable, filtered out, or has no resolvable user.
    #[must_use]
    pub fn process(&self, event: &RawEvent) -> Option<AuditRecord> {
        let Some(kind) = EventKind::from_native(event.event_type) else {
            tracing::trace!(event_type = event.event_type, "Ignoring unmonitored event type");
            return None;
        };
        if event.payload.kind() != kind {
            tracing::trace!(
                event_type = event.event_type,
                payload = %event.payload.kind(),
                "Ignoring event whose payload does not match its type"
            );
            return None;
        }

        let Some(path) = resolve_path(&event.payload) else {
            tracing::trace!(kind = %kind, "Ignoring event without a path");
            return None;
        };

        let (parent, file_name) = split_path(&path);
        if !self.policy.accepts(parent, file_name) {
            tracing::debug!(kind = %kind, path = %path, "Event filtered by policy");
            return None;
        }

        build_record(kind, file_name, event, self.users.as_ref())
    }
}
