//! Record construction from accepted events.

use crate::audit::{AuditRecord, EventKind};
use crate::source::RawEvent;

/// Translates a user ID to an account name.
pub trait UserResolver: Send + Sync {
    /// Returns `None` if the ID has no account.
    fn user_name(&self, uid: u32) -> Option<String>;
}

/// Looks users up in the system account database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUserResolver;

#[cfg(unix)]
impl UserResolver for SystemUserResolver {
    fn user_name(&self, uid: u32) -> Option<String> {
        use nix::unistd::{Uid, User};

        match User::from_uid(Uid::from_raw(uid)) {
            Ok(user) => user.map(|u| u.name),
            Err(e) => {
                tracing::debug!(uid, error = %e, "Account lookup failed");
                None
            }
        }
    }
}

#[cfg(not(unix))]
impl UserResolver for SystemUserResolver {
    fn user_name(&self, _uid: u32) -> Option<String> {
        None
    }
}

/// Build the record for an accepted event.
///
/// An unresolvable user drops the record with an error diagnostic.
pub fn build_record(
    kind: EventKind,
    file_name: &str,
    event: &RawEvent,
    users: &dyn UserResolver,
) -> Option<AuditRecord> {
    let Some(user) = users.user_name(event.process.euid) else {
        tracing::error!(
            uid = event.process.euid,
            pid = event.process.pid,
            kind = %kind,
            "Cannot resolve user for event, dropping record"
        );
        return None;
    };

    Some(AuditRecord::new(
        file_name,
        event.time,
        user,
        event.process.pid,
        kind,
    ))
}
