//! Connection to the system file event source.

mod error;
mod event;
mod fs_notify;
mod manager;

pub use error::{ConnectError, SourceError};
pub use event::{Destination, FileRef, ProcessIdentity, RawEvent, RawPayload};
pub use fs_notify::{FsNotifySource, UNATTRIBUTED_PID};
pub use manager::{EventCallback, EventSource, SubscriptionManager, SubscriptionState};
