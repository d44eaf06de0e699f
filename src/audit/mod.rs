//! Audit record model and append-only log writer.

mod error;
mod logger;
mod record;

pub use error::{AuditError, EncodeError, ParseError};
pub use logger::{default_log_path, AuditLogger};
pub use record::{AuditRecord, EventKind};
