//! Raw events as delivered by an event source.
//!
//! Native payloads are decoded into these owned values at the source
//! boundary; nothing downstream touches source-specific structures.

use crate::audit::EventKind;

/// Reference to a file object. `path` is `None` when the source could not
/// resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileRef {
    pub path: Option<String>,
}

impl FileRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A reference whose path could not be resolved.
    #[must_use]
    pub fn unresolved() -> Self {
        Self { path: None }
    }
}

/// Destination of a create or rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The operation targets a file object that already exists.
    ExistingFile(FileRef),
    /// The operation produces a new path: a directory plus a base name.
    NewPath { dir: FileRef, filename: String },
}

/// Kind-specific event body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    Create { destination: Destination },
    Open { file: FileRef },
    Rename { source: FileRef, destination: Destination },
    Unlink { target: FileRef, parent_dir: FileRef },
    Write { target: FileRef },
}

impl RawPayload {
    /// The event kind this payload describes.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Create { .. } => EventKind::Create,
            Self::Open { .. } => EventKind::Open,
            Self::Rename { .. } => EventKind::Rename,
            Self::Unlink { .. } => EventKind::Unlink,
            Self::Write { .. } => EventKind::Write,
        }
    }
}

/// Identity of the process that caused an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: i32,
    /// Effective user ID.
    pub euid: u32,
}

/// One notification from the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Native event type code, see [`EventKind::from_native`].
    pub event_type: u32,
    /// Source-supplied monotonic time, an opaque ordering token.
    pub time: u64,
    pub process: ProcessIdentity,
    pub payload: RawPayload,
}

impl RawEvent {
    /// Build an event whose native code matches its payload.
    #[must_use]
    pub fn new(time: u64, process: ProcessIdentity, payload: RawPayload) -> Self {
        Self {
            event_type: payload.kind().native_code(),
            time,
            process,
            payload,
        }
    }
}
