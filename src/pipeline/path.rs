//! Path resolution from raw event payloads.

use crate::source::{Destination, FileRef, RawPayload};

const SEPARATOR: char = '/';

/// Resolve the absolute path an event acted on.
///
/// Renames resolve to the source path. Returns `None` when the payload
/// carries no usable path; such events are dropped without complaint.
#[must_use]
pub fn resolve_path(payload: &RawPayload) -> Option<String> {
    match payload {
        RawPayload::Create { destination } => destination_path(destination),
        RawPayload::Open { file } => file_path(file),
        RawPayload::Rename { source, .. } => file_path(source),
        RawPayload::Unlink { target, .. } | RawPayload::Write { target } => file_path(target),
    }
}

fn file_path(file: &FileRef) -> Option<String> {
    file.path.as_deref().filter(|p| !p.is_empty()).map(String::from)
}

fn destination_path(destination: &Destination) -> Option<String> {
    match destination {
        Destination::ExistingFile(file) => file_path(file),
        Destination::NewPath { dir, filename } => {
            if filename.is_empty() {
                return None;
            }
            let dir = file_path(dir)?;
            if dir.ends_with(SEPARATOR) {
                Some(format!("{dir}{filename}"))
            } else {
                Some(format!("{dir}{SEPARATOR}{filename}"))
            }
        }
    }
}

/// Split a path into its parent folder and file name.
///
/// A path without a separator has an empty parent.
#[must_use]
pub fn split_path(path: &str) -> (&str, &str) {
    path.rsplit_once(SEPARATOR).unwrap_or(("", path))
}
