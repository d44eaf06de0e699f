//! Shared fixtures: a scripted event source and a fixed user table.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use folder_audit::audit::EventKind;
use folder_audit::pipeline::UserResolver;
use folder_audit::source::{
    ConnectError, Destination, EventCallback, EventSource, FileRef, ProcessIdentity, RawEvent,
    RawPayload, SourceError,
};

#[derive(Default)]
struct State {
    callback: Option<EventCallback>,
    subscribed: Vec<EventKind>,
    muted: bool,
    disconnects: usize,
    watched: Vec<String>,
}

/// Test-side view of a [`ScriptedSource`] that stays usable after the source
/// has been moved into a monitor.
#[derive(Clone, Default)]
pub struct SourceHandle {
    state: Arc<Mutex<State>>,
}

impl SourceHandle {
    /// Deliver an event the way the OS would: synchronously on the caller's
    /// thread. Returns `false` if no callback is registered.
    pub fn emit(&self, event: RawEvent) -> bool {
        let callback = self.state.lock().unwrap().callback.clone();
        match callback {
            Some(callback) => {
                callback(event);
                true
            }
            None => false,
        }
    }

    /// Deliver an event from a separate thread.
    pub fn emit_from_thread(&self, event: RawEvent) -> bool {
        let handle = self.clone();
        std::thread::spawn(move || handle.emit(event)).join().unwrap()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().callback.is_some()
    }

    pub fn subscribed(&self) -> Vec<EventKind> {
        self.state.lock().unwrap().subscribed.clone()
    }

    pub fn muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    /// Folders registered through `watch_folder` and not yet released.
    pub fn watched(&self) -> Vec<String> {
        self.state.lock().unwrap().watched.clone()
    }
}

/// Event source driven entirely by the test.
pub struct ScriptedSource {
    handle: SourceHandle,
    connect_error: Option<ConnectError>,
    mute_fails: bool,
}

impl ScriptedSource {
    pub fn new() -> (Self, SourceHandle) {
        let handle = SourceHandle::default();
        let source = Self {
            handle: handle.clone(),
            connect_error: None,
            mute_fails: false,
        };
        (source, handle)
    }

    pub fn failing(error: ConnectError) -> (Self, SourceHandle) {
        let (mut source, handle) = Self::new();
        source.connect_error = Some(error);
        (source, handle)
    }

    pub fn without_mute() -> (Self, SourceHandle) {
        let (mut source, handle) = Self::new();
        source.mute_fails = true;
        (source, handle)
    }
}

impl EventSource for ScriptedSource {
    fn connect(&mut self, callback: EventCallback) -> Result<(), ConnectError> {
        if let Some(error) = self.connect_error.clone() {
            return Err(error);
        }
        self.handle.state.lock().unwrap().callback = Some(callback);
        Ok(())
    }

    fn subscribe(&mut self, kinds: &[EventKind]) -> Result<(), ConnectError> {
        self.handle.state.lock().unwrap().subscribed = kinds.to_vec();
        Ok(())
    }

    fn mute_current_process(&mut self) -> Result<(), SourceError> {
        if self.mute_fails {
            return Err(SourceError::Unsupported("mute"));
        }
        self.handle.state.lock().unwrap().muted = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        let mut state = self.handle.state.lock().unwrap();
        state.callback = None;
        state.disconnects += 1;
        Ok(())
    }

    fn watch_folder(&mut self, folder: &Path) -> Result<(), SourceError> {
        let mut state = self.handle.state.lock().unwrap();
        state.watched.push(folder.display().to_string());
        Ok(())
    }

    fn unwatch_folder(&mut self, folder: &Path) -> Result<(), SourceError> {
        let folder = folder.display().to_string();
        self.handle.state.lock().unwrap().watched.retain(|f| *f != folder);
        Ok(())
    }
}

/// Fixed uid to account-name table.
pub struct Users(HashMap<u32, String>);

impl Users {
    pub fn with(entries: &[(u32, &str)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(uid, name)| (*uid, (*name).to_string()))
                .collect(),
        )
    }
}

impl UserResolver for Users {
    fn user_name(&self, uid: u32) -> Option<String> {
        self.0.get(&uid).cloned()
    }
}

pub const ALICE: u32 = 501;

pub fn alice() -> Users {
    Users::with(&[(ALICE, "alice")])
}

pub fn identity(pid: i32, euid: u32) -> ProcessIdentity {
    ProcessIdentity { pid, euid }
}

pub fn write_event(time: u64, pid: i32, path: &str) -> RawEvent {
    RawEvent::new(
        time,
        identity(pid, ALICE),
        RawPayload::Write {
            target: FileRef::new(path),
        },
    )
}

pub fn create_event(time: u64, pid: i32, dir: &str, filename: &str) -> RawEvent {
    RawEvent::new(
        time,
        identity(pid, ALICE),
        RawPayload::Create {
            destination: Destination::NewPath {
                dir: FileRef::new(dir),
                filename: filename.to_string(),
            },
        },
    )
}

pub fn rename_event(time: u64, pid: i32, from: &str, to: &str) -> RawEvent {
    RawEvent::new(
        time,
        identity(pid, ALICE),
        RawPayload::Rename {
            source: FileRef::new(from),
            destination: Destination::ExistingFile(FileRef::new(to)),
        },
    )
}
