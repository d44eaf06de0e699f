//! Audit record model and its canonical one-line encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{EncodeError, ParseError};

/// A monitored file action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Create,
    Open,
    Rename,
    Unlink,
    Write,
}

impl EventKind {
    /// Every monitored kind, in subscription order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Create,
        EventKind::Open,
        EventKind::Rename,
        EventKind::Unlink,
        EventKind::Write,
    ];

    /// Returns the literal name used in the audit log.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Open => "Open",
            Self::Rename => "Rename",
            Self::Unlink => "Unlink",
            Self::Write => "Write",
        }
    }

    /// Native notify event code of the kernel security source.
    #[must_use]
    pub fn native_code(&self) -> u32 {
        match self {
            Self::Open => 10,
            Self::Create => 13,
            Self::Rename => 25,
            Self::Unlink => 32,
            Self::Write => 33,
        }
    }

    /// Decode a native event code. Codes outside the monitored set yield `None`.
    #[must_use]
    pub fn from_native(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.native_code() == code)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::UnknownKind(s.to_string()))
    }
}

/// One accepted file action.
///
/// `timestamp` is the event source's monotonic time, an ordering token and
/// not a wall-clock value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    file_name: String,
    timestamp: u64,
    user: String,
    process_id: i32,
    event_kind: EventKind,
}

impl AuditRecord {
    /// Create a record. Any directory component in `file_name` is stripped
    /// so the stored name never contains a separator.
    pub fn new(
        file_name: impl Into<String>,
        timestamp: u64,
        user: impl Into<String>,
        process_id: i32,
        event_kind: EventKind,
    ) -> Self {
        let file_name = file_name.into();
        let file_name = match file_name.rsplit_once('/') {
            Some((_, base)) => base.to_string(),
            None => file_name,
        };
        Self {
            file_name,
            timestamp,
            user: user.into(),
            process_id,
            event_kind,
        }
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    #[must_use]
    pub fn event_kind(&self) -> EventKind {
        self.event_kind
    }

    /// Render the record as `fileName,timeStamp,user,processId,eventKind\n`.
    ///
    /// Commas inside fields are written as-is. A line break inside a field
    /// would split the record across lines, so it is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the file name or user contains a line break.
    pub fn encode(&self) -> Result<String, EncodeError> {
        for (field, value) in [("file_name", &self.file_name), ("user", &self.user)] {
            if value.contains(['\n', '\r']) {
                return Err(EncodeError::LineBreak { field });
            }
        }
        Ok(format!(
            "{},{},{},{},{}\n",
            self.file_name, self.timestamp, self.user, self.process_id, self.event_kind
        ))
    }

    /// Parse one line written by [`AuditRecord::encode`]. A trailing newline
    /// is accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not hold exactly five fields or a
    /// numeric or kind field fails to parse.
    pub fn parse_line(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split(',').collect();
        let [file_name, timestamp, user, process_id, kind] = fields.as_slice() else {
            return Err(ParseError::FieldCount(fields.len()));
        };

        let timestamp = timestamp
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidNumber {
                field: "timestamp",
                value: (*timestamp).to_string(),
            })?;
        let process_id = process_id
            .parse::<i32>()
            .map_err(|_| ParseError::InvalidNumber {
                field: "process_id",
                value: (*process_id).to_string(),
            })?;

        Ok(Self {
            file_name: (*file_name).to_string(),
            timestamp,
            user: (*user).to_string(),
            process_id,
            event_kind: kind.parse()?,
        })
    }
}

impl FromStr for AuditRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s)
    }
}
