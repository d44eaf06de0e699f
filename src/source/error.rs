//! Event source error types.

/// Reasons a connection to the event source can fail.
///
/// All are terminal for the attempt; retrying is the caller's decision.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The binary lacks the entitlement required to use the event source.
    #[error("Missing entitlement for the event source")]
    NoEntitlement,

    /// The user has not granted runtime authorization yet.
    #[error("Not permitted to connect; grant access and retry")]
    NotPermitted,

    #[error("Invalid argument passed to the event source")]
    InvalidArgument,

    /// The OS refused another client.
    #[error("Too many event source clients")]
    TooManyClients,

    #[error("Internal event source error")]
    InternalError,

    #[error("Unhandled event source result code {0}")]
    UnhandledError(i32),
}

impl ConnectError {
    /// Map a native client-creation result code. Code 0 means success and
    /// yields `None`.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => None,
            1 => Some(Self::InvalidArgument),
            2 => Some(Self::InternalError),
            3 => Some(Self::NoEntitlement),
            4 => Some(Self::NotPermitted),
            6 => Some(Self::TooManyClients),
            other => Some(Self::UnhandledError(other)),
        }
    }
}

/// Non-connection failures reported by an event source.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// The source does not implement the requested capability.
    #[error("Unsupported by this event source: {0}")]
    Unsupported(&'static str),

    /// No connection is established.
    #[error("Event source is not connected")]
    NotConnected,

    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: String,
        #[source]
        source: notify::Error,
    },
}
