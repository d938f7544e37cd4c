use thiserror::Error;

/// Reasons a session could not be created or joined. The session stays disconnected after any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("room {0} was not found")]
    TokenNotFound(String),

    #[error("room code {0} matches more than one room")]
    AmbiguousToken(String),

    #[error("timed out connecting to the room")]
    Timeout,

    #[error("could not connect to the room: {0}")]
    Connect(String),

    #[error("peer directory unavailable: {0}")]
    Directory(String),

    #[error("could not open a local endpoint: {0}")]
    Bind(String),

    #[error("a session is already active")]
    AlreadyActive,
}
