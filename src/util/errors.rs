use std::io;
use thiserror::Error;

/// Errors surfaced by the node's storage, state machine and config layers.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Corrupt store: {0}")]
    CorruptStore(String),
    #[error("Log inconsistency detected")]
    LogInconsistency,
    #[error("Bad command payload: {0}")]
    Command(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;

/// Parse failures at the wire boundary. The transport logs these and drops
/// the connection without responding; node state is never touched.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown message type {0:?}")]
    UnknownMessage(String),
    #[error("{message} expects {expected} fields, got {got}")]
    FieldCount {
        message: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid {field} field {value:?}")]
    InvalidField {
        field: &'static str,
        value: String,
    },
    #[error("malformed log entry {0:?}")]
    MalformedEntry(String),
    #[error("declared {declared} entries, got {got}")]
    EntryCount { declared: usize, got: usize },
    #[error("entry batch not contiguous: expected index {expected}, got {got}")]
    NonContiguous { expected: u64, got: u64 },
}
