use serde::{Deserialize, Serialize};

/// A single entry in the replicated log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    /// The index of this entry in the log (1-based)
    pub index: u64,
    /// The term when this entry was created
    pub term: u64,
    /// The command payload
    pub payload: Vec<u8>,
}

impl LogEntry {
    pub fn new(index: u64, term: u64, payload: Vec<u8>) -> Self {
        Self {
            index,
            term,
            payload,
        }
    }

    /// The permanent index-0 entry every log starts with, so that
    /// "previous entry" lookups at the head of the log are always valid.
    /// Never written to disk.
    pub fn sentinel() -> Self {
        Self {
            index: 0,
            term: 0,
            payload: Vec::new(),
        }
    }
}

/// Type alias for term numbers
pub type Term = u64;

/// Type alias for log indices
pub type LogIndex = u64;

/// Node identifier
pub type NodeId = String;
