pub mod election;
pub mod node;
pub mod replication;
pub mod rpc;
pub mod state;
pub mod types;

pub use node::{LogEntryView, NodeStatus, RaftNode, SharedNode};
pub use state::{RaftRole, RaftState};
