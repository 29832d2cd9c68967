use super::election;
use super::replication;
use super::rpc::{
    AppendEntriesRequest, AppendEntriesResponse, RequestVoteRequest, RequestVoteResponse,
};
use super::state::{RaftRole, RaftState};
use super::types::{LogIndex, NodeId, Term};
use crate::config::NodeConfig;
use crate::machine::{StateMachine, WorkerMachine};
use crate::storage::{FileLogStore, FileStateStore, LogStore, StateStore};
use crate::util::errors::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A worker node: Raft state, the durable stores and the state machine.
/// Mutated only through the RPC entry points below.
pub struct RaftNode {
    state: RaftState,
    state_store: Box<dyn StateStore>,
    log_store: Box<dyn LogStore>,
    machine: Box<dyn StateMachine>,
}

/// Handle shared by the transport and monitor tasks. RPC handling and
/// snapshot reads all serialize on this one lock; persistence and apply
/// run inside the critical section, so acknowledged state is never lost
/// relative to what the caller saw.
pub type SharedNode = Arc<Mutex<RaftNode>>;

/// Snapshot of the node for the status surface
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub node: NodeId,
    pub role: RaftRole,
    pub term: Term,
    pub leader: Option<NodeId>,
    pub commit_index: LogIndex,
    pub last_applied: LogIndex,
    pub applied_commands: u64,
}

/// One log entry as reported by the monitor, payload base64-encoded
#[derive(Debug, Clone, Serialize)]
pub struct LogEntryView {
    pub index: u64,
    pub term: u64,
    pub payload: String,
}

impl RaftNode {
    /// Open (or create) the node rooted at the config's data directory
    /// and hydrate term, vote and log from disk. Volatile state starts
    /// at its defaults regardless of what was committed before.
    pub fn open(config: &NodeConfig) -> Result<Self> {
        let state_store = FileStateStore::new(config.data_dir.clone())?;
        let log_store = FileLogStore::new(config.data_dir.clone())?;
        let machine = WorkerMachine::new(config.data_dir.clone())?;

        let mut state = RaftState::new(config.node_id.clone());
        state.current_term = state_store.load_term()?;
        state.voted_for = state_store.load_voted_for()?;

        tracing::info!(
            "Node {} recovered: term={}, voted_for={:?}, log entries={}",
            state.node_id,
            state.current_term,
            state.voted_for,
            log_store.last_index()
        );

        Ok(Self {
            state,
            state_store: Box::new(state_store),
            log_store: Box::new(log_store),
            machine: Box::new(machine),
        })
    }

    pub fn handle_request_vote(
        &mut self,
        request: RequestVoteRequest,
    ) -> Result<RequestVoteResponse> {
        election::handle_request_vote(
            &mut self.state,
            self.state_store.as_mut(),
            self.log_store.as_ref(),
            request,
        )
    }

    pub fn handle_append_entries(
        &mut self,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse> {
        replication::handle_append_entries(
            &mut self.state,
            self.state_store.as_mut(),
            self.log_store.as_mut(),
            self.machine.as_mut(),
            request,
        )
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            node: self.state.node_id.clone(),
            role: self.state.role,
            term: self.state.current_term,
            leader: self.state.current_leader.clone(),
            commit_index: self.state.commit_index,
            last_applied: self.state.last_applied,
            applied_commands: self.machine.applied_count(),
        }
    }

    /// Full log including the sentinel, ordered by index
    pub fn log_view(&self) -> Vec<LogEntryView> {
        self.log_store
            .entries()
            .iter()
            .map(|e| LogEntryView {
                index: e.index,
                term: e.term,
                payload: BASE64.encode(&e.payload),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raft::types::LogEntry;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> NodeConfig {
        NodeConfig {
            node_id: "worker-1".to_string(),
            host: "127.0.0.1".to_string(),
            raft_port: 0,
            monitor_port: 0,
            data_dir: dir.path().to_path_buf(),
            peers: vec![],
        }
    }

    #[test]
    fn test_open_fresh_node() {
        let temp_dir = TempDir::new().unwrap();
        let node = RaftNode::open(&test_config(&temp_dir)).unwrap();

        let status = node.status();
        assert_eq!(status.node, "worker-1");
        assert_eq!(status.term, 0);
        assert_eq!(status.role, RaftRole::Follower);
        assert_eq!(status.leader, None);
        assert_eq!(status.commit_index, 0);
        assert_eq!(node.log_view().len(), 1);
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        {
            let mut node = RaftNode::open(&config).unwrap();

            let vote = node
                .handle_request_vote(RequestVoteRequest {
                    term: 3,
                    candidate_id: "worker-2".to_string(),
                    last_log_index: 0,
                    last_log_term: 0,
                })
                .unwrap();
            assert!(vote.vote_granted);

            let append = node
                .handle_append_entries(AppendEntriesRequest {
                    term: 3,
                    leader_id: "worker-2".to_string(),
                    prev_log_index: 0,
                    prev_log_term: 0,
                    leader_commit: 1,
                    entries: vec![LogEntry::new(1, 3, b"NOP".to_vec())],
                })
                .unwrap();
            assert!(append.success);
            assert_eq!(node.status().last_applied, 1);
        }

        let node = RaftNode::open(&config).unwrap();
        let status = node.status();

        // Durable state recovered, volatile state reset
        assert_eq!(status.term, 3);
        assert_eq!(status.commit_index, 0);
        assert_eq!(status.last_applied, 0);
        assert_eq!(status.leader, None);
        assert_eq!(node.log_view().len(), 2);
        assert_eq!(node.log_view()[1].payload, BASE64.encode(b"NOP"));
    }

    #[test]
    fn test_replay_after_restart_duplicates_registry() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let registry = temp_dir.path().join("models_registry.txt");

        let request = AppendEntriesRequest {
            term: 1,
            leader_id: "worker-2".to_string(),
            prev_log_index: 0,
            prev_log_term: 0,
            leader_commit: 2,
            entries: vec![
                LogEntry::new(1, 1, b"STORE_FILE|a.txt|0|5|aGVsbG8=".to_vec()),
                LogEntry::new(2, 1, b"REGISTER_MODEL|m-1|linear|0.9|100".to_vec()),
            ],
        };

        {
            let mut node = RaftNode::open(&config).unwrap();
            node.handle_append_entries(request.clone()).unwrap();

            let lines = std::fs::read_to_string(&registry).unwrap();
            assert_eq!(lines.lines().count(), 1);
        }

        // After restart the commit index is volatile; the leader's next
        // heartbeat re-commits and re-applies the prefix
        let mut node = RaftNode::open(&config).unwrap();
        let heartbeat = AppendEntriesRequest {
            term: 1,
            leader_id: "worker-2".to_string(),
            prev_log_index: 2,
            prev_log_term: 1,
            leader_commit: 2,
            entries: vec![],
        };
        node.handle_append_entries(heartbeat).unwrap();

        // STORE_FILE replay is idempotent, REGISTER_MODEL is not
        let content = std::fs::read_to_string(temp_dir.path().join("a.txt")).unwrap();
        assert_eq!(content, "hello");

        let lines = std::fs::read_to_string(&registry).unwrap();
        assert_eq!(lines.lines().count(), 2);
    }
}
