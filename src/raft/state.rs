use super::types::{LogIndex, NodeId, Term};
use serde::Serialize;

/// The three roles a Raft node can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RaftRole {
    /// Follower role - accepts entries from the leader
    Follower,
    /// Candidate role - requesting votes for leadership
    Candidate,
    /// Leader role - manages log replication
    Leader,
}

impl std::fmt::Display for RaftRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaftRole::Follower => write!(f, "Follower"),
            RaftRole::Candidate => write!(f, "Candidate"),
            RaftRole::Leader => write!(f, "Leader"),
        }
    }
}

/// Mutable state of a Raft node
#[derive(Debug, Clone)]
pub struct RaftState {
    // Persistent state (mirrored to the state store on every change)
    /// Latest term server has seen (initialized to 0)
    pub current_term: Term,
    /// Candidate that received vote in current term (or None)
    pub voted_for: Option<NodeId>,

    // Volatile state (reset at process start)
    /// Index of highest log entry known to be committed
    pub commit_index: LogIndex,
    /// Index of highest log entry applied to state machine
    pub last_applied: LogIndex,
    /// Current role of this node
    pub role: RaftRole,
    /// ID of the current leader (if known)
    pub current_leader: Option<NodeId>,
    /// This node's ID
    pub node_id: NodeId,
}

impl RaftState {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            current_term: 0,
            voted_for: None,
            commit_index: 0,
            last_applied: 0,
            role: RaftRole::Follower,
            current_leader: None,
            node_id,
        }
    }

    /// Transition to follower in a new term, forgetting any vote
    pub fn become_follower(&mut self, term: Term, leader: Option<NodeId>) {
        tracing::info!(
            "Node {} transitioning to Follower (term: {})",
            self.node_id,
            term
        );
        self.role = RaftRole::Follower;
        self.current_term = term;
        self.voted_for = None;
        self.current_leader = leader;
    }

    /// Accept the sender of a current-term AppendEntries as leader.
    /// Keeps voted_for: stepping down within the same term must not allow
    /// a second vote.
    pub fn record_leader(&mut self, leader: NodeId) {
        if self.role != RaftRole::Follower {
            tracing::info!(
                "Node {} stepping down to Follower, leader is {} (term: {})",
                self.node_id,
                leader,
                self.current_term
            );
            self.role = RaftRole::Follower;
        }
        self.current_leader = Some(leader);
    }

    /// Update term if we see a higher term
    pub fn update_term(&mut self, term: Term) -> bool {
        if term > self.current_term {
            tracing::info!(
                "Node {} updating term from {} to {}",
                self.node_id,
                self.current_term,
                term
            );
            self.become_follower(term, None);
            true
        } else {
            false
        }
    }
}
