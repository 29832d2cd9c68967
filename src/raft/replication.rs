use super::rpc::{AppendEntriesRequest, AppendEntriesResponse};
use super::state::RaftState;
use crate::machine::StateMachine;
use crate::storage::{LogStore, StateStore};
use crate::util::errors::Result;

/// Handle incoming AppendEntries RPC. Covers the consistency check,
/// conflict truncation, the append itself, commit advancement and the
/// application of newly committed entries. Every response reports the
/// node's current last log index as match_index, success or not.
pub fn handle_append_entries<L: LogStore + ?Sized, S: StateStore + ?Sized, M: StateMachine + ?Sized>(
    state: &mut RaftState,
    state_store: &mut S,
    log_store: &mut L,
    machine: &mut M,
    request: AppendEntriesRequest,
) -> Result<AppendEntriesResponse> {
    // If request term is greater, update our term and become follower
    if request.term > state.current_term {
        state.update_term(request.term);
        state_store.save_term(state.current_term)?;
        state_store.save_voted_for(None)?;
    }

    // Reply false if term < currentTerm
    if request.term < state.current_term {
        tracing::debug!(
            "Node {} rejected AppendEntries from {} - stale term ({} < {})",
            state.node_id,
            request.leader_id,
            request.term,
            state.current_term
        );

        return Ok(AppendEntriesResponse {
            term: state.current_term,
            success: false,
            match_index: log_store.last_index(),
        });
    }

    // The sender is authoritative for this term
    state.record_leader(request.leader_id.clone());

    // Check log consistency: we must hold prev_log_index with a matching
    // term. The sentinel makes index 0 always present.
    let prev_term = match log_store.get(request.prev_log_index) {
        Some(entry) => entry.term,
        None => {
            tracing::debug!(
                "Node {} rejected AppendEntries - missing entry at index {} (last index {})",
                state.node_id,
                request.prev_log_index,
                log_store.last_index()
            );

            return Ok(AppendEntriesResponse {
                term: state.current_term,
                success: false,
                match_index: log_store.last_index(),
            });
        }
    };

    if prev_term != request.prev_log_term {
        tracing::debug!(
            "Node {} rejected AppendEntries - term mismatch at index {} ({} != {})",
            state.node_id,
            request.prev_log_index,
            prev_term,
            request.prev_log_term
        );

        // Our tail conflicts with the leader's view; drop it, unless that
        // would destroy committed entries
        if request.prev_log_index <= state.commit_index {
            tracing::warn!(
                "Node {} refusing to truncate at index {} - committed up to {}",
                state.node_id,
                request.prev_log_index,
                state.commit_index
            );
        } else {
            log_store.truncate(request.prev_log_index)?;
        }

        return Ok(AppendEntriesResponse {
            term: state.current_term,
            success: false,
            match_index: log_store.last_index(),
        });
    }

    // Merge entries: already-present entries are skipped, conflicting
    // entries truncate the tail, new entries are appended
    for entry in &request.entries {
        match log_store.get(entry.index).map(|e| e.term) {
            Some(term) if term == entry.term => {}
            Some(_) => {
                if entry.index <= state.commit_index {
                    tracing::warn!(
                        "Node {} refusing to overwrite index {} - committed up to {}",
                        state.node_id,
                        entry.index,
                        state.commit_index
                    );

                    return Ok(AppendEntriesResponse {
                        term: state.current_term,
                        success: false,
                        match_index: log_store.last_index(),
                    });
                }

                tracing::info!(
                    "Node {} found log conflict at index {}, truncating",
                    state.node_id,
                    entry.index
                );
                log_store.truncate(entry.index)?;
                log_store.append(entry.clone())?;
            }
            None => {
                log_store.append(entry.clone())?;
            }
        }
    }

    if !request.entries.is_empty() {
        tracing::debug!(
            "Node {} merged {} entries from leader {}",
            state.node_id,
            request.entries.len(),
            request.leader_id
        );
    }

    // Advance commit index and apply newly committed entries
    if request.leader_commit > state.commit_index {
        state.commit_index = std::cmp::min(request.leader_commit, log_store.last_index());

        tracing::debug!(
            "Node {} updated commit_index to {}",
            state.node_id,
            state.commit_index
        );

        apply_committed(state, log_store, machine);
    }

    Ok(AppendEntriesResponse {
        term: state.current_term,
        success: true,
        match_index: log_store.last_index(),
    })
}

/// Apply every committed but not yet applied entry to the state machine,
/// strictly in index order. A failing entry is logged and skipped; the
/// node keeps serving.
pub fn apply_committed<L: LogStore + ?Sized, M: StateMachine + ?Sized>(
    state: &mut RaftState,
    log_store: &L,
    machine: &mut M,
) {
    while state.last_applied < state.commit_index {
        let next = state.last_applied + 1;

        match log_store.get(next) {
            Some(entry) => {
                if let Err(e) = machine.apply(entry) {
                    tracing::error!(
                        "Node {} failed to apply entry {}: {}",
                        state.node_id,
                        next,
                        e
                    );
                }
                state.last_applied = next;
            }
            None => {
                tracing::error!(
                    "Node {} commit index {} is beyond log end {}",
                    state.node_id,
                    state.commit_index,
                    log_store.last_index()
                );
                break;
            }
        }
    }
}
