use super::rpc::{RequestVoteRequest, RequestVoteResponse};
use super::state::RaftState;
use crate::storage::{LogStore, StateStore};
use crate::util::errors::Result;

/// Handle incoming RequestVote RPC
pub fn handle_request_vote<L: LogStore + ?Sized, S: StateStore + ?Sized>(
    state: &mut RaftState,
    state_store: &mut S,
    log_store: &L,
    request: RequestVoteRequest,
) -> Result<RequestVoteResponse> {
    tracing::debug!(
        "Node {} received RequestVote from {} (term: {})",
        state.node_id,
        request.candidate_id,
        request.term
    );

    // If request term is greater, update our term and become follower
    if request.term > state.current_term {
        state.update_term(request.term);
        state_store.save_term(state.current_term)?;
        state_store.save_voted_for(None)?;
    }

    // Reply false if term < currentTerm
    if request.term < state.current_term {
        tracing::debug!(
            "Node {} denied vote to {} - request term {} < current term {}",
            state.node_id,
            request.candidate_id,
            request.term,
            state.current_term
        );

        return Ok(RequestVoteResponse {
            term: state.current_term,
            vote_granted: false,
        });
    }

    // At most one vote per term
    let can_vote =
        state.voted_for.is_none() || state.voted_for.as_ref() == Some(&request.candidate_id);

    if !can_vote {
        tracing::debug!(
            "Node {} denied vote to {} - already voted for {:?}",
            state.node_id,
            request.candidate_id,
            state.voted_for
        );

        return Ok(RequestVoteResponse {
            term: state.current_term,
            vote_granted: false,
        });
    }

    // Candidate's log must be at least as up-to-date as ours
    let last_log_term = log_store.last_term();
    let last_log_index = log_store.last_index();

    let log_is_up_to_date = request.last_log_term > last_log_term
        || (request.last_log_term == last_log_term && request.last_log_index >= last_log_index);

    if !log_is_up_to_date {
        tracing::debug!(
            "Node {} denied vote to {} - log not up-to-date",
            state.node_id,
            request.candidate_id
        );

        return Ok(RequestVoteResponse {
            term: state.current_term,
            vote_granted: false,
        });
    }

    state.voted_for = Some(request.candidate_id.clone());
    state_store.save_voted_for(state.voted_for.clone())?;

    tracing::info!(
        "Node {} granted vote to {} in term {}",
        state.node_id,
        request.candidate_id,
        request.term
    );

    Ok(RequestVoteResponse {
        term: state.current_term,
        vote_granted: true,
    })
}
