use crate::raft::rpc::{
    AppendEntriesRequest, AppendEntriesResponse, RequestVoteRequest, RequestVoteResponse,
};
use crate::raft::types::LogEntry;
use crate::util::errors::ProtocolError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// A decoded inbound RPC
#[derive(Debug, Clone)]
pub enum Request {
    Vote(RequestVoteRequest),
    Append(AppendEntriesRequest),
}

/// Parse one request line. Fails closed: anything not structurally valid
/// is an error, and the caller drops the connection without responding.
pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('|').collect();

    match fields[0] {
        "REQUEST_VOTE" => parse_request_vote(&fields),
        "APPEND_ENTRIES" => parse_append_entries(&fields),
        other => Err(ProtocolError::UnknownMessage(other.to_string())),
    }
}

pub fn encode_vote_response(response: &RequestVoteResponse) -> String {
    format!(
        "REQUEST_VOTE_RESPONSE|{}|{}\n",
        response.term, response.vote_granted
    )
}

pub fn encode_append_response(response: &AppendEntriesResponse) -> String {
    format!(
        "APPEND_ENTRIES_RESPONSE|{}|{}|{}\n",
        response.term, response.success, response.match_index
    )
}

fn parse_request_vote(fields: &[&str]) -> Result<Request, ProtocolError> {
    // REQUEST_VOTE|term|candidateId|lastLogIndex|lastLogTerm
    if fields.len() != 5 {
        return Err(ProtocolError::FieldCount {
            message: "REQUEST_VOTE",
            expected: 5,
            got: fields.len(),
        });
    }

    Ok(Request::Vote(RequestVoteRequest {
        term: parse_u64("term", fields[1])?,
        candidate_id: fields[2].to_string(),
        last_log_index: parse_u64("lastLogIndex", fields[3])?,
        last_log_term: parse_u64("lastLogTerm", fields[4])?,
    }))
}

fn parse_append_entries(fields: &[&str]) -> Result<Request, ProtocolError> {
    // APPEND_ENTRIES|term|leaderId|prevLogIndex|prevLogTerm|leaderCommit|numEntries|entry...
    if fields.len() < 7 {
        return Err(ProtocolError::FieldCount {
            message: "APPEND_ENTRIES",
            expected: 7,
            got: fields.len(),
        });
    }

    let term = parse_u64("term", fields[1])?;
    let leader_id = fields[2].to_string();
    let prev_log_index = parse_u64("prevLogIndex", fields[3])?;
    let prev_log_term = parse_u64("prevLogTerm", fields[4])?;
    let leader_commit = parse_u64("leaderCommit", fields[5])?;
    let num_entries = parse_u64("numEntries", fields[6])? as usize;

    let encoded = &fields[7..];
    if encoded.len() != num_entries {
        return Err(ProtocolError::EntryCount {
            declared: num_entries,
            got: encoded.len(),
        });
    }

    // Entry indices continue from prev_log_index; a prev index at the top
    // of the u64 range leaves no valid index for any entry
    if prev_log_index.checked_add(num_entries as u64).is_none() {
        return Err(ProtocolError::InvalidField {
            field: "prevLogIndex",
            value: fields[3].to_string(),
        });
    }

    let mut entries = Vec::with_capacity(num_entries);
    for (i, raw) in encoded.iter().enumerate() {
        let entry = parse_entry(raw)?;

        // A batch must continue the log directly after prev_log_index
        let expected = prev_log_index + 1 + i as u64;
        if entry.index != expected {
            return Err(ProtocolError::NonContiguous {
                expected,
                got: entry.index,
            });
        }

        entries.push(entry);
    }

    Ok(Request::Append(AppendEntriesRequest {
        term,
        leader_id,
        prev_log_index,
        prev_log_term,
        leader_commit,
        entries,
    }))
}

fn parse_entry(raw: &str) -> Result<LogEntry, ProtocolError> {
    // index,term,length,base64Payload - length is informational only
    let parts: Vec<&str> = raw.splitn(4, ',').collect();
    if parts.len() != 4 {
        return Err(ProtocolError::MalformedEntry(raw.to_string()));
    }

    let index = parts[0]
        .parse::<u64>()
        .map_err(|_| ProtocolError::MalformedEntry(raw.to_string()))?;
    let term = parts[1]
        .parse::<u64>()
        .map_err(|_| ProtocolError::MalformedEntry(raw.to_string()))?;
    let payload = BASE64
        .decode(parts[3])
        .map_err(|_| ProtocolError::MalformedEntry(raw.to_string()))?;

    Ok(LogEntry::new(index, term, payload))
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ProtocolError> {
    value
        .parse::<u64>()
        .map_err(|_| ProtocolError::InvalidField {
            field,
            value: value.to_string(),
        })
}
