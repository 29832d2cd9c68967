pub mod codec;

pub use codec::Request;

use crate::raft::SharedNode;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// Upper bound on one request line; longer requests are dropped unread.
const MAX_LINE_BYTES: u64 = 10 * 1024 * 1024;

/// Fixed read and write deadline per connection
const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Accept loop. Each connection carries exactly one request and is
/// answered with at most one response line, then closed.
pub async fn serve(listener: TcpListener, node: SharedNode) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let node = node.clone();
                tokio::spawn(async move {
                    handle_connection(stream, node, peer).await;
                });
            }
            Err(e) => {
                tracing::warn!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, node: SharedNode, peer: SocketAddr) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader).take(MAX_LINE_BYTES);

    let mut line = String::new();
    match timeout(IO_TIMEOUT, reader.read_line(&mut line)).await {
        // Connection closed without sending a request
        Ok(Ok(0)) => return,
        Ok(Ok(n)) => {
            // A request is one newline-terminated line; anything cut short
            // by EOF or the size cap is dropped
            if !line.ends_with('\n') {
                if n as u64 >= MAX_LINE_BYTES {
                    tracing::warn!("Oversized request from {}, dropping", peer);
                } else {
                    tracing::debug!("Unterminated request from {}, dropping", peer);
                }
                return;
            }
        }
        Ok(Err(e)) => {
            tracing::debug!("Read error from {}: {}", peer, e);
            return;
        }
        Err(_) => {
            tracing::debug!("Read timeout from {}", peer);
            return;
        }
    }

    // Fail closed: malformed input gets no response, and node state is
    // never touched
    let request = match codec::parse_request(&line) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Dropping malformed request from {}: {}", peer, e);
            return;
        }
    };

    let response = {
        let mut node = node.lock().await;
        match request {
            Request::Vote(vote) => node
                .handle_request_vote(vote)
                .map(|r| codec::encode_vote_response(&r)),
            Request::Append(append) => node
                .handle_append_entries(append)
                .map(|r| codec::encode_append_response(&r)),
        }
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to handle request from {}: {}", peer, e);
            return;
        }
    };

    match timeout(IO_TIMEOUT, writer.write_all(response.as_bytes())).await {
        Ok(Ok(())) => {
            let _ = writer.shutdown().await;
        }
        Ok(Err(e)) => tracing::debug!("Write error to {}: {}", peer, e),
        Err(_) => tracing::debug!("Write timeout to {}", peer),
    }
}
