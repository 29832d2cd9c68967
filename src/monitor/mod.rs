use crate::raft::{LogEntryView, NodeStatus, SharedNode};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;

/// Read-only status surface. Snapshot reads take the node lock; nothing
/// here mutates node state.
pub fn router(node: SharedNode) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/log", get(get_log))
        .with_state(node)
}

pub async fn serve(listener: TcpListener, node: SharedNode) -> std::io::Result<()> {
    axum::serve(listener, router(node)).await
}

async fn get_status(State(node): State<SharedNode>) -> Json<NodeStatus> {
    let node = node.lock().await;
    Json(node.status())
}

async fn get_log(State(node): State<SharedNode>) -> Json<Vec<LogEntryView>> {
    let node = node.lock().await;
    Json(node.log_view())
}
