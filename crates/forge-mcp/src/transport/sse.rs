//! HTTP + Server-Sent Events transport
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/sse` | GET | Open a session; first event is `endpoint` |
//! | `/messages?sessionId=<id>` | POST | Submit one JSON-RPC message, answered `202` |
//! | `/health` | GET | Liveness, open-session count and age of the oldest session |
//!
//! Responses travel back on the session's stream as `message` events, in
//! the order the messages were posted.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::lifecycle::TaskSpawner;
use crate::server::McpServer;
use crate::session::{RoutingError, SessionRegistry};
use crate::{Error, Result};

/// Shared state of every HTTP handler.
#[derive(Clone)]
pub struct SseState {
    pub server: McpServer,
    pub sessions: Arc<SessionRegistry>,
    pub spawner: TaskSpawner,
}

impl SseState {
    pub fn new(server: McpServer, sessions: Arc<SessionRegistry>, spawner: TaskSpawner) -> Self {
        Self {
            server,
            sessions,
            spawner,
        }
    }
}

/// Build the axum router for the SSE transport.
pub fn router(state: SseState) -> Router {
    Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
///
/// Open streams end when their sessions are closed; close them before
/// cancelling or the graceful shutdown waits on them.
pub async fn serve(listener: TcpListener, state: SseState, shutdown: CancellationToken) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "SSE transport listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::Server(format!("server on {addr} failed: {e}")))?;

    tracing::info!("SSE transport stopped");
    Ok(())
}

/// GET /sse - Open a session and stream its responses.
async fn open_stream(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (handle, mut inbound) = state.sessions.open();
    let (outbound_tx, mut outbound) = mpsc::unbounded_channel::<String>();

    // One worker per session: messages are handled strictly in arrival order.
    let server = state.server.clone();
    let session_id = handle.id().to_string();
    state
        .spawner
        .spawn(format!("session {session_id}"), async move {
            while let Some(message) = inbound.recv().await {
                if let Some(response) = server.respond(&message, Some(&session_id)).await
                    && outbound_tx.send(response).is_err()
                {
                    break;
                }
            }
            tracing::debug!(session = %session_id, "Session worker finished");
        });

    let endpoint = format!("/messages?sessionId={}", handle.id());
    let stream = async_stream::stream! {
        // The stream owns the handle; a disconnected client closes its session.
        let _handle = handle;
        yield Ok(Event::default().event("endpoint").data(endpoint));
        while let Some(response) = outbound.recv().await {
            yield Ok(Event::default().event("message").data(response));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// POST /messages - Route a message to its session.
async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Result<StatusCode> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or(RoutingError::MissingSessionId)?;

    if let Err(e) = state.sessions.route(&session_id, body) {
        tracing::warn!(session = %session_id, error = %e, "Rejected message");
        return Err(e.into());
    }

    Ok(StatusCode::ACCEPTED)
}

/// GET /health
async fn health(State(state): State<SseState>) -> Json<Value> {
    let sessions = state.sessions.sessions();
    Json(json!({
        "status": "ok",
        "sessions": sessions.len(),
        "oldestSessionOpenedAt": sessions.first().map(|s| s.opened_at),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CapabilityContext, CapabilityRegistry};
    use crate::lifecycle::Supervisor;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use forge_test_utils::{RecordingShell, StubHost};
    use tower::ServiceExt;

    fn state() -> (SseState, Supervisor) {
        let sessions = Arc::new(SessionRegistry::new());
        let supervisor = Supervisor::new(sessions.clone());
        let context = CapabilityContext::new(
            Arc::new(StubHost::new()),
            Arc::new(RecordingShell::new()),
        );
        let server = McpServer::new(Arc::new(CapabilityRegistry::standard()), context);
        (
            SseState::new(server, sessions, supervisor.spawner()),
            supervisor,
        )
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_session_count() {
        let (state, _supervisor) = state();
        let (_handle, _rx) = state.sessions.open();

        let response = router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 1);
        assert!(body["oldestSessionOpenedAt"].is_string());
    }

    #[tokio::test]
    async fn health_without_sessions_has_no_oldest() {
        let (state, _supervisor) = state();

        let response = router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["sessions"], 0);
        assert!(body["oldestSessionOpenedAt"].is_null());
    }

    #[tokio::test]
    async fn post_without_session_id_is_rejected() {
        let (state, _supervisor) = state();

        let response = router(state)
            .oneshot(
                Request::post("/messages")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "RoutingError");
        assert_eq!(body["error"], "missing sessionId query parameter");
    }

    #[tokio::test]
    async fn post_to_unknown_session_is_rejected() {
        let (state, _supervisor) = state();

        let response = router(state)
            .oneshot(
                Request::post("/messages?sessionId=does-not-exist")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "no active session with id does-not-exist");
    }

    #[tokio::test]
    async fn post_to_open_session_is_accepted_and_delivered() {
        let (state, _supervisor) = state();
        let (handle, mut rx) = state.sessions.open();
        let uri = format!("/messages?sessionId={}", handle.id());

        let response = router(state)
            .oneshot(Request::post(uri.as_str()).body(Body::from("payload")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(rx.recv().await.unwrap(), "payload");
    }
}
