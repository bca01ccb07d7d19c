use crate::prelude::{eprintln, *};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

use super::McpServer;

type SessionSender = mpsc::UnboundedSender<String>;

/// Server handle plus the open SSE streams, keyed by session id
#[derive(Clone)]
struct SseState {
    server: Arc<McpServer>,
    sessions: Arc<Mutex<HashMap<String, SessionSender>>>,
    next_session: Arc<AtomicU64>,
}

impl SseState {
    fn new(server: McpServer) -> Self {
        Self {
            server: Arc::new(server),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    fn open_session(&self) -> (String, mpsc::UnboundedReceiver<String>) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed).to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), tx);
        log::debug!("sse session {id} opened");
        (id, rx)
    }

    fn session(&self, id: &str) -> Option<SessionSender> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn close_session(&self, id: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        log::debug!("sse session {id} closed");
    }
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

pub async fn run_sse(options: super::cli::SseOptions, server: McpServer) -> Result<()> {
    if server.verbose {
        eprintln!(
            "Starting MCP server with SSE transport on {}:{}...",
            options.host, options.port
        );
    }

    let addr = format!("{}:{}", options.host, options.port);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let verbose = server.verbose;

    let app_router = Router::new()
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .layer(cors)
        .with_state(SseState::new(server));

    if verbose {
        eprintln!("MCP server listening on http://{}", addr);
        eprintln!("SSE endpoint: http://{}/sse", addr);
        eprintln!("Message endpoint: http://{}/message", addr);
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    log::info!("MCP SSE server listening on {addr}");

    axum::serve(listener, app_router)
        .with_graceful_shutdown(super::shutdown_signal())
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

fn endpoint_path(session_id: &str) -> String {
    format!("/message?sessionId={session_id}")
}

/// Open a session: announce where to POST, then relay every response
async fn sse_handler(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session_id, rx) = state.open_session();

    let endpoint = Event::default()
        .event("endpoint")
        .data(endpoint_path(&session_id));

    let messages = stream::unfold(rx, |mut rx| async move {
        let message = rx.recv().await?;
        Some((Ok(Event::default().event("message").data(message)), rx))
    });

    Sse::new(stream::once(async move { Ok(endpoint) }).chain(messages))
        .keep_alive(KeepAlive::default())
}

/// With a `sessionId` the response goes out on that session's stream and the
/// POST gets 202. Without one the response is the POST body.
async fn message_handler(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    Json(request): Json<serde_json::Value>,
) -> Response {
    let request_str = serde_json::to_string(&request).unwrap_or_default();

    let Some(session_id) = query.session_id else {
        return match super::handle_request(&request_str, &state.server).await {
            Some(response) => {
                Json(serde_json::to_value(response).unwrap_or(serde_json::Value::Null))
                    .into_response()
            }
            None => StatusCode::ACCEPTED.into_response(),
        };
    };

    let Some(sender) = state.session(&session_id) else {
        return (StatusCode::NOT_FOUND, format!("Unknown session: {session_id}")).into_response();
    };

    if let Some(response) = super::handle_request(&request_str, &state.server).await {
        let response_json = serde_json::to_string(&response).unwrap_or_default();
        if sender.send(response_json).is_err() {
            state.close_session(&session_id);
            return (StatusCode::GONE, format!("Session closed: {session_id}")).into_response();
        }
    }

    StatusCode::ACCEPTED.into_response()
}
