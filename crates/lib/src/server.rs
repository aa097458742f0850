//! Agent-to-agent HTTP surface: health probes, direct message ingestion, and a
//! service descriptor, all behind bearer auth.
//!
//! /a2a answers in-band: the handler's response goes back in the HTTP reply, so
//! the dispatch routing decision is bypassed entirely. A handler failure here
//! surfaces as a 500 — unlike the dispatch path, where it is dropped silently.
//! That asymmetry is intentional and pinned by tests.

use crate::config::Identity;
use crate::handler::HandlerSlot;
use crate::message::{utc_timestamp, Message};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Shared state for the a2a server.
#[derive(Clone)]
pub struct ServerState {
    identity: Arc<Identity>,
    handlers: HandlerSlot,
    started: Instant,
}

type ApiError = (StatusCode, Json<Value>);

fn unauthorized(reason: &str) -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": reason })),
    )
}

/// Validate `Authorization: Bearer <key>` against the configured API key.
/// Each failure mode gets its own reason string so callers can tell them apart.
/// Exact string comparison.
fn check_bearer(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(unauthorized(
            "missing Authorization header (expected: Bearer <api key>)",
        ));
    };
    let value = value.to_str().unwrap_or("");
    let parts: Vec<&str> = value.split(' ').collect();
    if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("bearer") {
        return Err(unauthorized(
            "malformed Authorization header (expected: Bearer <api key>)",
        ));
    }
    if parts[1].is_empty() {
        return Err(unauthorized("empty api key"));
    }
    if parts[1] != expected {
        return Err(unauthorized("invalid api key"));
    }
    Ok(())
}

/// Inbound a2a body: `{content}` or `{message}`, resolved by one precedence
/// rule at the boundary (content first, first non-empty wins).
#[derive(Debug, Deserialize)]
pub struct A2aRequest {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl A2aRequest {
    fn text(&self) -> Option<&str> {
        [self.content.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}

/// GET /health and /heartbeat — process liveness and uptime.
async fn health(State(state): State<ServerState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    check_bearer(&headers, &state.identity.api_key)?;
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": utc_timestamp(),
        "uptimeSeconds": state.started.elapsed().as_secs(),
    })))
}

/// POST /a2a — accept one externally-delivered message and answer in-band.
async fn a2a(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(body): Json<A2aRequest>,
) -> Result<Json<Value>, ApiError> {
    check_bearer(&headers, &state.identity.api_key)?;
    let Some(text) = body.text() else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "missing message content (provide \"content\" or \"message\")",
            })),
        ));
    };
    let message = Message::synthesized(text);
    let handler = state.handlers.get().await;
    match handler.handle(&message).await {
        Ok(response) => Ok(Json(json!({
            "success": true,
            "response": response,
            "timestamp": utc_timestamp(),
        }))),
        Err(e) => {
            log::warn!("a2a: handler failed for message {}: {}", message.id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": format!("handler failed: {}", e) })),
            ))
        }
    }
}

/// GET / — static service descriptor.
async fn service_info(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    check_bearer(&headers, &state.identity.api_key)?;
    Ok(Json(json!({
        "service": "frequency-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "heartbeat": "/heartbeat",
            "a2a": "/a2a",
        },
        "frequency_id": state.identity.frequency_id,
        "agent_id": state.identity.agent_id,
        "base_url": state.identity.base_url,
    })))
}

/// Build the a2a router. The handler slot is shared with the poll transport so
/// one registered handler serves both.
pub fn router(identity: Identity, handlers: HandlerSlot) -> Router {
    let state = ServerState {
        identity: Arc::new(identity),
        handlers,
        started: Instant::now(),
    };
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/heartbeat", get(health))
        .route("/a2a", post(a2a))
        .with_state(state)
}

/// Run the a2a server on `bind:port`. Bind failure is returned as an error up
/// front, not discovered at call time. Blocks until shutdown (e.g. Ctrl+C).
pub async fn serve(bind: &str, port: u16, identity: Identity, handlers: HandlerSlot) -> Result<()> {
    let app = router(identity, handlers);
    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("a2a server listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("a2a server exited")?;
    log::info!("a2a server stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}
