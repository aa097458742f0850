//! Dispatch core: apply the active handler to one message and route the result
//! to the correct response channel.
//!
//! The presence of `metadata.response_url` is the sole discriminator: set means
//! direct callback, absent means the platform respond queue. Poll-delivered and
//! HTTP-delivered messages go through the same decision, so handlers stay
//! transport-agnostic.

use crate::client::FrequencyClient;
use crate::handler::HandlerSlot;
use crate::message::Message;

/// Handle one message end to end. Never fails out of the call: a handler error
/// drops the response (logged, nothing sent), a delivery error is logged with
/// its status and not retried. At most one outbound POST per message.
pub async fn dispatch(client: &FrequencyClient, handlers: &HandlerSlot, message: Message) {
    let handler = handlers.get().await;
    let content = match handler.handle(&message).await {
        Ok(text) => text,
        Err(e) => {
            log::warn!("handler failed for message {}: {}", message.id, e);
            return;
        }
    };
    let request_id = message.response_request_id();
    let result = match message.metadata.response_url {
        Some(ref url) => client.post_callback(url, request_id, &content).await,
        None => client.respond(request_id, &content).await,
    };
    if let Err(e) = result {
        log::warn!("response delivery failed for message {}: {}", message.id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Identity;
    use crate::handler::MessageHandler;
    use crate::message::MessageMetadata;
    use async_trait::async_trait;
    use axum::extract::State;
    use axum::http::Uri;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    type Hits = Arc<Mutex<Vec<(String, Value)>>>;

    async fn record(State(hits): State<Hits>, uri: Uri, Json(body): Json<Value>) -> Json<Value> {
        hits.lock().await.push((uri.path().to_string(), body));
        Json(json!({ "success": true }))
    }

    /// Stub accepting both the respond endpoint and an arbitrary callback path,
    /// recording every POST.
    async fn spawn_stub() -> (String, Hits) {
        let hits: Hits = Arc::default();
        let app = Router::new()
            .route("/api/freq-1/messages/respond", post(record))
            .route("/cb", post(record))
            .with_state(hits.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}", addr), hits)
    }

    fn client(base_url: &str) -> FrequencyClient {
        FrequencyClient::new(Identity {
            api_key: "k1".to_string(),
            frequency_id: "freq-1".to_string(),
            agent_id: "agent-1".to_string(),
            base_url: base_url.to_string(),
        })
    }

    fn message(request_id: &str, metadata: MessageMetadata) -> Message {
        Message {
            id: "m1".to_string(),
            content: "hi".to_string(),
            request_id: request_id.to_string(),
            created_at: "2025-01-01 00:00:00 UTC".to_string(),
            agent_id: None,
            metadata,
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl MessageHandler for FailingHandler {
        async fn handle(&self, _message: &Message) -> Result<String, String> {
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn without_response_url_delivers_to_respond_queue() {
        let (url, hits) = spawn_stub().await;
        let handlers = HandlerSlot::new();
        dispatch(&client(&url), &handlers, message("r1", MessageMetadata::default())).await;
        let hits = hits.lock().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "/api/freq-1/messages/respond");
        assert_eq!(hits[0].1.get("request_id").unwrap(), "r1");
        assert_eq!(hits[0].1.get("content").unwrap(), "Echo: hi");
    }

    #[tokio::test]
    async fn with_response_url_delivers_to_callback_only() {
        let (url, hits) = spawn_stub().await;
        let handlers = HandlerSlot::new();
        let metadata = MessageMetadata {
            response_url: Some(format!("{}/cb", url)),
            ..Default::default()
        };
        dispatch(&client(&url), &handlers, message("r1", metadata)).await;
        let hits = hits.lock().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "/cb");
        assert_eq!(hits[0].1.get("request_id").unwrap(), "r1");
    }

    #[tokio::test]
    async fn metadata_request_id_wins_in_delivered_payload() {
        let (url, hits) = spawn_stub().await;
        let handlers = HandlerSlot::new();
        let metadata = MessageMetadata {
            response_url: Some(format!("{}/cb", url)),
            request_id: Some("override".to_string()),
            ..Default::default()
        };
        dispatch(&client(&url), &handlers, message("r1", metadata)).await;
        let hits = hits.lock().await;
        assert_eq!(hits[0].1.get("request_id").unwrap(), "override");
    }

    #[tokio::test]
    async fn handler_failure_sends_nothing() {
        let (url, hits) = spawn_stub().await;
        let handlers = HandlerSlot::new();
        handlers.set(Arc::new(FailingHandler)).await;
        dispatch(&client(&url), &handlers, message("r1", MessageMetadata::default())).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(hits.lock().await.is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_does_not_escape() {
        // Respond endpoint unreachable: dispatch must still return normally.
        let handlers = HandlerSlot::new();
        dispatch(
            &client("http://127.0.0.1:9"),
            &handlers,
            message("r1", MessageMetadata::default()),
        )
        .await;
    }
}
