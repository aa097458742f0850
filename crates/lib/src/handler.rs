//! Message handlers: the user-supplied handler seam and the default echo.
//!
//! At most one handler is active at a time. The slot is shared by both
//! transports so replacing the handler takes effect for every subsequent
//! dispatch, including ones already in flight that have not invoked it yet.

use crate::message::Message;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Produces the response text for one message. Err means no response text; the
/// transport decides whether the failure is dropped or surfaced.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<String, String>;
}

/// Default handler: log the content and echo it back.
pub struct EchoHandler;

#[async_trait]
impl MessageHandler for EchoHandler {
    async fn handle(&self, message: &Message) -> Result<String, String> {
        log::info!("received: {}", message.content);
        Ok(format!("Echo: {}", message.content))
    }
}

/// Replaceable single-handler slot. Dispatch resolves the active handler from
/// the slot at invoke time, so replacement is immediate.
#[derive(Clone)]
pub struct HandlerSlot {
    inner: Arc<RwLock<Arc<dyn MessageHandler>>>,
}

impl Default for HandlerSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerSlot {
    /// New slot holding the default echo handler.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(EchoHandler) as Arc<dyn MessageHandler>)),
        }
    }

    pub async fn set(&self, handler: Arc<dyn MessageHandler>) {
        *self.inner.write().await = handler;
    }

    pub async fn get(&self) -> Arc<dyn MessageHandler> {
        self.inner.read().await.clone()
    }
}
