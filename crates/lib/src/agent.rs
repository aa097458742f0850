//! Agent runtime: owns the handler slot and the poll transport.
//!
//! One `Agent` is one poll loop; multiple agents are independent instances with
//! no shared state. `run` and `stop` are idempotent: calling either while
//! already in that state is a no-op apart from a log line.

use crate::client::FrequencyClient;
use crate::config::Identity;
use crate::dispatch::dispatch;
use crate::handler::{HandlerSlot, MessageHandler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// A frequency agent: platform client, replaceable handler, poll loop state.
pub struct Agent {
    client: FrequencyClient,
    handlers: HandlerSlot,
    running: AtomicBool,
    stop_notify: Notify,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Agent {
    pub fn new(identity: Identity) -> Arc<Self> {
        Arc::new(Self {
            client: FrequencyClient::new(identity),
            handlers: HandlerSlot::new(),
            running: AtomicBool::new(false),
            stop_notify: Notify::new(),
            poll_task: Mutex::new(None),
        })
    }

    pub fn client(&self) -> &FrequencyClient {
        &self.client
    }

    /// Shared handler slot (hand this to the a2a server so both transports use
    /// the same active handler).
    pub fn handlers(&self) -> &HandlerSlot {
        &self.handlers
    }

    /// Replace the active handler. Takes effect for every subsequent dispatch.
    pub async fn set_handler(&self, handler: Arc<dyn MessageHandler>) {
        self.handlers.set(handler).await;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the poll loop: one immediate fetch-and-dispatch cycle, then repeat
    /// at `interval`. No-op (plus a log line) when already running, so calling
    /// run twice arms exactly one timer.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        if self.running.swap(true, Ordering::SeqCst) {
            log::info!("agent: poll loop already running");
            return;
        }
        log::info!("agent: starting poll loop (interval {:?})", interval);
        let agent = self.clone();
        let handle = tokio::spawn(async move {
            run_poll_loop(agent, interval).await;
        });
        *self.poll_task.lock().await = Some(handle);
    }

    /// Stop the poll loop: no new cycles start; an in-flight cycle completes.
    /// No-op (plus a log line) when not running.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            log::info!("agent: poll loop not running");
            return;
        }
        self.stop_notify.notify_waiters();
        log::info!("agent: poll loop stopping");
    }

    /// Await the poll task after `stop` so an in-flight cycle can finish
    /// (used by graceful shutdown).
    pub async fn join(&self) {
        let handle = self.poll_task.lock().await.take();
        if let Some(h) = handle {
            let _ = h.await;
        }
    }

    /// One poll cycle: fetch pending messages and dispatch them sequentially in
    /// the order received. A failed or malformed poll means zero dispatches;
    /// the next tick retries independently (no backoff).
    async fn poll_cycle(&self) {
        match self.client.poll_messages().await {
            Ok(messages) => {
                for message in messages {
                    dispatch(&self.client, &self.handlers, message).await;
                }
            }
            Err(e) => {
                log::debug!("agent: poll failed: {}", e);
            }
        }
    }
}

/// Cycles never overlap: the next sleep is armed only after the previous
/// cycle's dispatches have all settled.
async fn run_poll_loop(agent: Arc<Agent>, interval: Duration) {
    loop {
        if !agent.is_running() {
            break;
        }
        agent.poll_cycle().await;
        if !agent.is_running() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = agent.stop_notify.notified() => {}
        }
    }
    log::info!("agent: poll loop stopped");
}
