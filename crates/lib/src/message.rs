//! Frequency message types and timestamp formatting.

use serde::{Deserialize, Serialize};

/// Human-readable UTC timestamp used in API responses: `YYYY-MM-DD HH:MM:SS UTC`.
pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Routing hints carried in a message's metadata.
///
/// `response_url` selects the direct-callback response channel; when absent the
/// platform respond queue is used. `request_id` overrides the correlation id in
/// the delivered payload. Unknown keys are kept as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MessageMetadata {
    pub fn is_empty(&self) -> bool {
        self.response_url.is_none() && self.request_id.is_none() && self.extra.is_empty()
    }
}

/// One inbound message from the frequency. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub request_id: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Absent metadata on the wire deserializes to an empty mapping.
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    /// Build a message for content delivered outside the platform queue (e.g. the
    /// /a2a route): fresh id and request_id, current timestamp, empty metadata.
    pub fn synthesized(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
            created_at: utc_timestamp(),
            agent_id: None,
            metadata: MessageMetadata::default(),
        }
    }

    /// Correlation id for the delivered response: metadata override wins over the
    /// message's own request_id.
    pub fn response_request_id(&self) -> &str {
        self.metadata
            .request_id
            .as_deref()
            .unwrap_or(&self.request_id)
    }
}
