//! Frequency platform HTTP client: poll, respond, send, talk, and metadata
//! callback posts.
//!
//! Outbound fire-and-forget operations (send, talk) never raise: they log the
//! failure and return a false/None sentinel. Queue-facing operations (poll,
//! respond) return a typed error so the caller can decide what to log.

use crate::config::Identity;
use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Client for the hosted frequency platform API.
#[derive(Clone)]
pub struct FrequencyClient {
    identity: Identity,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum FrequencyError {
    #[error("frequency request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("frequency api error: {0}")]
    Api(String),
}

/// Body for the respond endpoint and for metadata callback posts.
#[derive(Debug, Serialize)]
struct ResponsePayload<'a> {
    request_id: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<PollData>,
}

#[derive(Debug, Deserialize)]
struct PollData {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct SendPayload<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_agent: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TalkPayload<'a> {
    content: &'a str,
    /// Wire field is `await`: whether the platform should block for a reply.
    #[serde(rename = "await")]
    await_response: bool,
    /// Advisory; interpreted and enforced by the platform, not locally.
    timeout: u64,
}

#[derive(Debug, Deserialize)]
struct TalkResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<TalkData>,
}

#[derive(Debug, Deserialize)]
struct TalkData {
    #[serde(default)]
    response: Option<TalkReply>,
}

#[derive(Debug, Deserialize)]
struct TalkReply {
    #[serde(default)]
    content: Option<String>,
}

impl FrequencyClient {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            client: reqwest::Client::new(),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/{}/{}",
            self.identity.base_url, self.identity.frequency_id, path
        )
    }

    /// Bearer auth plus the agent-identifying header, attached to every
    /// platform-facing request (never to metadata callback URLs).
    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.identity.api_key)
            .header("X-Agent-Id", &self.identity.agent_id)
    }

    /// GET messages/poll — fetch pending messages for this agent.
    /// A malformed payload or `success: false` is an error; callers treat it as
    /// "no messages" for this cycle.
    pub async fn poll_messages(&self) -> Result<Vec<Message>, FrequencyError> {
        let url = self.api_url("messages/poll");
        let res = self.authed(self.client.get(&url)).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(FrequencyError::Api(format!("poll: {} {}", status, body)));
        }
        let data: PollResponse = res.json().await?;
        if !data.success {
            return Err(FrequencyError::Api("poll returned success: false".to_string()));
        }
        Ok(data.data.map(|d| d.messages).unwrap_or_default())
    }

    /// POST messages/respond — queue a response on the platform.
    pub async fn respond(&self, request_id: &str, content: &str) -> Result<(), FrequencyError> {
        let url = self.api_url("messages/respond");
        let body = ResponsePayload { request_id, content };
        let res = self.authed(self.client.post(&url)).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(FrequencyError::Api(format!("respond: {} {}", status, body)));
        }
        Ok(())
    }

    /// POST the response to a message-supplied callback URL. No auth header: the
    /// URL itself is treated as a capability token.
    pub async fn post_callback(
        &self,
        url: &str,
        request_id: &str,
        content: &str,
    ) -> Result<(), FrequencyError> {
        let body = ResponsePayload { request_id, content };
        let res = self.client.post(url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(FrequencyError::Api(format!("callback: {} {}", status, body)));
        }
        Ok(())
    }

    /// POST messages/send — broadcast (or target) a message on the frequency.
    /// Returns true iff the platform answered 2xx; never raises.
    pub async fn send_message(&self, content: &str, target_agent: Option<&str>) -> bool {
        let url = self.api_url("messages/send");
        let body = SendPayload { content, target_agent };
        let res = self.authed(self.client.post(&url)).json(&body).send().await;
        match res {
            Ok(res) if res.status().is_success() => true,
            Ok(res) => {
                log::warn!("send failed: {}", res.status());
                false
            }
            Err(e) => {
                log::warn!("send failed: {}", e);
                false
            }
        }
    }

    /// POST agents/{target}/talk — synchronous request/reply with another agent.
    /// With `await_response` false this resolves to None without reading any
    /// body field. Otherwise Some(reply) only for 2xx + `success: true` with a
    /// nested reply content; anything else is None. Never raises.
    pub async fn talk_to_agent(
        &self,
        target_agent_id: &str,
        content: &str,
        await_response: bool,
        timeout_secs: u64,
    ) -> Option<String> {
        let url = self.api_url(&format!("agents/{}/talk", target_agent_id));
        let body = TalkPayload {
            content,
            await_response,
            timeout: timeout_secs,
        };
        let res = match self.authed(self.client.post(&url)).json(&body).send().await {
            Ok(res) => res,
            Err(e) => {
                log::warn!("talk failed: {}", e);
                return None;
            }
        };
        if !await_response {
            return None;
        }
        if !res.status().is_success() {
            log::warn!("talk failed: {}", res.status());
            return None;
        }
        let data: TalkResponse = match res.json().await {
            Ok(d) => d,
            Err(e) => {
                log::warn!("talk reply malformed: {}", e);
                return None;
            }
        };
        if !data.success {
            return None;
        }
        data.data?.response?.content
    }
}
