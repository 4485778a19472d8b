//! Translation relay: the privileged network intermediary
//!
//! The page-context flow never fetches directly; it sends a
//! `{type: "translate", url}` message over a [`TranslateChannel`] and receives
//! a `{success, data?, error?}` envelope back. [`TranslationRelay`] is the
//! component behind that channel and the only one permitted to perform
//! cross-origin network access. It never fails across its boundary: every
//! network, status, or parse problem is folded into the failure envelope.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{TranslateError, TranslateResult};
use crate::messages::UiMessages;

/// Request message from the page context to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayRequest {
    Translate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

impl RelayRequest {
    pub fn translate(url: impl Into<String>) -> Self {
        RelayRequest::Translate {
            url: Some(url.into()),
        }
    }
}

/// Response envelope from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponse {
    pub fn ok(data: Option<Value>) -> Self {
        RelayResponse {
            success: true,
            data,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        RelayResponse {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Request/response channel between the page-context flow and the relay.
///
/// On platforms with privilege separation this crosses a process boundary;
/// [`DirectChannel`] collapses it into one process while preserving the
/// message schema.
#[async_trait]
pub trait TranslateChannel: Send + Sync {
    async fn send(&self, request: RelayRequest) -> RelayResponse;
}

/// Performs the actual HTTP call to the translation endpoint.
#[derive(Debug, Clone)]
pub struct TranslationRelay {
    client: reqwest::Client,
    messages: UiMessages,
}

impl TranslationRelay {
    /// Create a relay with a 30 second request timeout.
    pub fn new(messages: UiMessages) -> TranslateResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                TranslateError::Network(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(TranslationRelay { client, messages })
    }

    /// Handle one incoming message.
    ///
    /// A missing or empty `url` yields an immediate failure response with the
    /// localized message, without any network access.
    pub async fn handle(&self, request: RelayRequest) -> RelayResponse {
        match request {
            RelayRequest::Translate { url } => {
                let url = url
                    .as_deref()
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(str::to_string);
                match url {
                    Some(url) => self.translate(&url).await,
                    None => RelayResponse::fail(self.messages.get("relay-missing-url")),
                }
            }
        }
    }

    /// Perform one GET against the translation endpoint.
    ///
    /// Non-2xx responses become failure envelopes embedding the numeric
    /// status. A 2xx body that fails to parse as JSON yields a success with
    /// `data: None` — the caller independently validates the payload shape.
    pub async fn translate(&self, url: &str) -> RelayResponse {
        debug!(%url, "Fetching translation");

        let response = match self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Fetch failed: {}", e);
                return RelayResponse::fail(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error = TranslateError::Http {
                status: status.as_u16(),
            };
            warn!("{}", error);
            return RelayResponse::fail(error.to_string());
        }

        let data = response.json::<Value>().await.ok();
        debug!(?data, "Translation response payload");
        RelayResponse::ok(data)
    }
}

/// In-process channel wrapping the relay directly.
pub struct DirectChannel {
    relay: TranslationRelay,
}

impl DirectChannel {
    pub fn new(relay: TranslationRelay) -> Self {
        DirectChannel { relay }
    }
}

#[async_trait]
impl TranslateChannel for DirectChannel {
    async fn send(&self, request: RelayRequest) -> RelayResponse {
        self.relay.handle(request).await
    }
}

/// Scripted replies for the mock channel.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer `{translated: "<q>_<tgt>"}` derived from the request URL's
    /// query parameters.
    Suffix,
    /// Answer a success envelope with this exact payload.
    Payload(Value),
    /// Answer a failure envelope with this message.
    Failure(String),
}

/// Deterministic, network-free channel for tests and the CLI `--mock` mode.
#[derive(Debug, Clone)]
pub struct MockChannel {
    reply: MockReply,
    delay_ms: u64,
}

impl MockChannel {
    pub fn new(reply: MockReply) -> Self {
        MockChannel { reply, delay_ms: 0 }
    }

    /// Simulate network latency, so in-flight translations overlap.
    pub fn with_delay(reply: MockReply, delay_ms: u64) -> Self {
        MockChannel { reply, delay_ms }
    }
}

#[async_trait]
impl TranslateChannel for MockChannel {
    async fn send(&self, request: RelayRequest) -> RelayResponse {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        let RelayRequest::Translate { url } = request;
        match &self.reply {
            MockReply::Suffix => {
                let Some(url) = url.as_deref().and_then(|u| reqwest::Url::parse(u).ok()) else {
                    return RelayResponse::fail("mock: unparseable request URL");
                };
                let param = |name: &str| {
                    url.query_pairs()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| value.into_owned())
                        .unwrap_or_default()
                };
                let translated = format!("{}_{}", param("q"), param("tgt"));
                RelayResponse::ok(Some(serde_json::json!({ "translated": translated })))
            }
            MockReply::Payload(payload) => RelayResponse::ok(Some(payload.clone())),
            MockReply::Failure(message) => RelayResponse::fail(message.clone()),
        }
    }
}
