//! Transport collaborator: the trait the engine dispatches against, a
//! rolling-minute rate limiter, and an OpenAI-compatible HTTP client.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use glint_types::TransportError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One model reply: the raw text plus the monetary cost of producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmReply {
    pub text: String,
    pub cost: f64,
}

/// Opaque request/response collaborator that turns a prompt into text and
/// a cost. May fail; the dispatcher records a failed slot as empty rather
/// than aborting the batch.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<LlmReply, TransportError>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

/// Rolling-window request limiter. `acquire` waits (never drops) until the
/// aggregate request rate across all concurrent tasks falls below the
/// configured ceiling. The timestamp ledger is the only cross-task shared
/// mutable state in the engine.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    ledger: Mutex<Vec<DateTime<Utc>>>,
}

impl RateLimiter {
    /// A `max_requests_per_minute` of zero is clamped to one; the limiter
    /// delays requests, it never refuses them outright.
    pub fn per_minute(max_requests_per_minute: usize) -> Self {
        Self {
            max_per_window: max_requests_per_minute.max(1),
            window: Duration::seconds(60),
            ledger: Mutex::new(Vec::new()),
        }
    }

    /// Claim a send slot, sleeping as long as the window is full. The lock
    /// is never held across an await point.
    pub async fn acquire(&self) {
        loop {
            match self.reserve(Utc::now()) {
                None => return,
                Some(wait) => {
                    debug!(wait_ms = wait.num_milliseconds(), "rate limiter full; waiting");
                    tokio::time::sleep(wait.to_std().unwrap_or_default()).await;
                }
            }
        }
    }

    /// Try to claim a slot at `now`. Returns `None` on success, or the
    /// delay until the oldest ledger entry leaves the window.
    fn reserve(&self, now: DateTime<Utc>) -> Option<Duration> {
        let mut ledger = self.ledger.lock();
        let cutoff = now - self.window;
        ledger.retain(|t| *t >= cutoff);

        if ledger.len() < self.max_per_window {
            ledger.push(now);
            return None;
        }
        let oldest = ledger[0];
        Some((oldest + self.window) - now)
    }
}

/// Decorator that throttles an inner transport through a shared
/// [`RateLimiter`].
pub struct RateLimitedTransport<T: Transport> {
    inner: T,
    limiter: RateLimiter,
}

impl<T: Transport> RateLimitedTransport<T> {
    pub fn new(inner: T, max_requests_per_minute: usize) -> Self {
        Self {
            inner,
            limiter: RateLimiter::per_minute(max_requests_per_minute),
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for RateLimitedTransport<T> {
    async fn send(&self, prompt: &str) -> Result<LlmReply, TransportError> {
        self.limiter.acquire().await;
        self.inner.send(prompt).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible HTTP transport
// ---------------------------------------------------------------------------

/// Configuration for [`OpenAiTransport`]. Works against any
/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    /// Dollars per million prompt tokens, for cost accounting.
    pub prompt_price_per_million: f64,
    /// Dollars per million completion tokens.
    pub completion_price_per_million: f64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: "You are an AI assistant that helps people find information."
                .to_string(),
            prompt_price_per_million: 0.15,
            completion_price_per_million: 0.60,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_pricing(mut self, prompt_per_million: f64, completion_per_million: f64) -> Self {
        self.prompt_price_per_million = prompt_per_million;
        self.completion_price_per_million = completion_per_million;
        self
    }
}

/// Chat-completions client for an OpenAI-compatible backend.
pub struct OpenAiTransport {
    config: OpenAiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl OpenAiTransport {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn cost_of(&self, usage: &ChatUsage) -> f64 {
        usage.prompt_tokens as f64 / 1e6 * self.config.prompt_price_per_million
            + usage.completion_tokens as f64 / 1e6 * self.config.completion_price_per_million
    }
}

#[async_trait]
impl Transport for OpenAiTransport {
    async fn send(&self, prompt: &str) -> Result<LlmReply, TransportError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| TransportError::MalformedReply {
                    message: e.to_string(),
                })?;

        let choice = parsed
            .choices
            .first()
            .ok_or_else(|| TransportError::MalformedReply {
                message: "reply contained no choices".to_string(),
            })?;
        let cost = parsed.usage.as_ref().map(|u| self.cost_of(u)).unwrap_or(0.0);

        Ok(LlmReply {
            text: choice.message.content.clone(),
            cost,
        })
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
