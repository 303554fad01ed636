//! LLM Client implementation
//!
//! Talks to any OpenAI-compatible chat-completions endpoint (OpenAI,
//! OpenRouter, Ollama, LM Studio). Transport-level retries live here;
//! the workflow above never retries.

use super::chat::{ChatMessage, ChatRequest, ChatResponse};
use crate::util::{requires_api_key, sanitize_base_url, validate_api_key};
use anyhow::{bail, Context, Result};
use rand::Rng;
use reqwest::{
    header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE},
    Client as HttpClient, StatusCode,
};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Endpoint configuration for one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Bearer token; optional for local endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Retries on network errors, 429 and 5xx
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry
    pub retry_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 360,
            max_tokens: None,
            temperature: None,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl LlmConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Check the fields a request cannot be built without
    pub fn validate(&self) -> Result<()> {
        sanitize_base_url(&self.base_url, "Base URL")?;
        if self.model.trim().is_empty() {
            bail!("Model cannot be empty");
        }
        if self.timeout_secs == 0 {
            bail!("Timeout must be greater than zero");
        }
        if let Some(key) = &self.api_key {
            validate_api_key(key)?;
        }
        Ok(())
    }

    /// Remote endpoints need a usable API key before the first request
    pub fn check_credentials(&self) -> Result<()> {
        match &self.api_key {
            Some(key) => validate_api_key(key).map(|_| ()),
            None if requires_api_key(&self.base_url) => {
                bail!("No API key configured for {}", self.base_url)
            }
            None => Ok(()),
        }
    }
}

/// Chat-completions client
pub struct LlmClient {
    config: LlmConfig,
    http_client: HttpClient,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("agentflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(LlmClient { config, http_client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send messages with the configured model and return the first choice's text
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = self.request(messages);
        self.complete_request(&request).await
    }

    /// Build a request carrying the configured model and sampling settings
    pub fn request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        let mut request = ChatRequest::new(self.config.model.clone(), messages);
        request.max_tokens = self.config.max_tokens;
        request.temperature = self.config.temperature;
        request
    }

    /// Send a prepared request and return the first choice's text
    pub async fn complete_request(&self, request: &ChatRequest) -> Result<String> {
        let response = self.chat(request).await?;
        completion_text(&response)
    }

    /// Send a chat request and get a response
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let base_url = sanitize_base_url(&self.config.base_url, "Base URL")?;
        let url = format!("{}/chat/completions", base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "chat request"
        );

        let headers = self.build_headers()?;
        let started = std::time::Instant::now();
        let response = self
            .retry_with_backoff(|| async {
                self.http_client
                    .post(&url)
                    .headers(headers.clone())
                    .json(request)
                    .send()
                    .await
            })
            .await
            .context("Failed to send chat request")?;

        match response.status() {
            StatusCode::OK => {
                let text = response
                    .text()
                    .await
                    .context("Failed to read chat response body")?;
                let body: ChatResponse = serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse chat response: {}", truncate(&text, 200)))?;

                match body.usage {
                    Some(usage) => info!(
                        elapsed = ?started.elapsed(),
                        prompt = usage.prompt_tokens,
                        completion = usage.completion_tokens,
                        total = usage.total_tokens,
                        "chat completed"
                    ),
                    None => info!(elapsed = ?started.elapsed(), "chat completed (no usage data)"),
                }
                Ok(body)
            }
            StatusCode::UNAUTHORIZED => {
                bail!("Authentication failed. Check your API key.");
            }
            StatusCode::TOO_MANY_REQUESTS => {
                bail!("Rate limit exceeded. Please try again later.");
            }
            status => {
                let error_body: Option<serde_json::Value> = response.json().await.ok();
                let error_msg = error_body
                    .as_ref()
                    .and_then(|v| v.get("error").and_then(|e| e.get("message")))
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown error");
                bail!("API request failed ({}): {}", status, error_msg);
            }
        }
    }

    /// Jittered exponential backoff, honoring Retry-After on 429
    async fn retry_with_backoff<F, Fut>(&self, operation: F) -> Result<reqwest::Response>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let max_retries = self.config.max_retries;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut attempt = 0;

        loop {
            let wait = match operation().await {
                Ok(response) => {
                    let status = response.status();
                    let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if !retryable || attempt >= max_retries {
                        return Ok(response);
                    }
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .map(Duration::from_secs);
                    warn!(%status, attempt = attempt + 1, max_retries, "provider error, retrying");
                    retry_after.unwrap_or(delay)
                }
                Err(e) => {
                    if attempt >= max_retries {
                        return Err(e.into());
                    }
                    warn!(error = %e, attempt = attempt + 1, max_retries, "network error, retrying");
                    delay
                }
            };

            sleep(wait).await;
            attempt += 1;

            // Jitter: +/- 10%
            let base_ms = delay.as_millis() as i64 * 2;
            let spread = base_ms / 10;
            let jitter_ms = if spread > 0 {
                rand::thread_rng().gen_range(-spread..=spread)
            } else {
                0
            };
            delay = Duration::from_millis((base_ms + jitter_ms).max(0) as u64);
        }
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            "application/json".parse().context("Invalid content-type header")?,
        );

        if self.config.base_url.contains("openrouter.ai") {
            headers.insert("X-Title", "agentflow".parse().context("Invalid X-Title header")?);
        }

        if let Some(api_key) = &self.config.api_key {
            let validated_key = validate_api_key(api_key)?;
            headers.insert(
                AUTHORIZATION,
                format!("Bearer {}", validated_key)
                    .parse()
                    .context("Invalid Authorization header")?,
            );
        }

        Ok(headers)
    }
}

/// Text of the first choice; blank completions are an error
pub fn completion_text(response: &ChatResponse) -> Result<String> {
    match response.content() {
        Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
        _ => bail!("Provider returned an empty completion"),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
