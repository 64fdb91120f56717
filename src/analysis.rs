//! AI analysis of stored content through an OpenAI-compatible API.
//!
//! Sits outside the ingestion pipeline: nothing in `sync` calls it.

use std::future::Future;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::Content;

pub const DEFAULT_ANALYSIS_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("API key not configured")]
    MissingCredential,
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Response contained no completion")]
    EmptyResponse,
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// A named analysis configuration: prompt plus model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analyst {
    pub name: String,
    pub system_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for Analyst {
    fn default() -> Self {
        Self {
            name: "Summarizer".to_string(),
            system_prompt: "Summarize the key points of the following content.".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_content: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u64,
}

/// Anything that can turn a prompt into text.
pub trait TextCompletion {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<Completion, AnalysisError>> + Send;
}

/// Builds the request an analyst makes about one piece of content.
///
/// The body is the processed text, or the raw text when processing left
/// nothing.
pub fn build_request(analyst: &Analyst, content: &Content) -> CompletionRequest {
    let body = if content.processed_content.trim().is_empty() {
        &content.raw_content
    } else {
        &content.processed_content
    };

    CompletionRequest {
        system_prompt: analyst.system_prompt.clone(),
        user_content: format!("Title: {}\n\nContent: {}", content.title, body),
        model: analyst.model.clone(),
        temperature: analyst.temperature,
        max_tokens: analyst.max_tokens,
    }
}

// ============================================================================
// OpenAI-compatible client
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

/// Client for `POST {base}/chat/completions`.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            base_url: DEFAULT_ANALYSIS_BASE_URL.to_string(),
            api_key,
            timeout: DEFAULT_ANALYSIS_TIMEOUT,
        }
    }

    /// Points the client at another OpenAI-compatible endpoint.
    ///
    /// The key travels in a header, so plain HTTP is only accepted for
    /// localhost.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, AnalysisError> {
        let base = base_url.trim().trim_end_matches('/');
        let Ok(parsed) = Url::parse(base) else {
            tracing::error!(base_url = %base, "Rejecting unparseable analysis base URL");
            return Err(AnalysisError::InsecureBaseUrl);
        };

        match parsed.scheme() {
            "https" => {}
            "http" if is_loopback_host(parsed.host_str()) => {
                tracing::warn!(base_url = %base, "Using non-HTTPS analysis base URL (localhost only)");
            }
            _ => {
                tracing::error!(base_url = %base, "Rejecting non-HTTPS analysis base URL");
                return Err(AnalysisError::InsecureBaseUrl);
            }
        }
        self.base_url = base.to_string();
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn post(&self, request: &CompletionRequest) -> Result<Completion, AnalysisError> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or(AnalysisError::MissingCredential)?;

        let body = ChatRequest {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_content,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnalysisError::HttpStatus(response.status().as_u16()));
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(AnalysisError::EmptyResponse)?;

        Ok(Completion {
            text,
            tokens_used: parsed.usage.map_or(0, |u| u.total_tokens),
        })
    }
}

impl TextCompletion for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AnalysisError> {
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(self.timeout, self.post(request))
            .await
            .map_err(|_| AnalysisError::Timeout(self.timeout))?;

        tracing::debug!(
            model = %request.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Completion request finished"
        );
        result
    }
}

fn is_loopback_host(host: Option<&str>) -> bool {
    matches!(host, Some("localhost" | "127.0.0.1" | "[::1]"))
}
