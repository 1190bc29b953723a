//! Ollama LLM implementation
//!
//! Talks to `/api/chat` directly over HTTP. Tool definitions and the
//! structured-output `format` are passed through unchanged.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatRequest, ChatResponse, Llm, ToolCall, ToolSpec};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 11434;

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSpec],
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

fn no_tools(tools: &&[ToolSpec]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

/// Ollama client using direct HTTP
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    ///
    /// Unparseable URLs fall back to `http://localhost:11434`.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match url::Url::parse(url) {
            Ok(parsed) => format!(
                "{}://{}:{}",
                parsed.scheme(),
                parsed.host_str().unwrap_or(DEFAULT_HOST),
                parsed.port().unwrap_or(DEFAULT_PORT)
            ),
            Err(e) => {
                tracing::warn!("Invalid Ollama URL '{}' ({}), using default", url, e);
                format!("http://{}:{}", DEFAULT_HOST, DEFAULT_PORT)
            }
        };

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Llm for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            tools: &request.tools,
            format: request.format.as_ref(),
            options: request
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
            stream: false,
        };

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            structured = request.format.is_some(),
            "Sending Ollama chat request"
        );

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send HTTP request to Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let raw_body = response
            .text()
            .await
            .context("Failed to get response text")?;
        let parsed: OllamaChatResponse =
            serde_json::from_str(&raw_body).context("Failed to parse Ollama response")?;

        Ok(ChatResponse {
            content: parsed.message.content,
            tool_calls: parsed.message.tool_calls,
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
