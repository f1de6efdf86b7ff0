//! Completion backends: one prompt in, one block of text out.
//!
//! - [`OpenAiBackend`]: `POST {base}/chat/completions`
//! - [`AnthropicBackend`]: `POST {base}/v1/messages`
//! - [`OllamaBackend`]: `POST {base}/api/generate`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use arrs_shared::{ArrsError, Result, SimulationConfig};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Provider tag recorded in simulation metadata.
    fn provider(&self) -> &'static str;

    fn model(&self) -> &str;

    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String>;
}

fn http_client(config: &SimulationConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ArrsError::config(format!("failed to build simulation client: {e}")))
}

/// Send a JSON request and decode a JSON reply, mapping every failure to a
/// simulation error.
async fn post_json<T: for<'de> Deserialize<'de>>(
    request: reqwest::RequestBuilder,
    body: &impl Serialize,
    provider: &str,
) -> Result<T> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ArrsError::Simulation(format!("{provider}: request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ArrsError::Simulation(format!(
            "{provider}: HTTP {status}: {}",
            text.chars().take(200).collect::<String>()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| ArrsError::Simulation(format!("{provider}: malformed response: {e}")))
}

fn non_empty(text: Option<String>, provider: &str) -> Result<String> {
    text.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ArrsError::Simulation(format!("{provider}: empty completion")))
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
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
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiBackend {
    pub const PROVIDER: &'static str = "openai";

    pub fn new(config: &SimulationConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.openai_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn provider(&self) -> &'static str {
        Self::PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(provider = "openai", model = %self.model))]
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key);
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let reply: ChatResponse = post_json(request, &body, Self::PROVIDER).await?;
        let text = non_empty(
            reply.choices.into_iter().next().and_then(|c| c.message.content),
            Self::PROVIDER,
        )?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Anthropic
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicBackend {
    pub const PROVIDER: &'static str = "claude";

    pub fn new(config: &SimulationConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.anthropic_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.claude_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    fn provider(&self) -> &'static str {
        Self::PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(provider = "claude", model = %self.model))]
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let reply: MessagesResponse = post_json(request, &body, Self::PROVIDER).await?;
        let text: String = reply
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        let text = non_empty(Some(text), Self::PROVIDER)?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Ollama
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OllamaBackend {
    pub const PROVIDER: &'static str = "ollama";

    pub fn new(config: &SimulationConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    fn provider(&self) -> &'static str {
        Self::PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(provider = "ollama", model = %self.model))]
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let request = self
            .client
            .post(format!("{}/api/generate", self.base_url));
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let reply: GenerateResponse = post_json(request, &body, Self::PROVIDER).await?;
        let text = non_empty(reply.response, Self::PROVIDER)?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}
