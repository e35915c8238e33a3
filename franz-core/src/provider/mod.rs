//! # VLM Provider Interface
//!
//! Talking to a vision-language model over an OpenAI-compatible
//! chat-completions endpoint.
//!
//! - `LlmProvider` is the seam the agent is generic over
//! - `OpenAIProvider` covers LM Studio, vLLM, Ollama and OpenAI itself
//! - `complete_with_retry` bounds transport failures with exponential backoff

pub mod openai;
pub mod retry;

pub use openai::OpenAIProvider;
pub use retry::{complete_with_retry, RetryPolicy};

use crate::error::ErrorStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Messages
// ============================================================================

/// Franz only ever sends; the model's answer comes back as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Pointer to an image, in practice always a `data:` URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Inline a base64-encoded PNG
    pub fn png_base64(data: &str) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:image/png;base64,{}", data),
            },
        }
    }
}

/// A bare string (system prompt) or a list of parts (user turns)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(prompt: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(prompt.into()),
        }
    }

    /// Single text part, even for an empty story
    pub fn user(text: impl Into<String>) -> Self {
        Self::user_parts(vec![ContentPart::text(text)])
    }

    /// Text first, then the inline PNG
    pub fn user_with_image(text: impl Into<String>, png_base64: &str) -> Self {
        Self::user_parts(vec![ContentPart::text(text), ContentPart::png_base64(png_base64)])
    }

    fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

// ============================================================================
// Request / response
// ============================================================================

/// One non-streaming completion call. Unset sampling fields are left to the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Model id the server reports, may differ from the one requested
    pub model: String,
    /// `None` when the server sent `"content": null`
    pub content: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Hit `max_tokens`; the story is cut short but still adopted
    Length,
    ContentFilter,
    Unknown,
}

impl FinishReason {
    fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ============================================================================
// Provider trait
// ============================================================================

/// Why a single completion call failed
#[derive(Debug)]
pub enum ProviderError {
    /// No answer at all: refused, reset, timed out, or the body was cut off
    Transport(String),
    /// The server answered with a non-2xx status (including 401 and 429)
    Status { code: u16, body: String },
    /// A 2xx answer that is not a usable chat completion
    Malformed(String),
}

impl ProviderError {
    /// Could sending the same request again succeed?
    ///
    /// Any non-2xx counts: a local server that is still loading its model
    /// answers 503 for a while, a gateway may rate limit.
    pub fn status(&self) -> ErrorStatus {
        match self {
            Self::Malformed(_) => ErrorStatus::Permanent,
            Self::Transport(_) | Self::Status { .. } => ErrorStatus::Temporary,
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Status { code, body } if body.is_empty() => write!(f, "HTTP {}", code),
            Self::Status { code, body } => write!(f, "HTTP {}: {}", code, body),
            Self::Malformed(e) => write!(f, "malformed completion: {}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

#[allow(async_fn_in_trait)]
pub trait LlmProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Model used when a request does not name one
    fn default_model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}

// ============================================================================
// Provider configuration
// ============================================================================

/// LM Studio's default address
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";

pub const DEFAULT_MODEL: &str = "qwen3-vl-2b-instruct-1m";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Sent as a bearer token when non-empty
    pub api_key: Option<String>,
    /// Everything before `/chat/completions`
    pub base_url: String,
    pub default_model: String,
    /// Extra headers for gateways that want them
    pub headers: HashMap<String, String>,
    /// Per-request timeout; `None` waits as long as the server takes
    pub timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::local(DEFAULT_BASE_URL, DEFAULT_MODEL)
    }
}

impl ProviderConfig {
    pub fn local(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into(),
            default_model: model.into(),
            headers: HashMap::new(),
            timeout_secs: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
