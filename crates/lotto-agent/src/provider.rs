use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Request to a text-generation provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// One system instruction plus one user instruction.
    pub fn single_turn(model: &str, system: String, user: String) -> Self {
        Self {
            model: model.to_string(),
            system,
            messages: vec![Message {
                role: Role::User,
                content: user,
            }],
            max_tokens: 512,
            temperature: None,
        }
    }
}

/// Response from a provider.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub stop_reason: String,
}

/// Common interface for text-generation backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Send a chat request and wait for the full response.
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Stand-in used when no backend credentials are configured.
///
/// Every call fails, so scheduled generation logs an error and moves on
/// while the rest of the service keeps working.
pub struct NullProvider;

#[async_trait]
impl LlmProvider for NullProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        Err(ProviderError::Unavailable(
            "no generation backend configured (set ai.api_key)".to_string(),
        ))
    }
}
