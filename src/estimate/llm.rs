use axum::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::GroqConfig;

#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    #[error("estimator transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("estimator returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("estimator returned an empty completion")]
    EmptyCompletion,
}

/// Boundary to the external language-model completion endpoint. The client
/// knows nothing about ingredients: it takes a prompt and returns raw text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, EstimateError>;
}

// OpenAI-compatible chat completion payloads (Groq speaks this dialect).

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(config: &GroqConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, EstimateError> {
        debug!(model = %self.model, max_tokens, "sending completion request");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(%status, "completion request rejected");
            return Err(EstimateError::Api {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "completion response was not valid JSON");
            EstimateError::Api {
                status,
                body: body.chars().take(200).collect(),
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(EstimateError::EmptyCompletion)
    }
}
