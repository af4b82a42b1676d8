//! OpenAI-compatible chat-completions backend.
//!
//! Serves `openai`, `mistral`, `groq` and `deepseek`, which all accept the
//! same `/chat/completions` request shape and bearer-token auth.

use async_trait::async_trait;
use coordination::{ProviderError, TextBackend};
use serde::{Deserialize, Serialize};

use super::{require_content, send_json, GenerationParams};

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub(crate) fn build_request<'a>(
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    params: GenerationParams,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
        temperature: params.temperature,
        max_tokens: params.max_output_tokens,
    }
}

pub(crate) fn extract_text(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
}

/// Backend speaking the OpenAI chat-completions format.
pub struct OpenAiCompatibleBackend {
    name: &'static str,
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    params: GenerationParams,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        name: &'static str,
        http: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            name,
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            params,
        }
    }
}

#[async_trait]
impl TextBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(&self, prompt: &str, system: &str) -> Result<String, ProviderError> {
        let body = build_request(&self.model, prompt, system, self.params);
        let request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);

        let response: ChatResponse = send_json(self.name, request).await?;
        require_content(self.name, extract_text(response))
    }
}
