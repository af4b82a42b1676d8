//! Anthropic messages backend.

use async_trait::async_trait;
use coordination::{ProviderError, TextBackend};
use serde::{Deserialize, Serialize};

use super::{require_content, send_json, GenerationParams};

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn build_request<'a>(
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    params: GenerationParams,
) -> MessagesRequest<'a> {
    MessagesRequest {
        model,
        system,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
        max_tokens: params.max_output_tokens,
        // Anthropic caps temperature at 1.0.
        temperature: params.temperature.min(1.0),
    }
}

/// Concatenate every text block; other block types are skipped.
fn extract_text(response: MessagesResponse) -> Option<String> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    (!text.is_empty()).then_some(text)
}

pub struct AnthropicBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    params: GenerationParams,
}

impl AnthropicBackend {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            params,
        }
    }
}

#[async_trait]
impl TextBackend for AnthropicBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str, system: &str) -> Result<String, ProviderError> {
        let body = build_request(&self.model, prompt, system, self.params);
        let request = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let response: MessagesResponse = send_json(PROVIDER, request).await?;
        require_content(PROVIDER, extract_text(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_instruction_is_top_level() {
        let body = serde_json::to_value(build_request(
            "claude",
            "question",
            "rules",
            GenerationParams {
                temperature: 1.4,
                max_output_tokens: 100,
            },
        ))
        .unwrap();
        assert_eq!(body["system"], "rules");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["content"], "question");
        assert_eq!(body["temperature"], 1.0);
    }

    #[test]
    fn text_blocks_are_concatenated() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Hello, "},{"type":"tool_use","id":"t"},{"type":"text","text":"world"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).as_deref(), Some("Hello, world"));
    }

    #[test]
    fn empty_content_yields_no_text() {
        let response: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(extract_text(response).is_none());
    }
}
