//! Static provider registry.
//!
//! The set of providers is closed: each [`ProviderKind`] maps to a fixed
//! endpoint, default model and wire format. Backends are built by name from
//! this table; nothing is discovered at runtime.
//!
//! | Provider    | Wire format        | Default model              |
//! |-------------|--------------------|----------------------------|
//! | `openai`    | chat-completions   | `gpt-4o-mini`              |
//! | `anthropic` | messages           | `claude-3-5-haiku-latest`  |
//! | `gemini`    | generateContent    | `gemini-1.5-flash`         |
//! | `mistral`   | chat-completions   | `mistral-small-latest`     |
//! | `groq`      | chat-completions   | `llama-3.1-8b-instant`     |
//! | `deepseek`  | chat-completions   | `deepseek-chat`            |

use std::str::FromStr;
use std::sync::Arc;

use coordination::SharedBackend;
use serde::{Deserialize, Serialize};

use super::anthropic::AnthropicBackend;
use super::gemini::GeminiBackend;
use super::openai::OpenAiCompatibleBackend;
use super::GenerationParams;

/// Request/response shape spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    ChatCompletions,
    Messages,
    GenerateContent,
}

/// Every supported provider, in panel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Mistral,
    Groq,
    DeepSeek,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        Self::OpenAi,
        Self::Anthropic,
        Self::Gemini,
        Self::Mistral,
        Self::Groq,
        Self::DeepSeek,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Mistral => "mistral",
            Self::Groq => "groq",
            Self::DeepSeek => "deepseek",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1/chat/completions",
            Self::Anthropic => "https://api.anthropic.com/v1/messages",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta/models",
            Self::Mistral => "https://api.mistral.ai/v1/chat/completions",
            Self::Groq => "https://api.groq.com/openai/v1/chat/completions",
            Self::DeepSeek => "https://api.deepseek.com/chat/completions",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::Gemini => "gemini-1.5-flash",
            Self::Mistral => "mistral-small-latest",
            Self::Groq => "llama-3.1-8b-instant",
            Self::DeepSeek => "deepseek-chat",
        }
    }

    pub fn wire_format(self) -> WireFormat {
        match self {
            Self::Anthropic => WireFormat::Messages,
            Self::Gemini => WireFormat::GenerateContent,
            Self::OpenAi | Self::Mistral | Self::Groq | Self::DeepSeek => {
                WireFormat::ChatCompletions
            }
        }
    }

    /// Environment variable the CLI reads this provider's key from.
    pub fn env_key(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::Mistral => "MISTRAL_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    /// Build a backend for this provider.
    pub fn build(
        self,
        http: reqwest::Client,
        api_key: impl Into<String>,
        params: GenerationParams,
    ) -> SharedBackend {
        let api_key = api_key.into();
        match self.wire_format() {
            WireFormat::ChatCompletions => Arc::new(OpenAiCompatibleBackend::new(
                self.name(),
                http,
                self.endpoint(),
                api_key,
                self.default_model(),
                params,
            )),
            WireFormat::Messages => Arc::new(AnthropicBackend::new(
                http,
                self.endpoint(),
                api_key,
                self.default_model(),
                params,
            )),
            WireFormat::GenerateContent => Arc::new(GeminiBackend::new(
                http,
                self.endpoint(),
                api_key,
                self.default_model(),
                params,
            )),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| format!("unknown provider `{s}`"))
    }
}
