//! Concrete text-generation backends over HTTPS.
//!
//! Each backend performs exactly one outbound request per `generate` call,
//! extracts the generated text, and maps every failure to a
//! [`ProviderError`]. Retries and fallbacks live in the pipeline, not here.
//!
//! Credentials arrive per request ([`Credentials`]); the shared
//! `reqwest::Client` and [`GenerationParams`] are passed into every backend
//! constructor explicitly.

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod registry;

use std::collections::BTreeMap;

use coordination::{ProviderError, SharedBackend};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OrchestratorConfig;
use crate::pipeline::errors::OrchestrationError;

pub use registry::{ProviderKind, WireFormat};

/// Generation parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        let cfg = OrchestratorConfig::default();
        Self::from_config(&cfg)
    }
}

impl GenerationParams {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────────────

/// Per-request API keys, keyed by provider name.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, String>);

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_set().entries(self.0.keys()).finish()
    }
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.0.insert(provider.into().to_ascii_lowercase(), key.into());
        self
    }

    /// Read `<PROVIDER>_API_KEY` variables. Only the binary calls this.
    pub fn from_env() -> Self {
        ProviderKind::ALL
            .into_iter()
            .filter_map(|kind| {
                std::env::var(kind.env_key())
                    .ok()
                    .map(|key| (kind.name().to_string(), key))
            })
            .fold(Self::new(), |creds, (name, key)| creds.with(name, key))
    }

    /// Key for `kind`, if present and non-blank.
    pub fn key_for(&self, kind: ProviderKind) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(kind.name()))
            .map(|(_, key)| key.trim())
            .filter(|key| !key.is_empty())
    }

    /// Providers with a usable key, in registry order.
    pub fn configured(&self) -> Vec<ProviderKind> {
        for name in self.0.keys() {
            if name.parse::<ProviderKind>().is_err() {
                warn!(provider = %name, "ignoring credential for unknown provider");
            }
        }
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.key_for(*kind).is_some())
            .collect()
    }
}

// ── ProviderSet ──────────────────────────────────────────────────────────────

/// Backends built for one run: the fast single-shot backend and the panel.
#[derive(Clone)]
pub struct ProviderSet {
    pub fast: SharedBackend,
    pub panel: Vec<SharedBackend>,
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSet")
            .field("fast", &self.fast.name())
            .field(
                "panel",
                &self.panel.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ProviderSet {
    /// Build backends for every configured credential.
    ///
    /// The fast backend is `config.fast_provider` when its key is present,
    /// otherwise the first panel member.
    pub fn from_credentials(
        credentials: &Credentials,
        config: &OrchestratorConfig,
        http: &reqwest::Client,
    ) -> Result<Self, OrchestrationError> {
        let params = GenerationParams::from_config(config);
        let mut panel = Vec::new();
        let mut fast = None;
        let preferred = config.fast_provider.parse::<ProviderKind>().ok();

        for kind in credentials.configured() {
            let Some(key) = credentials.key_for(kind) else {
                continue;
            };
            let backend = kind.build(http.clone(), key, params);
            if Some(kind) == preferred {
                fast = Some(backend.clone());
            }
            panel.push(backend);
        }

        let fast = match fast.or_else(|| panel.first().cloned()) {
            Some(fast) => fast,
            None => {
                return Err(OrchestrationError::InvalidRequest(
                    "no backend credentials supplied".to_string(),
                ))
            }
        };

        debug!(fast = fast.name(), panel = panel.len(), "provider set built");
        Ok(Self { fast, panel })
    }
}

// ── Shared transport ─────────────────────────────────────────────────────────

/// Send a prepared request and decode a JSON body, mapping every failure
/// mode onto `ProviderError`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::network(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::decode(provider, e))
}

/// Keep error bodies short enough for logs.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

/// Reject absent or whitespace-only generated text.
pub(crate) fn require_content(
    provider: &str,
    content: Option<String>,
) -> Result<String, ProviderError> {
    match content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ProviderError::missing_content(provider)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_count_as_absent() {
        let creds = Credentials::new()
            .with("openai", "sk-1")
            .with("groq", "   ")
            .with("anthropic", "ak-1");
        assert_eq!(
            creds.configured(),
            vec![ProviderKind::OpenAi, ProviderKind::Anthropic]
        );
        assert!(creds.key_for(ProviderKind::Groq).is_none());
    }

    #[test]
    fn unknown_providers_are_ignored() {
        let creds = Credentials::new().with("cohere", "x").with("Gemini", "g");
        assert_eq!(creds.configured(), vec![ProviderKind::Gemini]);
    }

    #[test]
    fn credentials_debug_redacts_keys() {
        let creds = Credentials::new().with("openai", "sk-secret");
        let printed = format!("{creds:?}");
        assert!(printed.contains("openai"));
        assert!(!printed.contains("sk-secret"));
    }

    #[test]
    fn credentials_deserialize_from_flat_map() {
        let creds: Credentials =
            serde_json::from_str(r#"{"openai":"sk-1","deepseek":"ds-1"}"#).unwrap();
        assert_eq!(
            creds.configured(),
            vec![ProviderKind::OpenAi, ProviderKind::DeepSeek]
        );
    }

    #[test]
    fn preferred_fast_provider_is_used_when_configured() {
        let creds = Credentials::new().with("openai", "a").with("groq", "b");
        let set = ProviderSet::from_credentials(
            &creds,
            &OrchestratorConfig::default(),
            &reqwest::Client::new(),
        )
        .unwrap();
        assert_eq!(set.fast.name(), "groq");
        assert_eq!(set.panel.len(), 2);
    }

    #[test]
    fn fast_provider_falls_back_to_first_panel_member() {
        let creds = Credentials::new().with("mistral", "m").with("anthropic", "a");
        let set = ProviderSet::from_credentials(
            &creds,
            &OrchestratorConfig::default(),
            &reqwest::Client::new(),
        )
        .unwrap();
        assert_eq!(set.fast.name(), "anthropic");
    }

    #[test]
    fn no_credentials_is_invalid_request() {
        let err = ProviderSet::from_credentials(
            &Credentials::new(),
            &OrchestratorConfig::default(),
            &reqwest::Client::new(),
        )
        .unwrap_err();
        assert!(matches!(err, OrchestrationError::InvalidRequest(_)));
    }

    #[test]
    fn require_content_rejects_blank_text() {
        assert!(require_content("x", None).is_err());
        assert!(require_content("x", Some("  \n".into())).is_err());
        assert_eq!(require_content("x", Some("hi".into())).unwrap(), "hi");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(2_000);
        let truncated = truncate_body(&body);
        assert!(truncated.chars().count() <= 501);
    }
}
