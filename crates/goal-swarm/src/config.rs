//! Runtime configuration for the orchestration pipeline.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variable overrides (e.g. `GOAL_SWARM_QUORUM`)
//! 2. Values from a TOML file (`--config goal-swarm.toml`)
//! 3. Built-in defaults
//!
//! Provider credentials are deliberately absent: they travel with each
//! request (see [`crate::providers::Credentials`]) so concurrent runs can use
//! different key sets.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use coordination::EnsembleSettings;
use serde::{Deserialize, Serialize};

/// Maximum subtasks per decomposition.
const DEFAULT_MAX_SUBTASKS: usize = 5;
/// Majority threshold for the ensemble (4 of up to 6 providers).
const DEFAULT_QUORUM: usize = 4;
const DEFAULT_PER_PROVIDER_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_CEILING_MS: u64 = 20_000;
const DEFAULT_FAST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_FAST_PROVIDER: &str = "groq";
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2_048;
const DEFAULT_CONTEXT_SEPARATOR: &str = "\n\n---\n\n";
const DEFAULT_REFLECTION_MAX_CHARS: usize = 200;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Environment-variable names for overrides.
const ENV_MAX_SUBTASKS: &str = "GOAL_SWARM_MAX_SUBTASKS";
const ENV_QUORUM: &str = "GOAL_SWARM_QUORUM";
const ENV_PER_PROVIDER_TIMEOUT_MS: &str = "GOAL_SWARM_PER_PROVIDER_TIMEOUT_MS";
const ENV_CEILING_MS: &str = "GOAL_SWARM_CEILING_MS";
const ENV_FAST_TIMEOUT_MS: &str = "GOAL_SWARM_FAST_TIMEOUT_MS";
const ENV_FAST_PROVIDER: &str = "GOAL_SWARM_FAST_PROVIDER";
const ENV_TEMPERATURE: &str = "GOAL_SWARM_TEMPERATURE";
const ENV_MAX_OUTPUT_TOKENS: &str = "GOAL_SWARM_MAX_OUTPUT_TOKENS";

/// Top-level configuration threaded through the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound K on subtasks per decomposition.
    pub max_subtasks: usize,
    /// Successful ensemble responses needed to resolve early.
    pub quorum: usize,
    /// Deadline for each ensemble participant.
    pub per_provider_timeout_ms: u64,
    /// Global bound on one ensemble call.
    pub ceiling_ms: u64,
    /// Deadline for single fast-backend calls (decompose, reflect).
    pub fast_timeout_ms: u64,
    /// Preferred provider for fast calls; falls back to the first panel member.
    pub fast_provider: String,
    /// Sampling temperature sent to every provider.
    pub temperature: f64,
    /// Max output size sent to every provider.
    pub max_output_tokens: u32,
    /// Joins dependency outputs when building synthesis context.
    pub context_separator: String,
    /// Truncation length for the failure-path reflection.
    pub reflection_max_chars: usize,
    /// Transport-level timeout on the shared HTTP client.
    pub http_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_subtasks: DEFAULT_MAX_SUBTASKS,
            quorum: DEFAULT_QUORUM,
            per_provider_timeout_ms: DEFAULT_PER_PROVIDER_TIMEOUT_MS,
            ceiling_ms: DEFAULT_CEILING_MS,
            fast_timeout_ms: DEFAULT_FAST_TIMEOUT_MS,
            fast_provider: DEFAULT_FAST_PROVIDER.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            context_separator: DEFAULT_CONTEXT_SEPARATOR.to_string(),
            reflection_max_chars: DEFAULT_REFLECTION_MAX_CHARS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Load a TOML file, then apply environment overrides.
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut cfg: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        override_from_env(ENV_MAX_SUBTASKS, &mut self.max_subtasks);
        override_from_env(ENV_QUORUM, &mut self.quorum);
        override_from_env(ENV_PER_PROVIDER_TIMEOUT_MS, &mut self.per_provider_timeout_ms);
        override_from_env(ENV_CEILING_MS, &mut self.ceiling_ms);
        override_from_env(ENV_FAST_TIMEOUT_MS, &mut self.fast_timeout_ms);
        override_from_env(ENV_TEMPERATURE, &mut self.temperature);
        override_from_env(ENV_MAX_OUTPUT_TOKENS, &mut self.max_output_tokens);
        if let Ok(provider) = env::var(ENV_FAST_PROVIDER) {
            if !provider.trim().is_empty() {
                self.fast_provider = provider.trim().to_ascii_lowercase();
            }
        }
    }

    /// Validate all fields; return an error string if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_subtasks == 0 {
            return Err("max_subtasks must be > 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be in [0, 2], got {}",
                self.temperature
            ));
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be > 0".to_string());
        }
        if self.fast_timeout_ms == 0 {
            return Err("fast_timeout_ms must be > 0".to_string());
        }
        if self.ceiling_ms < self.per_provider_timeout_ms {
            tracing::warn!(
                ceiling_ms = self.ceiling_ms,
                per_provider_timeout_ms = self.per_provider_timeout_ms,
                "ensemble ceiling is shorter than the per-provider deadline"
            );
        }
        self.ensemble_settings().validate()
    }

    pub fn ensemble_settings(&self) -> EnsembleSettings {
        EnsembleSettings {
            per_provider_timeout: Duration::from_millis(self.per_provider_timeout_ms),
            quorum: self.quorum,
            ceiling: Duration::from_millis(self.ceiling_ms),
        }
    }

    pub fn fast_timeout(&self) -> Duration {
        Duration::from_millis(self.fast_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn override_from_env<T: FromStr>(key: &str, slot: &mut T) {
    if let Ok(raw) = env::var(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!(key, value = %raw, "ignoring unparsable config override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn default_config_validates() {
        let cfg = OrchestratorConfig::default();
        cfg.validate().expect("default config should be valid");
        assert_eq!(cfg.max_subtasks, 5);
        assert_eq!(cfg.quorum, 4);
    }

    #[test]
    fn ensemble_settings_carry_timeouts() {
        let cfg = OrchestratorConfig::default();
        let settings = cfg.ensemble_settings();
        assert_eq!(settings.per_provider_timeout, Duration::from_secs(15));
        assert_eq!(settings.ceiling, Duration::from_secs(20));
        assert_eq!(settings.quorum, 4);
    }

    #[test]
    fn zero_quorum_rejected() {
        let cfg = OrchestratorConfig {
            quorum: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_max_subtasks_rejected() {
        let cfg = OrchestratorConfig {
            max_subtasks: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_subtasks = 3\nquorum = 2\nfast_provider = \"openai\"").unwrap();

        let cfg = OrchestratorConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(cfg.max_subtasks, 3);
        assert_eq!(cfg.quorum, 2);
        assert_eq!(cfg.fast_provider, "openai");
        // Untouched fields keep their defaults.
        assert_eq!(cfg.ceiling_ms, 20_000);
    }

    #[test]
    fn missing_toml_file_is_an_error() {
        assert!(OrchestratorConfig::from_toml_file("/nonexistent/goal-swarm.toml").is_err());
    }
}
