//! The ensemble resolver: concurrent dispatch, arrival-ordered collection,
//! quorum / ceiling resolution.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{ProviderError, SharedBackend};
use crate::race::{with_deadline, Raced};

use super::selection::{select_longest, Candidate};
use super::{Compete, EnsembleError, EnsembleOutcome, EnsembleSettings, ResolutionLevel};

/// What a participant reports back, exactly once.
struct Arrival {
    provider: String,
    raced: Raced<Result<String, ProviderError>>,
    latency: std::time::Duration,
}

/// Why collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    QuorumReached,
    CeilingElapsed,
    AllSettled,
}

/// Races a fixed panel of backends for each prompt.
pub struct EnsembleResolver {
    panel: Vec<SharedBackend>,
    settings: EnsembleSettings,
}

impl std::fmt::Debug for EnsembleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleResolver")
            .field("panel", &self.panel_names())
            .field("settings", &self.settings)
            .finish()
    }
}

impl EnsembleResolver {
    pub fn new(panel: Vec<SharedBackend>, settings: EnsembleSettings) -> Result<Self, EnsembleError> {
        settings.validate().map_err(EnsembleError::InvalidSettings)?;
        Ok(Self { panel, settings })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn panel_names(&self) -> Vec<&str> {
        self.panel.iter().map(|b| b.name()).collect()
    }

    pub fn settings(&self) -> &EnsembleSettings {
        &self.settings
    }

    /// Resolve `prompt` through the whole panel. Never fails; an empty panel
    /// or a panel where nothing succeeds yields the synthetic outcome.
    pub async fn resolve(&self, prompt: &str, system: &str) -> EnsembleOutcome {
        let dispatched = Instant::now();
        let (tx, mut rx) = mpsc::unbounded_channel::<Arrival>();
        let prompt: Arc<str> = Arc::from(prompt);
        let system: Arc<str> = Arc::from(system);

        for backend in &self.panel {
            let backend = backend.clone();
            let tx = tx.clone();
            let prompt = prompt.clone();
            let system = system.clone();
            let deadline = self.settings.per_provider_timeout;

            tokio::spawn(async move {
                let provider = backend.name().to_string();
                let raced = with_deadline(
                    async move { backend.generate(&prompt, &system).await },
                    deadline,
                )
                .await;
                let arrival = Arrival {
                    provider,
                    raced,
                    latency: dispatched.elapsed(),
                };
                if let Err(mpsc::error::SendError(late)) = tx.send(arrival) {
                    debug!(
                        provider = %late.provider,
                        latency_ms = late.latency.as_millis() as u64,
                        "late arrival dropped after resolution"
                    );
                }
            });
        }
        // Only participants hold senders now; the channel closes once all report.
        drop(tx);

        let ceiling = tokio::time::sleep(self.settings.ceiling);
        tokio::pin!(ceiling);

        let mut accepted: Vec<Candidate> = Vec::with_capacity(self.panel.len());
        let stop = loop {
            tokio::select! {
                arrival = rx.recv() => {
                    let Some(arrival) = arrival else {
                        break StopReason::AllSettled;
                    };
                    if let Some(candidate) = admit(arrival) {
                        accepted.push(candidate);
                        if accepted.len() >= self.settings.quorum {
                            break StopReason::QuorumReached;
                        }
                    }
                }
                _ = &mut ceiling => break StopReason::CeilingElapsed,
            }
        };
        drop(rx);

        let outcome = match select_longest(&accepted) {
            Some(best) => EnsembleOutcome {
                content: best.content.clone(),
                source_backend: best.provider.clone(),
                latency_ms: best.latency.as_millis() as u64,
                responders: accepted.len(),
                level: if stop == StopReason::QuorumReached {
                    ResolutionLevel::Quorum
                } else {
                    ResolutionLevel::Partial
                },
            },
            None => EnsembleOutcome::unavailable(dispatched.elapsed()),
        };

        if stop == StopReason::CeilingElapsed {
            warn!(
                ceiling_ms = self.settings.ceiling.as_millis() as u64,
                responders = accepted.len(),
                quorum = self.settings.quorum,
                "ensemble ceiling elapsed before quorum"
            );
        }
        info!(
            level = %outcome.level,
            provider = %outcome.source_backend,
            responders = outcome.responders,
            panel = self.panel.len(),
            elapsed_ms = dispatched.elapsed().as_millis() as u64,
            "ensemble resolved"
        );

        outcome
    }
}

/// Turn an arrival into a candidate if it counts toward quorum.
fn admit(arrival: Arrival) -> Option<Candidate> {
    let latency_ms = arrival.latency.as_millis() as u64;
    match arrival.raced {
        Raced::Finished(Ok(content)) if !content.trim().is_empty() => {
            debug!(provider = %arrival.provider, latency_ms, chars = content.chars().count(), "provider responded");
            Some(Candidate {
                provider: arrival.provider,
                content,
                latency: arrival.latency,
            })
        }
        Raced::Finished(Ok(_)) => {
            debug!(provider = %arrival.provider, latency_ms, "empty response ignored");
            None
        }
        Raced::Finished(Err(e)) => {
            warn!(provider = %arrival.provider, latency_ms, error = %e, "provider failed");
            None
        }
        Raced::TimedOut => {
            warn!(provider = %arrival.provider, latency_ms, "provider exceeded its deadline");
            None
        }
        Raced::Aborted(reason) => {
            warn!(provider = %arrival.provider, latency_ms, reason = %reason, "provider call aborted");
            None
        }
    }
}

#[async_trait]
impl Compete for EnsembleResolver {
    async fn compete(&self, prompt: &str, system: &str) -> Result<EnsembleOutcome, EnsembleError> {
        Ok(self.resolve(prompt, system).await)
    }
}
