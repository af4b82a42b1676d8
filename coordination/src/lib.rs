//! Coordination primitives for multi-provider text generation.
//!
//! This library provides:
//! - The backend capability every text-generation provider implements
//! - A deadline race that never cancels the raced call
//! - Quorum-based ensemble resolution across a panel of backends
//!
//! # Modules
//!
//! | Module     | Purpose                                                  |
//! |------------|----------------------------------------------------------|
//! | `backend`  | `TextBackend` trait and `ProviderError`                  |
//! | `race`     | `with_deadline` — call vs. deadline, fire-and-forget     |
//! | `ensemble` | `EnsembleResolver` — quorum / ceiling / longest-content  |
//!
//! # Usage
//!
//! ```rust,ignore
//! use coordination::ensemble::{EnsembleResolver, EnsembleSettings};
//!
//! let resolver = EnsembleResolver::new(panel, EnsembleSettings::default())?;
//! let outcome = resolver.resolve("Summarize the plan", "Be concise.").await;
//! println!("{} answered in {}ms", outcome.source_backend, outcome.latency_ms);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod backend;
pub mod ensemble;
pub mod race;

pub use backend::{ProviderError, SharedBackend, TextBackend};
pub use ensemble::{
    Compete, EnsembleError, EnsembleOutcome, EnsembleResolver, EnsembleSettings, ResolutionLevel,
    NO_PROVIDER,
};
pub use race::{with_deadline, Raced};
