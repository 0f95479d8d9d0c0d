//! Lex Pipeline - claim-grounded legal document generation
//!
//! Five sequential stages connected by typed outputs:
//!
//! - **Planner**: outline, claims and retrieval instructions
//! - **Retriever**: resolves each claim against official sources on a bounded
//!   worker pool, redacting personal data before acceptance
//! - **Drafter**: binds supported claims to sections, then renders prose
//! - **Verifier**: guardrails plus RAG scores decide approval
//! - **Finalizer**: trazabilidad over exactly the cited sources
//!
//! # Architecture
//!
//! ```text
//! GenerationRequest → Planner → Retriever → Drafter → Verifier → Finalizer
//!                                   ↑
//!                     ToolRegistry → CachedFetcher → SourceFetcher
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_pipeline::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let collaborators = Collaborators::offline(Arc::new(CorpusFetcher::builtin()?));
//! let pipeline = Pipeline::new(PipelineConfig::default(), collaborators)?;
//!
//! let request = GenerationRequest::new("memorando", "responsabilidad civil extracontractual");
//! let response = pipeline
//!     .run(&request, &Caller::new("analista"), &CancelToken::new())
//!     .await?;
//! println!("{}", response.texto_final);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod cancel;
pub mod collaborators;
pub mod config;
pub mod defaults;
pub mod drafter;
pub mod error;
pub mod finalizer;
pub mod pipeline;
pub mod planner;
pub mod redactor;
pub mod registry;
pub mod retriever;
mod retry;
pub mod verifier;

pub use cache::{CacheStats, CachedFetcher};
pub use cancel::{CancelOnDrop, CancelToken};
pub use collaborators::{
    BriefClaim, BriefSource, Collaborators, PlanModel, PlanProposal, ProposedClaim, Redaction, Redactor,
    Renderer, Scorer, ScoringInput, SectionBrief, SourceFetcher,
};
pub use config::{CacheConfig, PipelineConfig};
pub use drafter::Drafter;
pub use error::{
    CollaboratorError, ConfigError, CorpusError, DrafterError, FetchError, PipelineError, PlannerError,
    RedactionError, VerifierError,
};
pub use finalizer::{Finalizer, RunContext, StageOutputs};
pub use pipeline::{Caller, Pipeline, PipelineResponse};
pub use planner::Planner;
pub use redactor::PatternRedactor;
pub use registry::{LegalTool, ToolRegistry};
pub use retriever::Retriever;
pub use verifier::{Guardrail, VerificationContext, Verifier};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::collaborators::{Collaborators, SourceFetcher};
    pub use crate::config::PipelineConfig;
    pub use crate::defaults::CorpusFetcher;
    pub use crate::error::PipelineError;
    pub use crate::pipeline::{Caller, Pipeline, PipelineResponse};
    pub use lex_core::prelude::*;
    pub use std::sync::Arc;
}
