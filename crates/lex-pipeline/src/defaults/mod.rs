//! Deterministic offline collaborators
//!
//! These make the pipeline runnable without network connectors or a language
//! model: a JSON corpus fetcher, a template plan model, a template renderer
//! and a lexical rubric scorer.

mod corpus;
mod plan_model;
mod renderer;
mod scorer;

pub use corpus::{CorpusDocument, CorpusFetcher};
pub use plan_model::TemplatePlanModel;
pub use renderer::TemplateRenderer;
pub use scorer::RubricScorer;
