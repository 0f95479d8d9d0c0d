//! Collaborator contracts consumed by the stages
//!
//! Fetchers, the redactor and the three model-backed capabilities (planning,
//! rendering, scoring) are trait objects injected through [`Collaborators`].
//! The crate ships deterministic offline implementations in
//! [`defaults`](crate::defaults) and [`redactor`](crate::redactor).

use crate::error::{CollaboratorError, FetchError, RedactionError};
use crate::registry::ToolRegistry;
use indexmap::IndexSet;
use lex_core::pii::PiiKind;
use lex_core::{
    ClaimId, ClaimRole, DrafterOutput, FuenteId, GenerationRequest, RawDocument, RequiredSource,
    Section, SectionId, SourceCatalog, SourceKind, StyleContract,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Source of candidate documents for a retrieval instruction
///
/// Implementations must be idempotent; no ordering is assumed across calls.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch candidate documents for `source`
    async fn fetch(&self, source: &RequiredSource) -> Result<Vec<RawDocument>, FetchError>;
}

/// Output of a redaction pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    /// Cleaned text
    pub texto: String,
    /// Whether anything was removed
    pub redacted: bool,
    /// Replacements per category
    pub hallazgos: BTreeMap<PiiKind, usize>,
}

/// Personal-data redaction
#[async_trait::async_trait]
pub trait Redactor: Send + Sync {
    /// Remove personal data from `text`
    async fn redact(&self, text: &str) -> Result<Redaction, RedactionError>;
}

/// A source as presented to the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriefSource {
    /// Id to cite
    pub id: FuenteId,
    /// Source kind
    pub tipo: SourceKind,
    /// Issuing body
    pub emisor: Option<String>,
    /// Document number
    pub numero: Option<String>,
}

/// A supported claim bound to a section, with the only sources it may cite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriefClaim {
    /// Claim id
    pub claim_id: ClaimId,
    /// Assertion text
    pub texto: String,
    /// Role in the section
    pub rol: ClaimRole,
    /// Sources to cite for this claim
    pub fuentes: Vec<BriefSource>,
}

/// Everything the renderer may use for one section
///
/// The claim/source binding is fixed before rendering; the renderer only
/// writes prose around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBrief {
    /// Document title
    pub titulo_documento: String,
    /// Section being rendered
    pub seccion: Section,
    /// Bound claims, in planner order
    pub claims: Vec<BriefClaim>,
    /// Style contract
    pub estilo: StyleContract,
}

impl SectionBrief {
    /// Every source id the section may cite
    #[must_use]
    pub fn bound_ids(&self) -> IndexSet<FuenteId> {
        self.claims
            .iter()
            .flat_map(|c| c.fuentes.iter().map(|f| f.id.clone()))
            .collect()
    }

    /// Whether no claim is bound
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Section id
    #[inline]
    #[must_use]
    pub fn section_id(&self) -> &SectionId {
        &self.seccion.id
    }
}

/// Prose rendering for one section
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Write the section body (without heading) citing only bound sources
    async fn render(&self, brief: &SectionBrief) -> Result<String, CollaboratorError>;
}

/// Inputs to the RAG evaluation
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    /// Original request
    pub request: &'a GenerationRequest,
    /// Draft under evaluation
    pub draft: &'a DrafterOutput,
    /// Retrieved sources
    pub fuentes: &'a SourceCatalog,
}

/// Faithfulness and relevance evaluation
#[async_trait::async_trait]
pub trait Scorer: Send + Sync {
    /// Score a draft against its sources
    async fn score(&self, input: &ScoringInput<'_>) -> Result<lex_core::RagScores, CollaboratorError>;
}

/// A claim as proposed by the plan model, before ids are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedClaim {
    /// Assertion text
    pub texto: String,
    /// Section it belongs to
    pub seccion: SectionId,
    /// Role in the section
    pub rol: ClaimRole,
    /// Retrieval instructions
    pub required_sources: Vec<RequiredSource>,
}

/// Raw plan proposal
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanProposal {
    /// Document title
    pub titulo: String,
    /// Outline sections
    pub outline: Vec<Section>,
    /// Proposed claims
    pub claims: Vec<ProposedClaim>,
}

/// Outline and claim proposal from a request
#[async_trait::async_trait]
pub trait PlanModel: Send + Sync {
    /// Propose an outline and claims for `request`
    async fn propose(&self, request: &GenerationRequest) -> Result<PlanProposal, CollaboratorError>;
}

/// Every collaborator the pipeline needs
#[derive(Clone)]
pub struct Collaborators {
    /// Fetchers per legal tool
    pub tools: ToolRegistry,
    /// Personal-data redaction
    pub redactor: Arc<dyn Redactor>,
    /// Section rendering
    pub renderer: Arc<dyn Renderer>,
    /// RAG scoring
    pub scorer: Arc<dyn Scorer>,
    /// Planning
    pub plan_model: Arc<dyn PlanModel>,
}

impl Collaborators {
    /// Deterministic offline collaborators backed by `fetcher` for every tool
    #[must_use]
    pub fn offline(fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self {
            tools: ToolRegistry::with_fetcher_for_all(fetcher),
            redactor: Arc::new(crate::redactor::PatternRedactor::new()),
            renderer: Arc::new(crate::defaults::TemplateRenderer),
            scorer: Arc::new(crate::defaults::RubricScorer::default()),
            plan_model: Arc::new(crate::defaults::TemplatePlanModel),
        }
    }

    /// With a tool registry
    #[inline]
    #[must_use]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// With a redactor
    #[inline]
    #[must_use]
    pub fn with_redactor(mut self, redactor: Arc<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    /// With a renderer
    #[inline]
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// With a scorer
    #[inline]
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// With a plan model
    #[inline]
    #[must_use]
    pub fn with_plan_model(mut self, plan_model: Arc<dyn PlanModel>) -> Self {
        self.plan_model = plan_model;
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}
