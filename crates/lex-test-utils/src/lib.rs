//! Testing utilities for the Lex workspace
//!
//! Stub collaborators, sample official documents and pipeline builders.

#![allow(missing_docs)]

use lex_core::{
    Autoridad, ClaimRole, GenerationRequest, HeadingLevel, RagScores, RawDocument, RequiredSource, Section,
    SectionId, SourceKind,
};
use lex_pipeline::{
    Caller, CollaboratorError, Collaborators, FetchError, PipelineConfig, Pipeline, PlanModel, PlanProposal,
    ProposedClaim, Renderer, Scorer, ScoringInput, SectionBrief, SourceFetcher,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEMA: &str = "responsabilidad civil extracontractual";

const NORMA_TEXT: &str = "Artículo 2341. El que ha cometido un delito o culpa, que ha inferido daño a otro, \
es obligado a la indemnización, sin perjuicio de la pena principal que la ley imponga por la culpa o el \
delito cometido. Esta regla es el fundamento de la responsabilidad civil extracontractual en el \
ordenamiento colombiano.";

const FALLO_TEXT: &str = "La Sala reitera que la responsabilidad civil extracontractual exige la \
demostración de un hecho dañoso, de un daño cierto, personal y directo, y del nexo de causalidad entre \
uno y otro. El daño eventual o hipotético no es indemnizable, y corresponde al demandante acreditar \
cada uno de estos elementos.";

const DOCTRINA_TEXT: &str = "La doctrina nacional ha sistematizado los elementos de la responsabilidad \
civil extracontractual: conducta, daño, imputación y fundamento del deber de reparar. La reparación \
debe ser integral y comprender tanto los perjuicios patrimoniales como los extrapatrimoniales \
debidamente probados en el proceso.";

pub fn norma_doc() -> RawDocument {
    RawDocument::new("https://normas.example.gov.co/codigo-civil/art-2341", NORMA_TEXT)
        .with_titulo("Código Civil, artículo 2341")
        .with_emisor("Congreso de la República")
        .with_numero("Ley 57 de 1887")
}

pub fn fallo_doc() -> RawDocument {
    RawDocument::new("https://relatoria.example.gov.co/csj/sc-2019-001", FALLO_TEXT)
        .with_titulo("Sentencia de casación sobre el daño indemnizable")
        .with_emisor("Corte Suprema de Justicia")
        .with_numero("SC-2019-001")
        .with_judicial("Sala de Casación Civil", "Magistrada ponente de la Sala")
}

pub fn doctrina_doc() -> RawDocument {
    RawDocument::new("https://doctrina.example.edu.co/tratado-danos", DOCTRINA_TEXT)
        .with_titulo("Tratado de derecho de daños")
        .with_emisor("Academia")
}

pub fn doc_for(kind: SourceKind) -> RawDocument {
    match kind {
        SourceKind::Norma => norma_doc(),
        SourceKind::Jurisprudencia => fallo_doc(),
        SourceKind::Doctrina => doctrina_doc(),
    }
}

/// Returns fixed documents per source kind and counts calls
#[derive(Debug, Default)]
pub struct StubFetcher {
    docs: Vec<(SourceKind, RawDocument)>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves one sample document for every kind
    pub fn complete() -> Self {
        SourceKind::ALL
            .into_iter()
            .fold(Self::new(), |f, kind| f.with(kind, doc_for(kind)))
    }

    pub fn with(mut self, kind: SourceKind, doc: RawDocument) -> Self {
        self.docs.push((kind, doc));
        self
    }

    pub fn without(mut self, kind: SourceKind) -> Self {
        self.docs.retain(|(k, _)| *k != kind);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch(&self, source: &RequiredSource) -> Result<Vec<RawDocument>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .docs
            .iter()
            .filter(|(k, _)| *k == source.tipo())
            .map(|(_, d)| d.clone())
            .collect())
    }
}

/// Never answers within any reasonable budget
#[derive(Debug, Clone, Copy)]
pub struct SleepyFetcher {
    pub delay: Duration,
}

impl SleepyFetcher {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl SourceFetcher for SleepyFetcher {
    async fn fetch(&self, _: &RequiredSource) -> Result<Vec<RawDocument>, FetchError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

/// Always fails with the given error
#[derive(Debug, Clone)]
pub struct FailingFetcher {
    pub error: FetchError,
    calls: Arc<AtomicUsize>,
}

impl FailingFetcher {
    pub fn new(error: FetchError) -> Self {
        Self {
            error,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SourceFetcher for FailingFetcher {
    async fn fetch(&self, _: &RequiredSource) -> Result<Vec<RawDocument>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Returns a fixed proposal
#[derive(Debug, Clone)]
pub struct ScriptedPlanModel {
    pub proposal: PlanProposal,
}

impl ScriptedPlanModel {
    pub fn new(proposal: PlanProposal) -> Self {
        Self { proposal }
    }
}

#[async_trait::async_trait]
impl PlanModel for ScriptedPlanModel {
    async fn propose(&self, _: &GenerationRequest) -> Result<PlanProposal, CollaboratorError> {
        Ok(self.proposal.clone())
    }
}

/// Renders prose citing a source that was never retrieved
#[derive(Debug, Clone, Copy, Default)]
pub struct StrayCitationRenderer;

#[async_trait::async_trait]
impl Renderer for StrayCitationRenderer {
    async fn render(&self, brief: &SectionBrief) -> Result<String, CollaboratorError> {
        Ok(format!(
            "{} [F:NOR-000000000000].",
            brief.claims.first().map_or("Sin contenido", |c| c.texto.as_str())
        ))
    }
}

/// Renderer that always fails
#[derive(Debug, Clone)]
pub struct FailingRenderer(pub CollaboratorError);

#[async_trait::async_trait]
impl Renderer for FailingRenderer {
    async fn render(&self, _: &SectionBrief) -> Result<String, CollaboratorError> {
        Err(self.0.clone())
    }
}

/// Scorer returning fixed scores
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer(pub RagScores);

#[async_trait::async_trait]
impl Scorer for FixedScorer {
    async fn score(&self, _: &ScoringInput<'_>) -> Result<RagScores, CollaboratorError> {
        Ok(self.0)
    }
}

pub fn proposed(texto: &str, seccion: &str, rol: ClaimRole, kinds: &[SourceKind]) -> ProposedClaim {
    ProposedClaim {
        texto: texto.to_string(),
        seccion: SectionId::new(seccion),
        rol,
        required_sources: kinds
            .iter()
            .map(|k| RequiredSource::new(*k, TEMA, Autoridad::default_for(*k)))
            .collect(),
    }
}

/// Two sections: a norm-backed claim and a ruling-backed claim, both primary
pub fn two_claim_proposal() -> PlanProposal {
    PlanProposal {
        titulo: "Memorando: responsabilidad civil extracontractual".to_string(),
        outline: vec![
            Section::new("S1", HeadingLevel::H2, "Marco normativo"),
            Section::new("S2", HeadingLevel::H2, "Jurisprudencia relevante"),
        ],
        claims: vec![
            proposed(
                "Quien cause un daño por culpa está obligado a la indemnización",
                "S1",
                ClaimRole::Principal,
                &[SourceKind::Norma],
            ),
            proposed(
                "El daño indemnizable debe ser cierto, personal y directo",
                "S2",
                ClaimRole::Principal,
                &[SourceKind::Jurisprudencia],
            ),
        ],
    }
}

pub fn request() -> GenerationRequest {
    GenerationRequest::new("memorando", TEMA)
}

pub fn caller() -> Caller {
    Caller::new("analista-pruebas")
}

/// Default configuration with fast retries and no cache
pub fn fast_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_retry_backoff(Duration::from_millis(1))
        .with_cache(lex_pipeline::CacheConfig::disabled())
}

pub fn offline_collaborators(fetcher: Arc<dyn SourceFetcher>) -> Collaborators {
    Collaborators::offline(fetcher)
}

pub fn pipeline(fetcher: Arc<dyn SourceFetcher>) -> Pipeline {
    pipeline_with(fast_config(), offline_collaborators(fetcher))
}

pub fn pipeline_with(config: PipelineConfig, collaborators: Collaborators) -> Pipeline {
    Pipeline::new(config, collaborators).expect("valid test configuration")
}
