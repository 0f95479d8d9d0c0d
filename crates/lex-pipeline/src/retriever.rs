//! Retriever stage
//!
//! Resolves every claim against official sources. Claims run concurrently on
//! a bounded worker pool; each worker owns its result and a private source
//! catalog, merged in claim order once all workers finish. Timeouts and fetch
//! failures become [`SourceGap`]s, never errors.

use crate::cancel::CancelToken;
use crate::collaborators::Redactor;
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::registry::ToolRegistry;
use crate::retry::{with_retries, GaveUp};
use lex_core::pii;
use lex_core::text::term_coverage;
use lex_core::{
    Claim, ClaimId, ClaimResolution, FuenteOficial, GapReason, RawDocument, RedactionLedger, RedactionReport,
    RequiredSource, RetrieverOutput, RetrieverResult, SourceCatalog, SourceGap,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;

/// What one worker produces for one claim
#[derive(Debug)]
struct ClaimOutcome {
    result: RetrieverResult,
    catalog: SourceCatalog,
}

/// Retrieval stage
#[derive(Clone)]
pub struct Retriever {
    registry: Arc<ToolRegistry>,
    redactor: Arc<dyn Redactor>,
    config: Arc<PipelineConfig>,
}

impl Retriever {
    /// Create retriever
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, redactor: Arc<dyn Redactor>, config: Arc<PipelineConfig>) -> Self {
        Self {
            registry,
            redactor,
            config,
        }
    }

    /// Resolve `claims`, one result per claim in input order
    ///
    /// Dropping the returned future aborts every in-flight worker.
    #[tracing::instrument(skip_all, fields(stage = "retriever", claims = claims.len()))]
    pub async fn resolve(&self, claims: &[Claim], cancel: &CancelToken) -> RetrieverOutput {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_claims));
        let mut workers = JoinSet::new();

        for (idx, claim) in claims.iter().enumerate() {
            let worker = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let claim_id = claim.id().clone();
            let required = claim.required_sources().to_vec();
            let span = tracing::info_span!("claim", claim_id = %claim_id);
            workers.spawn(
                async move {
                    // The semaphore is never closed.
                    let _permit = semaphore.acquire_owned().await.ok();
                    (idx, worker.resolve_claim(claim_id, &required, &cancel).await)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<ClaimOutcome>> = claims.iter().map(|_| None).collect();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => tracing::error!(error = %e, "retrieval worker failed"),
            }
        }

        let mut fuentes = SourceCatalog::new();
        let mut resultados = Vec::with_capacity(claims.len());
        for (claim, slot) in claims.iter().zip(slots) {
            let outcome = slot.unwrap_or_else(|| worker_lost(claim));
            fuentes.extend(outcome.catalog);
            resultados.push(outcome.result);
        }

        let output = RetrieverOutput { resultados, fuentes };
        tracing::info!(
            supported = output.supported_count(),
            sources = output.fuentes.len(),
            "retrieval complete"
        );
        output
    }

    async fn resolve_claim(&self, claim_id: ClaimId, required: &[RequiredSource], cancel: &CancelToken) -> ClaimOutcome {
        let deadline = Instant::now() + self.config.claim_timeout();
        let mut order: Vec<(usize, &RequiredSource)> = required.iter().enumerate().collect();
        order.sort_by_key(|(_, r)| r.prefer().rank());

        let mut catalog = SourceCatalog::new();
        let mut ids = Vec::new();
        let mut gaps = Vec::new();
        let mut ledger = RedactionLedger::default();

        for (indice, entry) in order {
            if cancel.is_cancelled() {
                gaps.push(SourceGap::new(indice, entry, GapReason::Cancelled));
                continue;
            }
            if Instant::now() >= deadline {
                gaps.push(SourceGap::new(indice, entry, GapReason::Timeout));
                continue;
            }
            let attempt = tokio::time::timeout_at(deadline, self.resolve_entry(entry, cancel, &mut ledger)).await;
            match attempt {
                Ok(Ok(fuente)) => {
                    let id = catalog.insert(fuente);
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                Ok(Err(motivo)) => {
                    tracing::debug!(indice, tipo = %entry.tipo(), %motivo, "source gap");
                    gaps.push(SourceGap::new(indice, entry, motivo));
                }
                Err(_) => {
                    tracing::debug!(indice, tipo = %entry.tipo(), "claim budget exhausted");
                    gaps.push(SourceGap::new(indice, entry, GapReason::Timeout));
                }
            }
        }

        let resolucion = if gaps.is_empty() && !ids.is_empty() {
            ClaimResolution::Supported { fuentes: ids }
        } else {
            gaps.sort_by_key(|g| g.indice);
            // Sources found for the other entries are not usable on their own.
            catalog = SourceCatalog::new();
            ClaimResolution::Unsupported { gaps }
        };
        tracing::debug!(supported = resolucion.is_supported(), "claim resolved");

        ClaimOutcome {
            result: RetrieverResult {
                claim_id,
                resolucion,
                redaccion: ledger,
            },
            catalog,
        }
    }

    async fn resolve_entry(
        &self,
        entry: &RequiredSource,
        cancel: &CancelToken,
        ledger: &mut RedactionLedger,
    ) -> Result<FuenteOficial, GapReason> {
        let Some(fetcher) = self.registry.handler_for(entry.tipo()) else {
            return Err(GapReason::NoHandler);
        };
        let fetch_timeout = self.config.fetch_timeout();
        let fetched = with_retries(&self.config, self.config.fetch_retries, cancel, "fetch", move || async move {
            tokio::time::timeout(fetch_timeout, fetcher.fetch(entry))
                .await
                .unwrap_or(Err(FetchError::Timeout))
        })
        .await;

        let docs = match fetched {
            Ok(docs) => docs,
            Err(GaveUp::Cancelled) => return Err(GapReason::Cancelled),
            Err(GaveUp::Failed(FetchError::Timeout)) => return Err(GapReason::Timeout),
            Err(GaveUp::Failed(e)) => {
                return Err(GapReason::FetchError {
                    detalle: e.to_string(),
                })
            }
        };
        if docs.is_empty() {
            return Err(GapReason::NotFound);
        }

        let candidatos = docs.len();
        let mut docs = docs;
        // Stable: preferred issuers first, fetcher order otherwise.
        docs.sort_by_key(|d| !d.emisor.as_deref().is_some_and(|e| entry.prefer().matches(e)));

        let mut acceptable = 0usize;
        for doc in docs {
            if !self.is_acceptable(&doc, entry.query()) {
                continue;
            }
            acceptable += 1;
            match self.redact_verified(&doc).await {
                Ok((texto, report)) => {
                    ledger.record_accepted(report);
                    return Ok(FuenteOficial::from_redacted(entry.tipo(), doc, texto));
                }
                Err(report) => ledger.record_discarded(report),
            }
        }

        if acceptable == 0 {
            Err(GapReason::BelowThreshold { candidatos })
        } else {
            Err(GapReason::RedactionUnverified)
        }
    }

    fn is_acceptable(&self, doc: &RawDocument, query: &str) -> bool {
        let texto = doc.texto.trim();
        if texto.is_empty() || texto.chars().count() < self.config.min_source_chars {
            return false;
        }
        let haystack = match &doc.titulo {
            Some(titulo) => format!("{titulo} {texto}"),
            None => texto.to_string(),
        };
        term_coverage(query, &haystack) >= self.config.min_relevance
    }

    /// Redact and re-scan; the redactor's own claim is not trusted
    async fn redact_verified(&self, doc: &RawDocument) -> Result<(String, RedactionReport), RedactionReport> {
        let mut report = RedactionReport {
            url: doc.url.clone(),
            ..RedactionReport::default()
        };
        match self.redactor.redact(&doc.texto).await {
            Ok(redaction) if !pii::contains_pii(&redaction.texto) => {
                report.redacted = redaction.redacted;
                report.hallazgos = redaction.hallazgos;
                Ok((redaction.texto, report))
            }
            Ok(_) => {
                tracing::warn!(url = %doc.url, "personal data remains after redaction, discarding candidate");
                Err(report)
            }
            Err(e) => {
                tracing::warn!(url = %doc.url, error = %e, "redaction failed, discarding candidate");
                Err(report)
            }
        }
    }
}

fn worker_lost(claim: &Claim) -> ClaimOutcome {
    let gaps = claim
        .required_sources()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            SourceGap::new(
                i,
                r,
                GapReason::FetchError {
                    detalle: "el proceso de recuperación terminó de forma inesperada".into(),
                },
            )
        })
        .collect();
    ClaimOutcome {
        result: RetrieverResult {
            claim_id: claim.id().clone(),
            resolucion: ClaimResolution::Unsupported { gaps },
            redaccion: RedactionLedger::default(),
        },
        catalog: SourceCatalog::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::SourceFetcher;
    use crate::redactor::PatternRedactor;
    use crate::registry::LegalTool;
    use lex_core::{Autoridad, ClaimRole, SectionId, SourceKind};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const BODY: &str = "La responsabilidad civil extracontractual exige un daño cierto, un hecho \
        imputable y un nexo causal entre ambos. Quien cause un daño a otro con culpa está obligado \
        a indemnizarlo conforme a las reglas generales del código civil colombiano vigente.";

    struct Fixed(Vec<RawDocument>);

    #[async_trait::async_trait]
    impl SourceFetcher for Fixed {
        async fn fetch(&self, _: &RequiredSource) -> Result<Vec<RawDocument>, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct Slow;

    #[async_trait::async_trait]
    impl SourceFetcher for Slow {
        async fn fetch(&self, _: &RequiredSource) -> Result<Vec<RawDocument>, FetchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    fn doc(url: &str, texto: &str) -> RawDocument {
        RawDocument::new(url, texto)
    }

    fn claim(n: usize, kinds: &[SourceKind]) -> Claim {
        let required = kinds
            .iter()
            .map(|k| RequiredSource::new(*k, "daño responsabilidad civil", Autoridad::default_for(*k)))
            .collect();
        Claim::new(ClaimId::sequential(n), "El daño debe repararse", SectionId::new("S1"), ClaimRole::Principal, required)
            .unwrap()
    }

    fn retriever(registry: ToolRegistry, config: PipelineConfig) -> Retriever {
        Retriever::new(Arc::new(registry), Arc::new(PatternRedactor::new()), Arc::new(config))
    }

    fn fixed(docs: Vec<RawDocument>) -> Arc<dyn SourceFetcher> {
        Arc::new(Fixed(docs))
    }

    #[tokio::test]
    async fn supported_when_every_entry_resolves() {
        let registry = ToolRegistry::new()
            .with(LegalTool::BuscarNorma, fixed(vec![doc("https://example.org/cc", BODY)]))
            .with(LegalTool::BuscarJurisprudencia, fixed(vec![doc("https://example.org/csj", BODY)]));
        let out = retriever(registry, PipelineConfig::default())
            .resolve(&[claim(1, &[SourceKind::Norma, SourceKind::Jurisprudencia])], &CancelToken::new())
            .await;

        assert_eq!(out.resultados.len(), 1);
        assert_eq!(out.resultados[0].resolucion.fuentes().len(), 2);
        assert_eq!(out.fuentes.len(), 2);
    }

    #[tokio::test]
    async fn missing_handler_is_a_gap() {
        let registry = ToolRegistry::new().with(LegalTool::BuscarNorma, fixed(vec![doc("https://example.org/cc", BODY)]));
        let out = retriever(registry, PipelineConfig::default())
            .resolve(&[claim(1, &[SourceKind::Norma, SourceKind::Jurisprudencia])], &CancelToken::new())
            .await;

        match &out.resultados[0].resolucion {
            ClaimResolution::Unsupported { gaps } => {
                assert_eq!(gaps.len(), 1);
                assert_eq!(gaps[0].motivo, GapReason::NoHandler);
            }
            other => panic!("expected unsupported, got {other:?}"),
        }
        assert!(out.fuentes.is_empty());
    }

    #[tokio::test]
    async fn short_documents_are_below_threshold() {
        let registry = ToolRegistry::new().with(LegalTool::BuscarNorma, fixed(vec![doc("https://example.org/x", "daño")]));
        let out = retriever(registry, PipelineConfig::default())
            .resolve(&[claim(1, &[SourceKind::Norma])], &CancelToken::new())
            .await;
        match &out.resultados[0].resolucion {
            ClaimResolution::Unsupported { gaps } => {
                assert_eq!(gaps[0].motivo, GapReason::BelowThreshold { candidatos: 1 });
            }
            other => panic!("expected unsupported, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn personal_data_is_redacted_before_acceptance() {
        let texto = format!("{BODY} Notificaciones: despacho@juzgado.gov.co");
        let registry = ToolRegistry::new().with(LegalTool::BuscarNorma, fixed(vec![doc("https://example.org/cc", &texto)]));
        let out = retriever(registry, PipelineConfig::default())
            .resolve(&[claim(1, &[SourceKind::Norma])], &CancelToken::new())
            .await;

        let fuente = out.fuentes.iter().next().unwrap();
        assert!(!pii::contains_pii(fuente.texto()));
        assert_eq!(out.resultados[0].redaccion.redactados, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_timeout_becomes_gap() {
        let registry = ToolRegistry::new().with(LegalTool::BuscarNorma, Arc::new(Slow));
        let config = PipelineConfig::default()
            .with_fetch_timeout(Duration::from_millis(50))
            .with_fetch_retries(0);
        let out = retriever(registry, config)
            .resolve(&[claim(1, &[SourceKind::Norma])], &CancelToken::new())
            .await;
        match &out.resultados[0].resolucion {
            ClaimResolution::Unsupported { gaps } => assert_eq!(gaps[0].motivo, GapReason::Timeout),
            other => panic!("expected unsupported, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn results_follow_input_order() {
        let registry = ToolRegistry::with_fetcher_for_all(fixed(vec![doc("https://example.org/cc", BODY)]));
        let claims: Vec<Claim> = (1..=6).map(|n| claim(n, &[SourceKind::Norma])).collect();
        let out = retriever(registry, PipelineConfig::default().with_max_concurrent_claims(2))
            .resolve(&claims, &CancelToken::new())
            .await;

        let ids: Vec<String> = out.resultados.iter().map(|r| r.claim_id.to_string()).collect();
        assert_eq!(ids, vec!["C1", "C2", "C3", "C4", "C5", "C6"]);
        assert_eq!(out.fuentes.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_yields_cancelled_gaps() {
        let registry = ToolRegistry::new().with(LegalTool::BuscarNorma, Arc::new(Slow));
        let cancel = CancelToken::new();
        cancel.cancel();
        let out = retriever(registry, PipelineConfig::default())
            .resolve(&[claim(1, &[SourceKind::Norma])], &cancel)
            .await;
        match &out.resultados[0].resolucion {
            ClaimResolution::Unsupported { gaps } => assert_eq!(gaps[0].motivo, GapReason::Cancelled),
            other => panic!("expected unsupported, got {other:?}"),
        }
    }
}
