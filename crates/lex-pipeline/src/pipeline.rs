//! Orchestrator
//!
//! Runs Planner → Retriever → Drafter → Verifier → Finalizer sequentially
//! under one global deadline. Every stage outcome is appended to the run's
//! hash-chained log. When the deadline fires the run still answers, with an
//! INCOMPLETO trazabilidad built from whatever stages finished.

use crate::cancel::CancelToken;
use crate::collaborators::Collaborators;
use crate::config::PipelineConfig;
use crate::drafter::Drafter;
use crate::error::{ConfigError, DrafterError, PipelineError, PlannerError, VerifierError};
use crate::finalizer::{Finalizer, RunContext, StageOutputs};
use crate::planner::Planner;
use crate::retriever::Retriever;
use crate::verifier::{VerificationContext, Verifier};
use lex_core::{
    AuditLog, Claim, DrafterOutput, FinalizerOutput, GenerationRequest, PlannerOutput, RetrieverOutput, RunId,
    Stage, VerifierOutput,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::Instrument;

/// Identity of whoever requested a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    /// Caller identifier as presented at the boundary
    pub id: String,
    /// Whether the boundary authorized the caller
    pub autorizado: bool,
}

impl Caller {
    /// Authorized caller
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            autorizado: true,
        }
    }
}

/// Aggregate result of a run; stage fields are `None` when not reached
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    /// Plan
    pub planner: Option<PlannerOutput>,
    /// Retrieval
    pub retriever: Option<RetrieverOutput>,
    /// Draft
    pub drafter: Option<DrafterOutput>,
    /// Verification
    pub verifier: Option<VerifierOutput>,
    /// Trazabilidad and completion
    pub finalizer: FinalizerOutput,
    /// Final document text, empty when drafting was not reached
    pub texto_final: String,
}

impl PipelineResponse {
    /// Whether the document is COMPLETO
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.finalizer.completion.is_complete()
    }
}

enum Race<T> {
    Done(T),
    Expired,
    Cancelled,
}

async fn race<T>(deadline: Instant, cancel: &CancelToken, stage: impl Future<Output = T>) -> Race<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Race::Cancelled,
        () = tokio::time::sleep_until(deadline) => Race::Expired,
        out = stage => Race::Done(out),
    }
}

/// The document generation pipeline
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    planner: Planner,
    retriever: Retriever,
    drafter: Drafter,
    verifier: Verifier,
    finalizer: Finalizer,
}

impl Pipeline {
    /// Build the pipeline from explicit configuration and collaborators
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the configuration is out of range.
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = Arc::new(config);
        let tools = Arc::new(collaborators.tools.cached(&config.cache));
        tracing::debug!(tools = ?tools.tools(), cache = config.cache.enabled, "pipeline assembled");
        Ok(Self {
            planner: Planner::new(collaborators.plan_model, Arc::clone(&config)),
            retriever: Retriever::new(tools, collaborators.redactor, Arc::clone(&config)),
            drafter: Drafter::new(collaborators.renderer, Arc::clone(&config)),
            verifier: Verifier::new(collaborators.scorer, Arc::clone(&config)),
            finalizer: Finalizer::new(Arc::clone(&config)),
            config,
        })
    }

    /// Replace the verifier, e.g. to register extra guardrails
    #[must_use]
    pub fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage for `request`
    ///
    /// # Errors
    /// Input errors, fatal collaborator failures and cancellation. A global
    /// timeout is not an error: it yields an INCOMPLETO response.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        caller: &Caller,
        cancel: &CancelToken,
    ) -> Result<PipelineResponse, PipelineError> {
        request.validate()?;
        let ctx = RunContext {
            run_id: RunId::generate(),
            caller: caller.clone(),
        };
        let span = tracing::info_span!("pipeline", run_id = %ctx.run_id, caller = %caller.id);
        self.run_stages(request, &ctx, cancel).instrument(span).await
    }

    async fn run_stages(
        &self,
        request: &GenerationRequest,
        ctx: &RunContext,
        cancel: &CancelToken,
    ) -> Result<PipelineResponse, PipelineError> {
        let deadline = Instant::now() + self.config.pipeline_timeout();
        let mut log = AuditLog::new();
        log.append(
            Stage::Pipeline,
            "inicio",
            format!("solicitante {}; plazo {} ms", ctx.caller.id, self.config.pipeline_timeout_ms),
        );

        let plan = match race(deadline, cancel, self.planner.plan(request, cancel)).await {
            Race::Done(Ok(plan)) => plan,
            Race::Done(Err(PlannerError::Cancelled)) | Race::Cancelled => return Err(PipelineError::Cancelled),
            Race::Done(Err(e)) => {
                tracing::warn!(error = %e, "planning failed");
                return Err(e.into());
            }
            Race::Expired => return Ok(self.partial(None, None, None, Stage::Planner, ctx, log)),
        };
        log.append(
            Stage::Planner,
            "plan",
            format!("{} secciones; {} claims", plan.outline.len(), plan.claims.len()),
        );

        let retrieval = match race(deadline, cancel, self.retriever.resolve(&plan.claims, cancel)).await {
            Race::Done(retrieval) => retrieval,
            Race::Cancelled => return Err(PipelineError::Cancelled),
            Race::Expired => return Ok(self.partial(Some(plan), None, None, Stage::Retriever, ctx, log)),
        };
        log.append(
            Stage::Retriever,
            "recuperacion",
            format!(
                "{}/{} claims con soporte; {} fuentes",
                retrieval.supported_count(),
                retrieval.resultados.len(),
                retrieval.fuentes.len()
            ),
        );

        let claims: Vec<Claim> = plan
            .claims
            .iter()
            .map(|c| match retrieval.result_for(c.id()) {
                Some(r) => c.clone().resolve(&r.resolucion),
                None => c.clone(),
            })
            .collect();

        let draft = match race(deadline, cancel, self.drafter.draft(&plan, &claims, &retrieval.fuentes, cancel)).await {
            Race::Done(Ok(draft)) => draft,
            Race::Done(Err(DrafterError::Cancelled)) | Race::Cancelled => return Err(PipelineError::Cancelled),
            Race::Done(Err(e)) => {
                tracing::warn!(error = %e, "drafting failed");
                return Err(e.into());
            }
            Race::Expired => {
                return Ok(self.partial(Some(plan), Some(retrieval), None, Stage::Drafter, ctx, log));
            }
        };
        log.append(
            Stage::Drafter,
            "borrador",
            format!(
                "{} secciones; {} con advertencia; {} claims excluidos",
                draft.secciones.len(),
                draft.secciones.iter().filter(|s| s.advertencia).count(),
                draft.claims_excluidos.len()
            ),
        );

        let verification_ctx = VerificationContext {
            request,
            draft: &draft,
            claims: &claims,
            fuentes: &retrieval.fuentes,
        };
        let verification = match race(deadline, cancel, self.verifier.verify(&verification_ctx, cancel)).await {
            Race::Done(Ok(v)) => v,
            Race::Done(Err(VerifierError::Cancelled)) | Race::Cancelled => return Err(PipelineError::Cancelled),
            Race::Done(Err(e)) => {
                tracing::warn!(error = %e, "verification failed");
                return Err(e.into());
            }
            Race::Expired => {
                return Ok(self.partial(Some(plan), Some(retrieval), Some(draft), Stage::Verifier, ctx, log));
            }
        };
        log.append(
            Stage::Verifier,
            "verificacion",
            format!(
                "aprobado {}; faithfulness {:.2}",
                verification.aprobado, verification.evaluacion.faithfulness
            ),
        );

        let finalizer = self
            .finalizer
            .finalize(&plan, &retrieval, &draft, &verification, ctx, log);
        tracing::info!(complete = finalizer.completion.is_complete(), "run finished");

        Ok(PipelineResponse {
            texto_final: draft.texto_completo.clone(),
            planner: Some(plan),
            retriever: Some(retrieval),
            drafter: Some(draft),
            verifier: Some(verification),
            finalizer,
        })
    }

    fn partial(
        &self,
        planner: Option<PlannerOutput>,
        retriever: Option<RetrieverOutput>,
        drafter: Option<DrafterOutput>,
        interrupted: Stage,
        ctx: &RunContext,
        mut log: AuditLog,
    ) -> PipelineResponse {
        tracing::warn!(stage = %interrupted, "global deadline reached, returning partial result");
        log.append(
            Stage::Pipeline,
            "plazo_agotado",
            format!("plazo global agotado durante {interrupted}"),
        );
        let outputs = StageOutputs {
            planner: planner.as_ref(),
            retriever: retriever.as_ref(),
            drafter: drafter.as_ref(),
            verifier: None,
        };
        let finalizer = self.finalizer.finalize_partial(outputs, interrupted, ctx, log);
        PipelineResponse {
            texto_final: drafter.as_ref().map(|d| d.texto_completo.clone()).unwrap_or_default(),
            planner,
            retriever,
            drafter,
            verifier: None,
            finalizer,
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("guardrails", &self.verifier.guardrail_names())
            .finish_non_exhaustive()
    }
}
