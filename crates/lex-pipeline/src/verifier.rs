//! Verifier stage
//!
//! Runs an ordered set of [`Guardrail`]s over the draft, asks the [`Scorer`]
//! for RAG scores, and approves iff every guardrail passes and faithfulness
//! reaches the configured threshold. Rejection is data, never an error.

use crate::cancel::CancelToken;
use crate::collaborators::{Scorer, ScoringInput};
use crate::config::PipelineConfig;
use crate::drafter::CAVEAT;
use crate::error::VerifierError;
use crate::retry::{with_retries, GaveUp};
use lex_core::citation::extract_citations;
use lex_core::pii::{self, PiiKind};
use lex_core::text::contains_normalized;
use lex_core::{Claim, ClaimId, DrafterOutput, GenerationRequest, GuardrailCheck, SourceCatalog, VerifierOutput};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Everything a guardrail may inspect
#[derive(Debug, Clone, Copy)]
pub struct VerificationContext<'a> {
    /// Original request
    pub request: &'a GenerationRequest,
    /// Draft under verification
    pub draft: &'a DrafterOutput,
    /// Resolved claims
    pub claims: &'a [Claim],
    /// Retrieved sources
    pub fuentes: &'a SourceCatalog,
}

/// A pass/fail rule applied to a draft
pub trait Guardrail: Send + Sync {
    /// Name reported in the check
    fn nombre(&self) -> &'static str;

    /// Evaluate the draft
    fn check(&self, ctx: &VerificationContext<'_>) -> GuardrailCheck;
}

/// Every in-text citation resolves to a retrieved source
#[derive(Debug, Clone, Copy, Default)]
pub struct CitasResueltas;

impl Guardrail for CitasResueltas {
    fn nombre(&self) -> &'static str {
        "citas_resueltas"
    }

    fn check(&self, ctx: &VerificationContext<'_>) -> GuardrailCheck {
        let cited = extract_citations(&ctx.draft.texto_completo);
        let dangling: Vec<String> = cited
            .iter()
            .filter(|id| !ctx.fuentes.contains(id))
            .map(ToString::to_string)
            .collect();
        if dangling.is_empty() {
            GuardrailCheck::pass(self.nombre(), format!("{} cita(s) resueltas", cited.len()))
        } else {
            GuardrailCheck::fail(self.nombre(), format!("citas sin fuente recuperada: {}", dangling.join(", ")))
        }
    }
}

/// No personal-data pattern remains in the text
#[derive(Debug, Clone, Copy, Default)]
pub struct SinPii;

impl Guardrail for SinPii {
    fn nombre(&self) -> &'static str {
        "sin_pii"
    }

    fn check(&self, ctx: &VerificationContext<'_>) -> GuardrailCheck {
        let found = pii::detect(&ctx.draft.texto_completo);
        if found.is_empty() {
            return GuardrailCheck::pass(self.nombre(), "sin datos personales detectados");
        }
        let mut counts: BTreeMap<PiiKind, usize> = BTreeMap::new();
        for m in &found {
            *counts.entry(m.kind).or_default() += 1;
        }
        let resumen: Vec<String> = counts.iter().map(|(k, n)| format!("{k}: {n}")).collect();
        GuardrailCheck::fail(self.nombre(), format!("datos personales detectados ({})", resumen.join(", ")))
    }
}

/// Used claims carry all their citations; excluded claims stay out of
/// uncaveated sections
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsCitados;

impl Guardrail for ClaimsCitados {
    fn nombre(&self) -> &'static str {
        "claims_citados"
    }

    fn check(&self, ctx: &VerificationContext<'_>) -> GuardrailCheck {
        let by_id: HashMap<&ClaimId, &Claim> = ctx.claims.iter().map(|c| (c.id(), c)).collect();
        let mut problemas = Vec::new();

        for section in &ctx.draft.secciones {
            let cited = extract_citations(&section.texto);
            for claim_id in &section.claims_usados {
                let Some(claim) = by_id.get(claim_id) else {
                    problemas.push(format!("{claim_id} desconocido en {}", section.id));
                    continue;
                };
                if !claim.is_supported() {
                    problemas.push(format!("{claim_id} sin soporte usado en {}", section.id));
                }
                for fuente in claim.fuentes().iter().filter(|f| !cited.contains(*f)) {
                    problemas.push(format!("{claim_id} sin cita de {fuente} en {}", section.id));
                }
            }
        }

        for excluido in &ctx.draft.claims_excluidos {
            for section in ctx.draft.secciones.iter().filter(|s| !s.advertencia) {
                if contains_normalized(&section.texto, &excluido.texto) {
                    problemas.push(format!(
                        "{} excluido aparece sin advertencia en {}",
                        excluido.claim_id, section.id
                    ));
                }
            }
        }

        if problemas.is_empty() {
            let usados: usize = ctx.draft.secciones.iter().map(|s| s.claims_usados.len()).sum();
            GuardrailCheck::pass(self.nombre(), format!("{usados} claim(s) usados con cita"))
        } else {
            GuardrailCheck::fail(self.nombre(), problemas.join("; "))
        }
    }
}

/// Sections without citations carry an explicit caveat
#[derive(Debug, Clone, Copy, Default)]
pub struct SeccionesConAdvertencia;

impl Guardrail for SeccionesConAdvertencia {
    fn nombre(&self) -> &'static str {
        "secciones_con_advertencia"
    }

    fn check(&self, ctx: &VerificationContext<'_>) -> GuardrailCheck {
        let problemas: Vec<String> = ctx
            .draft
            .secciones
            .iter()
            .filter_map(|s| {
                let sin_citas = extract_citations(&s.texto).is_empty();
                if sin_citas && !s.advertencia {
                    Some(format!("{} sin citas ni advertencia", s.id))
                } else if s.advertencia && !s.texto.contains(CAVEAT) {
                    Some(format!("{} marcada sin texto de advertencia", s.id))
                } else {
                    None
                }
            })
            .collect();
        if problemas.is_empty() {
            let n = ctx.draft.secciones.iter().filter(|s| s.advertencia).count();
            GuardrailCheck::pass(self.nombre(), format!("{n} sección(es) con advertencia explícita"))
        } else {
            GuardrailCheck::fail(self.nombre(), problemas.join("; "))
        }
    }
}

/// The document cites at least one source
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenciaMinima;

impl Guardrail for EvidenciaMinima {
    fn nombre(&self) -> &'static str {
        "evidencia_minima"
    }

    fn check(&self, ctx: &VerificationContext<'_>) -> GuardrailCheck {
        let n = extract_citations(&ctx.draft.texto_completo).len();
        if n > 0 {
            GuardrailCheck::pass(self.nombre(), format!("{n} fuente(s) citadas"))
        } else {
            GuardrailCheck::fail(self.nombre(), "el documento no cita ninguna fuente oficial")
        }
    }
}

/// Built-in guardrails in evaluation order
#[must_use]
pub fn default_guardrails() -> Vec<Arc<dyn Guardrail>> {
    vec![
        Arc::new(CitasResueltas),
        Arc::new(SinPii),
        Arc::new(ClaimsCitados),
        Arc::new(SeccionesConAdvertencia),
        Arc::new(EvidenciaMinima),
    ]
}

/// Verification stage
#[derive(Clone)]
pub struct Verifier {
    guardrails: Vec<Arc<dyn Guardrail>>,
    scorer: Arc<dyn Scorer>,
    config: Arc<PipelineConfig>,
}

impl Verifier {
    /// Create verifier with the built-in guardrails
    #[must_use]
    pub fn new(scorer: Arc<dyn Scorer>, config: Arc<PipelineConfig>) -> Self {
        Self {
            guardrails: default_guardrails(),
            scorer,
            config,
        }
    }

    /// With an additional guardrail, evaluated after the existing ones
    #[must_use]
    pub fn with_guardrail(mut self, guardrail: Arc<dyn Guardrail>) -> Self {
        self.guardrails.push(guardrail);
        self
    }

    /// Names of registered guardrails, in order
    #[must_use]
    pub fn guardrail_names(&self) -> Vec<&'static str> {
        self.guardrails.iter().map(|g| g.nombre()).collect()
    }

    /// Evaluate every guardrail
    #[must_use]
    pub fn check_guardrails(&self, ctx: &VerificationContext<'_>) -> Vec<GuardrailCheck> {
        self.guardrails.iter().map(|g| g.check(ctx)).collect()
    }

    /// Verify a draft
    ///
    /// # Errors
    /// Returns [`VerifierError::Collaborator`] if the scorer stays unreachable
    /// beyond the retry budget, or [`VerifierError::Cancelled`].
    #[tracing::instrument(skip_all, fields(stage = "verifier"))]
    pub async fn verify(
        &self,
        ctx: &VerificationContext<'_>,
        cancel: &CancelToken,
    ) -> Result<VerifierOutput, VerifierError> {
        let guardrails = self.check_guardrails(ctx);

        let input = ScoringInput {
            request: ctx.request,
            draft: ctx.draft,
            fuentes: ctx.fuentes,
        };
        let scorer = &self.scorer;
        let evaluacion = with_retries(
            &self.config,
            self.config.collaborator_retries,
            cancel,
            "scorer",
            || scorer.score(&input),
        )
        .await
        .map_err(|e| match e {
            GaveUp::Cancelled => VerifierError::Cancelled,
            GaveUp::Failed(e) => VerifierError::Collaborator(e),
        })?
        .clamped();

        let mut observaciones: Vec<String> = guardrails
            .iter()
            .filter(|g| !g.passed)
            .map(|g| format!("{}: {}", g.nombre, g.detalle))
            .collect();
        let threshold = self.config.faithfulness_threshold;
        if evaluacion.faithfulness < threshold {
            observaciones.push(format!(
                "faithfulness {:.2} por debajo del umbral {threshold:.2}",
                evaluacion.faithfulness
            ));
        }
        let aprobado = observaciones.is_empty();

        tracing::info!(
            aprobado,
            faithfulness = evaluacion.faithfulness,
            failed = guardrails.iter().filter(|g| !g.passed).count(),
            "verification complete"
        );
        Ok(VerifierOutput {
            guardrails,
            evaluacion,
            aprobado,
            observaciones,
        })
    }
}
