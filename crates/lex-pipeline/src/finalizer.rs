//! Finalizer stage
//!
//! Builds the trazabilidad from what the final text actually cites, attaches
//! governance and security attestations, and decides completion.

use crate::config::PipelineConfig;
use crate::pipeline::Caller;
use chrono::{Duration, Utc};
use lex_core::citation::extract_citations;
use lex_core::{
    Attestation, AuditLog, ClaimRole, Completion, ContentHash, ControlAcceso, ControlRegistro,
    ControlRetencion, ControlesSeguridad, DrafterOutput, FinalizerOutput, GestionRiesgoIa,
    MissingElement, PlannerOutput, RetrieverOutput, RunId, SectionId, Stage, TrazaFuente, Trazabilidad,
    VerifierOutput,
};
use std::sync::Arc;

/// Identity of the run being finalized
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Run identifier
    pub run_id: RunId,
    /// Who asked for the document
    pub caller: Caller,
}

/// Outputs available when the global deadline fired
#[derive(Debug, Clone, Copy, Default)]
pub struct StageOutputs<'a> {
    /// Plan, if planning finished
    pub planner: Option<&'a PlannerOutput>,
    /// Retrieval, if it finished
    pub retriever: Option<&'a RetrieverOutput>,
    /// Draft, if it finished
    pub drafter: Option<&'a DrafterOutput>,
    /// Verification, if it finished
    pub verifier: Option<&'a VerifierOutput>,
}

/// Finalization stage
#[derive(Debug, Clone)]
pub struct Finalizer {
    config: Arc<PipelineConfig>,
}

impl Finalizer {
    /// Create finalizer
    #[must_use]
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Finalize a run where every stage completed
    #[tracing::instrument(skip_all, fields(stage = "finalizer", run_id = %ctx.run_id))]
    pub fn finalize(
        &self,
        plan: &PlannerOutput,
        retrieval: &RetrieverOutput,
        draft: &DrafterOutput,
        verifier: &VerifierOutput,
        ctx: &RunContext,
        log: AuditLog,
    ) -> FinalizerOutput {
        let outputs = StageOutputs {
            planner: Some(plan),
            retriever: Some(retrieval),
            drafter: Some(draft),
            verifier: Some(verifier),
        };
        self.build(outputs, None, ctx, log)
    }

    /// Finalize a run interrupted by the global deadline during `interrupted`
    #[tracing::instrument(skip_all, fields(stage = "finalizer", run_id = %ctx.run_id))]
    pub fn finalize_partial(
        &self,
        outputs: StageOutputs<'_>,
        interrupted: Stage,
        ctx: &RunContext,
        log: AuditLog,
    ) -> FinalizerOutput {
        self.build(outputs, Some(interrupted), ctx, log)
    }

    fn build(
        &self,
        outputs: StageOutputs<'_>,
        interrupted: Option<Stage>,
        ctx: &RunContext,
        mut log: AuditLog,
    ) -> FinalizerOutput {
        let texto = outputs.drafter.map_or("", |d| d.texto_completo.as_str());

        // Only sources the text cites and retrieval produced.
        let fuentes: Vec<TrazaFuente> = match outputs.retriever {
            Some(retrieval) => extract_citations(texto)
                .iter()
                .filter_map(|id| retrieval.fuentes.get(id))
                .map(TrazaFuente::from)
                .collect(),
            None => Vec::new(),
        };
        let hashes_evidencia = fuentes.iter().map(|f| f.hash).collect();

        let faltantes = missing_elements(&outputs, interrupted);
        let completion = if faltantes.is_empty() {
            Completion::Completo
        } else {
            Completion::Incompleto { faltantes }
        };

        let detalle = match &completion {
            Completion::Completo => format!("COMPLETO; {} fuente(s) citadas", fuentes.len()),
            Completion::Incompleto { faltantes } => {
                format!("INCOMPLETO; {} elemento(s) faltantes", faltantes.len())
            }
        };
        log.append(Stage::Finalizer, "finalize", detalle);
        let cadena_integra = log.verify_integrity().is_ok();

        let generado_en = Utc::now();
        let retencion = ControlRetencion {
            dias: self.config.retention_days,
            purgar_despues_de: (generado_en + Duration::days(i64::from(self.config.retention_days)))
                .date_naive(),
        };
        let controles_seguridad = ControlesSeguridad {
            control_acceso: ControlAcceso {
                solicitante: ctx.caller.id.clone(),
                autorizado: ctx.caller.autorizado,
            },
            registro: ControlRegistro {
                entradas: log.len(),
                cadena_integra,
            },
            retencion,
        };

        tracing::info!(
            complete = completion.is_complete(),
            cited = fuentes.len(),
            log_entries = log.len(),
            "trazabilidad assembled"
        );

        FinalizerOutput {
            trazabilidad: Trazabilidad {
                run_id: ctx.run_id,
                version_prompt: self.config.version_prompt.clone(),
                version_modelo: self.config.version_modelo.clone(),
                generado_en,
                hash_documento: ContentHash::compute(texto.as_bytes()),
                hashes_evidencia,
                fuentes,
                evaluacion: outputs.verifier.map(|v| v.evaluacion),
                gestion_riesgo_ia: self.attest_risk(&outputs),
                registro: log,
                controles_seguridad,
            },
            completion,
        }
    }

    fn attest_risk(&self, outputs: &StageOutputs<'_>) -> GestionRiesgoIa {
        let govern = Attestation::new(
            true,
            format!(
                "prompt {}, modelo {}, umbral de fidelidad {:.2}",
                self.config.version_prompt, self.config.version_modelo, self.config.faithfulness_threshold
            ),
        );
        let map = match outputs.planner {
            Some(plan) => {
                let riesgos: Vec<String> = plan
                    .risk_checks
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                Attestation::new(true, format!("riesgos revisados: {}", riesgos.join(", ")))
            }
            None => Attestation::new(false, "plan no disponible"),
        };
        let measure = match outputs.verifier {
            Some(v) => Attestation::new(
                true,
                format!(
                    "faithfulness {:.2}, context_relevance {:.2}, answer_relevance {:.2}",
                    v.evaluacion.faithfulness, v.evaluacion.context_relevance, v.evaluacion.answer_relevance
                ),
            ),
            None => Attestation::new(false, "evaluación no ejecutada"),
        };
        let excluidos = outputs.drafter.map_or(0, |d| d.claims_excluidos.len());
        let manage = match outputs.verifier {
            Some(v) => Attestation::new(
                v.aprobado,
                format!(
                    "aprobado: {}; {excluidos} claim(s) excluidos por falta de soporte",
                    if v.aprobado { "sí" } else { "no" }
                ),
            ),
            None => Attestation::new(false, "verificación no ejecutada"),
        };
        GestionRiesgoIa {
            govern,
            map,
            measure,
            manage,
        }
    }
}

fn missing_elements(outputs: &StageOutputs<'_>, interrupted: Option<Stage>) -> Vec<MissingElement> {
    let mut faltantes = Vec::new();
    if let Some(etapa) = interrupted {
        faltantes.push(MissingElement::Tiempo { etapa });
    }

    match outputs.verifier {
        Some(v) if !v.aprobado => faltantes.push(MissingElement::Aprobacion {
            observaciones: v.observaciones.clone(),
        }),
        Some(_) => {}
        None => faltantes.push(MissingElement::Aprobacion {
            observaciones: vec!["verificación no ejecutada".to_string()],
        }),
    }

    if let Some(draft) = outputs.drafter {
        let caveated: Vec<&SectionId> = draft.secciones.iter().filter(|s| s.advertencia).map(|s| &s.id).collect();
        // A section rendered as the caveat lacks every claim planned for it.
        faltantes.extend(
            draft
                .claims_excluidos
                .iter()
                .filter(|e| e.rol == ClaimRole::Principal || caveated.contains(&&e.seccion))
                .map(|e| MissingElement::Claim {
                    claim_id: e.claim_id.clone(),
                    seccion: e.seccion.clone(),
                }),
        );
        faltantes.extend(
            draft
                .secciones
                .iter()
                .filter(|s| s.advertencia)
                .map(|s| MissingElement::Seccion {
                    seccion: s.id.clone(),
                    titulo: s.titulo.clone(),
                }),
        );
    }

    if let Some(plan) = outputs.planner {
        let rendered: Vec<_> = outputs
            .drafter
            .map(|d| d.secciones.iter().map(|s| &s.id).collect())
            .unwrap_or_default();
        faltantes.extend(
            plan.outline
                .iter()
                .filter(|s| !rendered.contains(&&s.id))
                .map(|s| MissingElement::Seccion {
                    seccion: s.id.clone(),
                    titulo: s.titulo.clone(),
                }),
        );
    }
    faltantes
}
