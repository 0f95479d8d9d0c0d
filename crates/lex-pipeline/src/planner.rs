//! Planner stage
//!
//! Turns a request into an outline and a list of claims, each with the
//! retrieval instructions it needs. The plan model proposes; the planner
//! enforces the claim contract, assigns ids and flags risks.

use crate::cancel::CancelToken;
use crate::collaborators::{PlanModel, PlanProposal};
use crate::config::PipelineConfig;
use crate::error::{CollaboratorError, PlannerError};
use crate::retry::{with_retries, GaveUp};
use lex_core::text::normalize;
use lex_core::{Claim, ClaimId, GenerationRequest, ModelError, PlannerOutput, RiskCategory, StyleContract};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Normalized keywords that flag each risk category
const RISK_KEYWORDS: &[(RiskCategory, &[&str])] = &[
    (RiskCategory::Confidencialidad, &["confidencial", "reserva", "secreto profesional"]),
    (RiskCategory::DatosPersonales, &["datos personales", "habeas data", "dato personal"]),
    (RiskCategory::MenoresDeEdad, &["menor de edad", "menores", "nino", "adolescente"]),
    (RiskCategory::VigenciaNormativa, &["derog", "vigencia", "modific"]),
    (RiskCategory::ConflictoDeIntereses, &["conflicto de interes"]),
];

/// Risk checks performed on every document
const ALWAYS_CHECKED: [RiskCategory; 2] = [RiskCategory::DatosPersonales, RiskCategory::VigenciaNormativa];

/// Audiences addressed in plain register
const LAY_AUDIENCES: &[&str] = &["cliente", "gerencia", "junta", "directiva", "publico"];

/// Risk categories whose keywords occur in `text`
#[must_use]
pub fn flag_risks(text: &str) -> BTreeSet<RiskCategory> {
    // Keywords match at word starts, so "derog" covers "derogada".
    let norm = format!(" {}", normalize(text));
    RISK_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| norm.contains(&format!(" {w}"))))
        .map(|(risk, _)| *risk)
        .collect()
}

/// Planning stage
#[derive(Clone)]
pub struct Planner {
    model: Arc<dyn PlanModel>,
    config: Arc<PipelineConfig>,
}

impl Planner {
    /// Create planner
    #[must_use]
    pub fn new(model: Arc<dyn PlanModel>, config: Arc<PipelineConfig>) -> Self {
        Self { model, config }
    }

    /// Plan a document for `request`
    ///
    /// # Errors
    /// Input errors for a malformed or underspecified request, contract
    /// violations for an unusable proposal, [`PlannerError::NoClaims`] and
    /// [`PlannerError::Collaborator`] when the plan model is unreachable.
    #[tracing::instrument(skip_all, fields(stage = "planner"))]
    pub async fn plan(&self, request: &GenerationRequest, cancel: &CancelToken) -> Result<PlannerOutput, PlannerError> {
        request.validate()?;

        let model = &self.model;
        let proposal = with_retries(
            &self.config,
            self.config.collaborator_retries,
            cancel,
            "plan_model",
            || model.propose(request),
        )
        .await
        .map_err(|e| match e {
            GaveUp::Failed(CollaboratorError::InsufficientInput(msg)) => PlannerError::InsufficientInput(msg),
            GaveUp::Failed(e) => PlannerError::Collaborator(e),
            GaveUp::Cancelled => PlannerError::Cancelled,
        })?;

        let output = build_output(request, proposal)?;
        tracing::info!(
            sections = output.outline.len(),
            claims = output.claims.len(),
            risks = output.risk_checks.len(),
            "plan ready"
        );
        Ok(output)
    }
}

/// Check a proposal against the claim contract and build the plan
///
/// # Errors
/// See [`Planner::plan`].
pub fn build_output(request: &GenerationRequest, proposal: PlanProposal) -> Result<PlannerOutput, PlannerError> {
    if proposal.outline.is_empty() {
        return Err(PlannerError::InsufficientInput("el plan no contiene secciones".into()));
    }
    let mut section_ids = HashSet::new();
    for section in &proposal.outline {
        if section.titulo.trim().is_empty() {
            return Err(PlannerError::ContractViolation(format!("sección {} sin título", section.id)));
        }
        if !section_ids.insert(section.id.clone()) {
            return Err(PlannerError::ContractViolation(format!("sección {} duplicada", section.id)));
        }
    }
    if proposal.claims.is_empty() {
        return Err(PlannerError::NoClaims);
    }

    let mut claims = Vec::with_capacity(proposal.claims.len());
    for (i, proposed) in proposal.claims.into_iter().enumerate() {
        let id = ClaimId::sequential(i + 1);
        if proposed.texto.trim().is_empty() {
            return Err(PlannerError::ContractViolation(format!("{id} sin texto")));
        }
        if !section_ids.contains(&proposed.seccion) {
            return Err(PlannerError::ContractViolation(format!(
                "{id} referencia la sección inexistente {}",
                proposed.seccion
            )));
        }
        let riesgos = flag_risks(&proposed.texto);
        let claim = Claim::new(id, proposed.texto.trim(), proposed.seccion, proposed.rol, proposed.required_sources)
            .map_err(|e| match e {
                ModelError::EmptySources(id) => {
                    PlannerError::ContractViolation(format!("{id} no declara fuentes requeridas"))
                }
                other => PlannerError::Input(other),
            })?
            .with_riesgos(riesgos);
        claims.push(claim);
    }

    let mut risk_checks: BTreeSet<RiskCategory> = ALWAYS_CHECKED.into_iter().collect();
    for claim in &claims {
        risk_checks.extend(claim.riesgos().iter().copied());
    }
    for restriccion in &request.restricciones {
        risk_checks.extend(flag_risks(restriccion));
    }

    let audiencia = request.audiencia_or_default().to_string();
    Ok(PlannerOutput {
        objetivo: request.objetivo.trim().to_string(),
        titulo: proposal.titulo,
        outline: proposal.outline,
        claims,
        estilo: style_contract(&audiencia, &request.restricciones),
        audiencia,
        risk_checks,
    })
}

fn style_contract(audiencia: &str, restricciones: &[String]) -> StyleContract {
    let norm = normalize(audiencia);
    let registro = if LAY_AUDIENCES.iter().any(|a| norm.contains(a)) {
        "formal divulgativo"
    } else {
        "formal técnico"
    };
    StyleContract {
        audiencia: audiencia.to_string(),
        registro: registro.to_string(),
        restricciones: restricciones
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect(),
        ..StyleContract::default()
    }
}
