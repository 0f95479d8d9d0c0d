//! Drafter stage
//!
//! Binds supported claims to outline sections before any prose is written,
//! then asks the [`Renderer`] for each section's text. Rendered prose is
//! accepted only if it cites exactly within the section's binding and leaks
//! no excluded claim; otherwise the section falls back to the template.

use crate::cancel::CancelToken;
use crate::collaborators::{BriefClaim, BriefSource, Renderer, SectionBrief};
use crate::config::PipelineConfig;
use crate::error::DrafterError;
use crate::retry::{with_retries, GaveUp};
use lex_core::citation::{extract_citations, marker};
use lex_core::text::contains_normalized;
use lex_core::{
    pii, Claim, ClaimStatus, DraftSection, DrafterOutput, ExcludedClaim, ExclusionReason, PlannerOutput,
    RenderOrigin, Section, SourceCatalog,
};
use std::sync::Arc;

/// Caveat written in place of a section without supported claims
pub const CAVEAT: &str = "> **Advertencia:** no fue posible verificar fuentes oficiales para esta sección. \
Su contenido queda pendiente de verificación y no debe utilizarse como fundamento jurídico.";

/// Deterministic rendering of a brief: one cited paragraph per bound claim
#[must_use]
pub fn render_template(brief: &SectionBrief) -> String {
    brief
        .claims
        .iter()
        .map(|claim| {
            let texto = claim.texto.trim().trim_end_matches('.');
            let citas: Vec<String> = claim.fuentes.iter().map(|f| marker(&f.id)).collect();
            format!("{texto} {}.", citas.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Check rendered prose against its brief
///
/// # Errors
/// Returns a description of the first violated rule.
pub fn validate_rendered(prose: &str, brief: &SectionBrief, excluded: &[ExcludedClaim]) -> Result<(), String> {
    if prose.trim().is_empty() {
        return Err("texto vacío".to_string());
    }
    let cited = extract_citations(prose);
    let bound = brief.bound_ids();
    if let Some(stray) = cited.iter().find(|id| !bound.contains(*id)) {
        return Err(format!("cita una fuente no vinculada a la sección: {stray}"));
    }
    for claim in &brief.claims {
        if let Some(missing) = claim.fuentes.iter().find(|f| !cited.contains(&f.id)) {
            return Err(format!("el claim {} no cita la fuente {}", claim.claim_id, missing.id));
        }
    }
    if let Some(leak) = excluded.iter().find(|e| contains_normalized(prose, &e.texto)) {
        return Err(format!("incluye el claim excluido {}", leak.claim_id));
    }
    if pii::contains_pii(prose) {
        return Err("contiene datos personales".to_string());
    }
    Ok(())
}

/// Drafting stage
#[derive(Clone)]
pub struct Drafter {
    renderer: Arc<dyn Renderer>,
    config: Arc<PipelineConfig>,
}

impl Drafter {
    /// Create drafter
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>, config: Arc<PipelineConfig>) -> Self {
        Self { renderer, config }
    }

    /// Draft the document for `plan` from resolved `claims`
    ///
    /// # Errors
    /// Returns [`DrafterError::Collaborator`] if the renderer stays unreachable
    /// beyond the retry budget, or [`DrafterError::Cancelled`].
    #[tracing::instrument(skip_all, fields(stage = "drafter"))]
    pub async fn draft(
        &self,
        plan: &PlannerOutput,
        claims: &[Claim],
        catalog: &SourceCatalog,
        cancel: &CancelToken,
    ) -> Result<DrafterOutput, DrafterError> {
        let (bound, excluded) = bind_claims(claims, catalog);
        let mut secciones = Vec::with_capacity(plan.outline.len());

        for section in &plan.outline {
            if cancel.is_cancelled() {
                return Err(DrafterError::Cancelled);
            }
            let brief = SectionBrief {
                titulo_documento: plan.titulo.clone(),
                seccion: section.clone(),
                claims: bound
                    .iter()
                    .filter(|c| c.0 == section.id)
                    .map(|c| c.1.clone())
                    .collect(),
                estilo: plan.estilo.clone(),
            };
            let rendered = self.render_section(&brief, &excluded, cancel).await?;
            secciones.push(rendered);
        }

        let texto_completo = assemble(&plan.titulo, &secciones);
        tracing::info!(
            sections = secciones.len(),
            caveated = secciones.iter().filter(|s| s.advertencia).count(),
            excluded = excluded.len(),
            citations = extract_citations(&texto_completo).len(),
            "draft assembled"
        );
        Ok(DrafterOutput {
            texto_completo,
            secciones,
            claims_excluidos: excluded,
        })
    }

    async fn render_section(
        &self,
        brief: &SectionBrief,
        excluded: &[ExcludedClaim],
        cancel: &CancelToken,
    ) -> Result<DraftSection, DrafterError> {
        let section = &brief.seccion;
        if brief.is_empty() {
            tracing::debug!(section = %section.id, "no supported claims, writing caveat");
            return Ok(build_section(section, CAVEAT.to_string(), brief, true, RenderOrigin::Plantilla));
        }

        let renderer = &self.renderer;
        let outcome = with_retries(
            &self.config,
            self.config.collaborator_retries,
            cancel,
            "renderer",
            || renderer.render(brief),
        )
        .await;

        let (texto, origen) = match outcome {
            Ok(prose) => match validate_rendered(&prose, brief, excluded) {
                Ok(()) => (prose.trim().to_string(), RenderOrigin::Renderer),
                Err(violation) => {
                    tracing::warn!(section = %section.id, %violation, "rendered prose rejected, using template");
                    (render_template(brief), RenderOrigin::Plantilla)
                }
            },
            Err(GaveUp::Cancelled) => return Err(DrafterError::Cancelled),
            Err(GaveUp::Failed(e)) if e.is_retryable() => {
                return Err(DrafterError::Collaborator {
                    seccion: section.id.to_string(),
                    source: e,
                })
            }
            Err(GaveUp::Failed(e)) => {
                tracing::warn!(section = %section.id, error = %e, "renderer failed, using template");
                (render_template(brief), RenderOrigin::Plantilla)
            }
        };
        Ok(build_section(section, texto, brief, false, origen))
    }
}

/// Split claims into section bindings and exclusions
fn bind_claims(
    claims: &[Claim],
    catalog: &SourceCatalog,
) -> (Vec<(lex_core::SectionId, BriefClaim)>, Vec<ExcludedClaim>) {
    let mut bound = Vec::new();
    let mut excluded = Vec::new();
    for claim in claims {
        let motivo = match claim.status() {
            ClaimStatus::Supported => None,
            ClaimStatus::Unsupported => Some(ExclusionReason::SinSoporte),
            ClaimStatus::Pending => Some(ExclusionReason::Pendiente),
        };
        let fuentes: Option<Vec<BriefSource>> = claim
            .fuentes()
            .iter()
            .map(|id| {
                catalog.get(id).map(|f| BriefSource {
                    id: id.clone(),
                    tipo: f.tipo(),
                    emisor: f.emisor().map(str::to_string),
                    numero: f.numero().map(str::to_string),
                })
            })
            .collect();
        match (motivo, fuentes) {
            (None, Some(fuentes)) if !fuentes.is_empty() => bound.push((
                claim.seccion().clone(),
                BriefClaim {
                    claim_id: claim.id().clone(),
                    texto: claim.texto().to_string(),
                    rol: claim.rol(),
                    fuentes,
                },
            )),
            (motivo, _) => {
                if motivo.is_none() {
                    tracing::warn!(claim_id = %claim.id(), "supported claim cites sources missing from catalog");
                }
                excluded.push(ExcludedClaim {
                    claim_id: claim.id().clone(),
                    seccion: claim.seccion().clone(),
                    rol: claim.rol(),
                    texto: claim.texto().to_string(),
                    motivo: motivo.unwrap_or(ExclusionReason::SinSoporte),
                });
            }
        }
    }
    (bound, excluded)
}

fn build_section(
    section: &Section,
    texto: String,
    brief: &SectionBrief,
    advertencia: bool,
    origen: RenderOrigin,
) -> DraftSection {
    DraftSection {
        id: section.id.clone(),
        titulo: section.titulo.clone(),
        nivel: section.nivel,
        fuentes_citadas: extract_citations(&texto).into_iter().collect(),
        claims_usados: brief.claims.iter().map(|c| c.claim_id.clone()).collect(),
        texto,
        advertencia,
        origen,
    }
}

fn assemble(titulo: &str, secciones: &[DraftSection]) -> String {
    let mut doc = format!("# {titulo}\n");
    for s in secciones {
        doc.push('\n');
        doc.push_str(s.nivel.markdown());
        doc.push(' ');
        doc.push_str(&s.titulo);
        doc.push_str("\n\n");
        doc.push_str(&s.texto);
        doc.push('\n');
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::{ClaimId, ClaimRole, FuenteId, HeadingLevel, SourceKind, StyleContract};

    fn brief() -> SectionBrief {
        SectionBrief {
            titulo_documento: "Memo".into(),
            seccion: Section::new("S1", HeadingLevel::H2, "Marco normativo"),
            claims: vec![BriefClaim {
                claim_id: ClaimId::sequential(1),
                texto: "Todo daño imputable debe ser reparado.".into(),
                rol: ClaimRole::Principal,
                fuentes: vec![
                    BriefSource {
                        id: FuenteId::new("NOR-aaa"),
                        tipo: SourceKind::Norma,
                        emisor: None,
                        numero: None,
                    },
                    BriefSource {
                        id: FuenteId::new("JUR-bbb"),
                        tipo: SourceKind::Jurisprudencia,
                        emisor: None,
                        numero: None,
                    },
                ],
            }],
            estilo: StyleContract::default(),
        }
    }

    fn excluded(texto: &str) -> ExcludedClaim {
        ExcludedClaim {
            claim_id: ClaimId::sequential(9),
            seccion: lex_core::SectionId::new("S1"),
            rol: ClaimRole::Apoyo,
            texto: texto.into(),
            motivo: ExclusionReason::SinSoporte,
        }
    }

    #[test]
    fn template_cites_every_bound_source() {
        let text = render_template(&brief());
        assert_eq!(text, "Todo daño imputable debe ser reparado [F:NOR-aaa] [F:JUR-bbb].");
        assert!(validate_rendered(&text, &brief(), &[]).is_ok());
    }

    #[test]
    fn stray_citation_rejected() {
        let err = validate_rendered("Texto [F:NOR-aaa] [F:JUR-bbb] [F:DOC-zzz].", &brief(), &[]).unwrap_err();
        assert!(err.contains("DOC-zzz"));
    }

    #[test]
    fn missing_citation_rejected() {
        let err = validate_rendered("Texto [F:NOR-aaa].", &brief(), &[]).unwrap_err();
        assert!(err.contains("JUR-bbb"));
    }

    #[test]
    fn excluded_claim_leak_rejected() {
        let prose = "Texto [F:NOR-aaa] [F:JUR-bbb]. Además, la culpa se presume en actividades peligrosas.";
        let err = validate_rendered(prose, &brief(), &[excluded("La culpa se presume en actividades peligrosas")])
            .unwrap_err();
        assert!(err.contains("C9"));
    }

    #[test]
    fn pii_in_prose_rejected() {
        let prose = "Texto [F:NOR-aaa] [F:JUR-bbb]. Escriba a juez@example.com.";
        assert!(validate_rendered(prose, &brief(), &[]).is_err());
    }

    #[test]
    fn empty_prose_rejected() {
        assert!(validate_rendered("  \n", &brief(), &[]).is_err());
    }
}
