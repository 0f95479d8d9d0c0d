//! Deterministic plan model

use crate::collaborators::{PlanModel, PlanProposal, ProposedClaim};
use crate::error::CollaboratorError;
use lex_core::text::content_terms;
use lex_core::{Autoridad, ClaimRole, GenerationRequest, HeadingLevel, RequiredSource, Section, SectionId, SourceKind};

/// Template outline for a legal memo
///
/// Produces a normative framework, a case-law section, an analysis section
/// with one subsection per constraint, and conclusions. The analysis claim
/// needs both a norm and a ruling.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePlanModel;

impl TemplatePlanModel {
    /// Build the proposal synchronously
    ///
    /// # Errors
    /// Returns [`CollaboratorError::InsufficientInput`] when the topic has no
    /// content words.
    pub fn propose_sync(&self, request: &GenerationRequest) -> Result<PlanProposal, CollaboratorError> {
        let tema = request.tema.trim();
        if content_terms(tema).is_empty() {
            return Err(CollaboratorError::InsufficientInput(format!(
                "el tema '{tema}' no contiene términos jurídicos suficientes"
            )));
        }
        let objetivo = request.objetivo.trim();

        let mut outline = vec![
            Section::new("S1", HeadingLevel::H2, "Marco normativo"),
            Section::new("S2", HeadingLevel::H2, "Jurisprudencia relevante"),
            Section::new("S3", HeadingLevel::H2, "Análisis"),
        ];
        let norma = |query: &str| RequiredSource::new(SourceKind::Norma, query, Autoridad::CongresoDeLaRepublica);
        let fallo = |query: &str| RequiredSource::new(SourceKind::Jurisprudencia, query, Autoridad::CorteSupremaDeJusticia);

        let mut claims = vec![
            ProposedClaim {
                texto: format!("El régimen de {tema} en Colombia tiene fundamento en normas de rango legal y constitucional"),
                seccion: SectionId::new("S1"),
                rol: ClaimRole::Principal,
                required_sources: vec![norma(tema)],
            },
            ProposedClaim {
                texto: format!("La jurisprudencia de las altas cortes ha precisado el alcance de {tema}"),
                seccion: SectionId::new("S2"),
                rol: ClaimRole::Principal,
                required_sources: vec![fallo(tema)],
            },
            ProposedClaim {
                texto: format!("El análisis de {tema} exige contrastar la norma aplicable con su interpretación judicial"),
                seccion: SectionId::new("S3"),
                rol: ClaimRole::Principal,
                required_sources: vec![fallo(tema), norma(tema)],
            },
        ];

        for (i, restriccion) in request
            .restricciones
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .enumerate()
        {
            let id = format!("S3.{}", i + 1);
            outline.push(Section::new(id.clone(), HeadingLevel::H3, format!("Consideración: {restriccion}")));
            claims.push(ProposedClaim {
                texto: format!("En relación con {tema}, debe atenderse la siguiente consideración: {restriccion}"),
                seccion: SectionId::new(id),
                rol: ClaimRole::Apoyo,
                required_sources: vec![RequiredSource::new(
                    SourceKind::Doctrina,
                    format!("{tema} {restriccion}"),
                    Autoridad::Academia,
                )],
            });
        }

        outline.push(Section::new("S4", HeadingLevel::H2, "Conclusiones"));
        claims.push(ProposedClaim {
            texto: format!("Las conclusiones de este {objetivo} sobre {tema} se limitan a las fuentes oficiales verificadas"),
            seccion: SectionId::new("S4"),
            rol: ClaimRole::Apoyo,
            required_sources: vec![norma(tema)],
        });

        Ok(PlanProposal {
            titulo: format!("{}: {tema}", capitalize(objetivo)),
            outline,
            claims,
        })
    }
}

#[async_trait::async_trait]
impl PlanModel for TemplatePlanModel {
    async fn propose(&self, request: &GenerationRequest) -> Result<PlanProposal, CollaboratorError> {
        self.propose_sync(request)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
