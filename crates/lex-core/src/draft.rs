//! Drafter output

use crate::claim::{ClaimId, ClaimRole, SectionId};
use crate::plan::HeadingLevel;
use crate::source::FuenteId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a section's prose was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderOrigin {
    /// Accepted output of the rendering collaborator
    Renderer,
    /// Deterministic template (fallback or caveat)
    Plantilla,
}

/// One rendered outline section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSection {
    /// Outline section id
    pub id: SectionId,
    /// Heading text
    pub titulo: String,
    /// Heading level
    pub nivel: HeadingLevel,
    /// Section prose, without the heading
    pub texto: String,
    /// Source ids cited in `texto`, in order of first citation
    pub fuentes_citadas: Vec<FuenteId>,
    /// Claims bound to this section
    pub claims_usados: Vec<ClaimId>,
    /// Whether the section carries the missing-support caveat
    pub advertencia: bool,
    /// How the prose was produced
    pub origen: RenderOrigin,
}

/// Why a claim was left out of the draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExclusionReason {
    /// Retrieval did not support the claim
    SinSoporte,
    /// The claim was never resolved
    Pendiente,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinSoporte => f.write_str("sin fuente oficial verificada"),
            Self::Pendiente => f.write_str("pendiente de verificación"),
        }
    }
}

/// A claim kept out of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedClaim {
    /// Excluded claim
    pub claim_id: ClaimId,
    /// Section the claim belonged to
    pub seccion: SectionId,
    /// Role it would have had
    pub rol: ClaimRole,
    /// Claim text, kept for guardrail checks only
    pub texto: String,
    /// Reason
    pub motivo: ExclusionReason,
}

/// Result of the drafting stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrafterOutput {
    /// Full Markdown document
    pub texto_completo: String,
    /// Per-section breakdown, in outline order
    pub secciones: Vec<DraftSection>,
    /// Claims left out of the document
    pub claims_excluidos: Vec<ExcludedClaim>,
}

impl DrafterOutput {
    /// Whether any section carries a caveat
    #[must_use]
    pub fn has_caveats(&self) -> bool {
        self.secciones.iter().any(|s| s.advertencia)
    }

    /// Number of distinct sources cited across all sections
    #[must_use]
    pub fn cited_count(&self) -> usize {
        crate::citation::extract_citations(&self.texto_completo).len()
    }
}
