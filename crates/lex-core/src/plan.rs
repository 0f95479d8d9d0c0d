//! Planner output: outline, claims and style contract

use crate::claim::{Claim, RiskCategory, SectionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Markdown heading level of an outline section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    /// `##`
    H2,
    /// `###`
    H3,
}

impl HeadingLevel {
    /// Markdown prefix
    #[inline]
    #[must_use]
    pub const fn markdown(self) -> &'static str {
        match self {
            Self::H2 => "##",
            Self::H3 => "###",
        }
    }
}

/// One outline section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section identifier
    pub id: SectionId,
    /// Heading level
    pub nivel: HeadingLevel,
    /// Heading text
    pub titulo: String,
}

impl Section {
    /// Create a section
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, nivel: HeadingLevel, titulo: impl Into<String>) -> Self {
        Self {
            id: SectionId::new(id),
            nivel,
            titulo: titulo.into(),
        }
    }

    /// Markdown heading line
    #[must_use]
    pub fn heading(&self) -> String {
        format!("{} {}", self.nivel.markdown(), self.titulo)
    }
}

/// Register and formatting constraints for the drafter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleContract {
    /// Target audience
    pub audiencia: String,
    /// Register ("formal técnico", ...)
    pub registro: String,
    /// Citation marker format
    pub formato_citas: String,
    /// Constraints carried over from the request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricciones: Vec<String>,
}

impl Default for StyleContract {
    fn default() -> Self {
        Self {
            audiencia: crate::request::DEFAULT_AUDIENCIA.to_string(),
            registro: "formal técnico".to_string(),
            formato_citas: "[F:<id>]".to_string(),
            restricciones: Vec::new(),
        }
    }
}

/// Result of the planning stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannerOutput {
    /// Document goal
    pub objetivo: String,
    /// Target audience
    pub audiencia: String,
    /// Document title
    pub titulo: String,
    /// Ordered outline
    pub outline: Vec<Section>,
    /// Claims, all PENDING
    pub claims: Vec<Claim>,
    /// Style contract for the drafter
    pub estilo: StyleContract,
    /// Risk categories to check downstream
    pub risk_checks: BTreeSet<RiskCategory>,
}

impl PlannerOutput {
    /// Find a section by id
    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.outline.iter().find(|s| &s.id == id)
    }
}
