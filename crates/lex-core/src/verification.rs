//! Verifier output: guardrail checks and RAG evaluation

use serde::{Deserialize, Serialize};

/// Outcome of one guardrail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailCheck {
    /// Guardrail name
    pub nombre: String,
    /// Whether the draft passed
    pub passed: bool,
    /// Explanation
    pub detalle: String,
}

impl GuardrailCheck {
    /// Passing check
    #[inline]
    #[must_use]
    pub fn pass(nombre: impl Into<String>, detalle: impl Into<String>) -> Self {
        Self {
            nombre: nombre.into(),
            passed: true,
            detalle: detalle.into(),
        }
    }

    /// Failing check
    #[inline]
    #[must_use]
    pub fn fail(nombre: impl Into<String>, detalle: impl Into<String>) -> Self {
        Self {
            nombre: nombre.into(),
            passed: false,
            detalle: detalle.into(),
        }
    }
}

/// Faithfulness and relevance scores, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagScores {
    /// Share of drafted content grounded in cited sources
    pub faithfulness: f64,
    /// Relevance of retrieved sources to the request
    pub context_relevance: f64,
    /// Relevance of the draft to the request
    pub answer_relevance: f64,
}

impl RagScores {
    /// Build scores, clamping into `[0, 1]` and mapping NaN to zero
    #[must_use]
    pub fn new(faithfulness: f64, context_relevance: f64, answer_relevance: f64) -> Self {
        Self {
            faithfulness: clamp_unit(faithfulness),
            context_relevance: clamp_unit(context_relevance),
            answer_relevance: clamp_unit(answer_relevance),
        }
    }

    /// Same scores with every value forced into range
    #[inline]
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(self.faithfulness, self.context_relevance, self.answer_relevance)
    }
}

#[inline]
fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Result of the verification stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierOutput {
    /// Guardrail outcomes, in registration order
    pub guardrails: Vec<GuardrailCheck>,
    /// RAG evaluation
    pub evaluacion: RagScores,
    /// All guardrails passed and faithfulness reached the threshold
    pub aprobado: bool,
    /// Reasons for rejection, empty when approved
    pub observaciones: Vec<String>,
}

impl VerifierOutput {
    /// Names of failed guardrails
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.guardrails.iter().filter(|g| !g.passed).map(|g| g.nombre.as_str())
    }

    /// Look up a check by name
    #[must_use]
    pub fn check(&self, nombre: &str) -> Option<&GuardrailCheck> {
        self.guardrails.iter().find(|g| g.nombre == nombre)
    }
}
