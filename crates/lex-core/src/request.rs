//! Generation request accepted at the HTTP boundary

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Audience used when the request does not name one
pub const DEFAULT_AUDIENCIA: &str = "equipo jurídico";

/// A request to generate a legal document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// What the document must achieve (e.g. "memo")
    #[serde(default)]
    pub objetivo: String,
    /// Intended readers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audiencia: Option<String>,
    /// Legal topic
    #[serde(default)]
    pub tema: String,
    /// Additional constraints, one per entry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricciones: Vec<String>,
}

impl GenerationRequest {
    /// Create a request with goal and topic
    #[must_use]
    pub fn new(objetivo: impl Into<String>, tema: impl Into<String>) -> Self {
        Self {
            objetivo: objetivo.into(),
            audiencia: None,
            tema: tema.into(),
            restricciones: Vec::new(),
        }
    }

    /// With audience
    #[inline]
    #[must_use]
    pub fn with_audiencia(mut self, audiencia: impl Into<String>) -> Self {
        self.audiencia = Some(audiencia.into());
        self
    }

    /// With an additional constraint
    #[inline]
    #[must_use]
    pub fn with_restriccion(mut self, restriccion: impl Into<String>) -> Self {
        self.restricciones.push(restriccion.into());
        self
    }

    /// Audience, falling back to the default one
    #[must_use]
    pub fn audiencia_or_default(&self) -> &str {
        self.audiencia
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_AUDIENCIA)
    }

    /// Check required fields
    ///
    /// # Errors
    /// Returns [`ModelError::MissingField`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.objetivo.trim().is_empty() {
            return Err(ModelError::MissingField("objetivo"));
        }
        if self.tema.trim().is_empty() {
            return Err(ModelError::MissingField("tema"));
        }
        Ok(())
    }
}
