//! Deterministic section renderer

use crate::collaborators::{Renderer, SectionBrief};
use crate::drafter::render_template;
use crate::error::CollaboratorError;

/// Renders each bound claim as one cited sentence
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

#[async_trait::async_trait]
impl Renderer for TemplateRenderer {
    async fn render(&self, brief: &SectionBrief) -> Result<String, CollaboratorError> {
        Ok(render_template(brief))
    }
}
