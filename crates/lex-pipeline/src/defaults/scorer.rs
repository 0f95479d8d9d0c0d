//! Lexical rubric scorer
//!
//! Faithfulness is the share of content sentences (outside caveated sections)
//! that cite only retrieved sources and share at least `min_term_overlap`
//! content terms with them. Relevance scores are query-term coverage.

use crate::collaborators::{Scorer, ScoringInput};
use crate::error::CollaboratorError;
use indexmap::IndexSet;
use lex_core::citation::{extract_citations, strip_citations};
use lex_core::text::{content_terms, sentences, term_coverage};
use lex_core::{DrafterOutput, RagScores, SourceCatalog};

/// Rubric-based scorer over lexical overlap
#[derive(Debug, Clone, Copy)]
pub struct RubricScorer {
    /// Shared content terms required for a cited sentence to count as grounded
    pub min_term_overlap: usize,
}

impl Default for RubricScorer {
    fn default() -> Self {
        Self { min_term_overlap: 1 }
    }
}

impl RubricScorer {
    /// Score synchronously
    #[must_use]
    pub fn score_sync(&self, input: &ScoringInput<'_>) -> RagScores {
        let faithfulness = self.faithfulness(input.draft, input.fuentes);

        let cited = extract_citations(&input.draft.texto_completo);
        let coverages: Vec<f64> = cited
            .iter()
            .filter_map(|id| input.fuentes.get(id))
            .map(|f| term_coverage(&input.request.tema, f.texto()))
            .collect();
        let context_relevance = mean(&coverages);

        let pregunta = format!("{} {}", input.request.objetivo, input.request.tema);
        let answer_relevance = term_coverage(&pregunta, &input.draft.texto_completo);

        RagScores::new(faithfulness, context_relevance, answer_relevance)
    }

    fn faithfulness(&self, draft: &DrafterOutput, catalog: &SourceCatalog) -> f64 {
        let mut total = 0usize;
        let mut grounded = 0usize;
        for section in draft.secciones.iter().filter(|s| !s.advertencia) {
            for sentence in sentences(&section.texto) {
                let plain = strip_citations(sentence);
                let terms = content_terms(&plain);
                if terms.is_empty() {
                    continue;
                }
                total += 1;
                if self.is_grounded(sentence, &terms, catalog) {
                    grounded += 1;
                }
            }
        }
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = grounded as f64 / total as f64;
        ratio
    }

    fn is_grounded(&self, sentence: &str, terms: &IndexSet<String>, catalog: &SourceCatalog) -> bool {
        let cited = extract_citations(sentence);
        if cited.is_empty() {
            return false;
        }
        let mut source_terms = IndexSet::new();
        for id in &cited {
            match catalog.get(id) {
                Some(fuente) => source_terms.extend(content_terms(fuente.texto())),
                None => return false,
            }
        }
        terms.iter().filter(|t| source_terms.contains(*t)).count() >= self.min_term_overlap
    }
}

#[async_trait::async_trait]
impl Scorer for RubricScorer {
    async fn score(&self, input: &ScoringInput<'_>) -> Result<RagScores, CollaboratorError> {
        Ok(self.score_sync(input))
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}
