//! Offline corpus fetcher
//!
//! Serves candidate documents from a JSON corpus of official texts, ranked by
//! query-term coverage. Used when no live connector is configured and as the
//! backing store for end-to-end tests.

use crate::collaborators::SourceFetcher;
use crate::error::{CorpusError, FetchError};
use lex_core::text::term_coverage;
use lex_core::{RawDocument, RequiredSource, SourceKind};
use serde::Deserialize;
use std::path::Path;

const BUILTIN_CORPUS: &str = include_str!("../../data/corpus_co.json");

/// One corpus entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CorpusDocument {
    /// Source kind the document can satisfy
    pub tipo: SourceKind,
    /// Document content and metadata
    #[serde(flatten)]
    pub documento: RawDocument,
}

#[derive(Debug, Deserialize)]
struct CorpusFile {
    documentos: Vec<CorpusDocument>,
}

/// Keyword-ranked fetcher over an in-memory corpus
#[derive(Debug, Clone)]
pub struct CorpusFetcher {
    documentos: Vec<CorpusDocument>,
    max_resultados: usize,
}

impl CorpusFetcher {
    /// Default number of candidates returned per fetch
    pub const DEFAULT_MAX_RESULTADOS: usize = 5;

    /// Create from documents
    #[must_use]
    pub fn new(documentos: Vec<CorpusDocument>) -> Self {
        Self {
            documentos,
            max_resultados: Self::DEFAULT_MAX_RESULTADOS,
        }
    }

    /// Parse a corpus (`{"documentos": [...]}`)
    ///
    /// # Errors
    /// Returns [`CorpusError::Parse`] on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self, CorpusError> {
        let file: CorpusFile = serde_json::from_str(json)?;
        Ok(Self::new(file.documentos))
    }

    /// Load a corpus file
    ///
    /// # Errors
    /// Returns [`CorpusError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Sample corpus of Colombian civil-liability sources bundled with the crate
    ///
    /// # Errors
    /// Returns [`CorpusError::Parse`] if the bundled file is malformed.
    pub fn builtin() -> Result<Self, CorpusError> {
        Self::from_json_str(BUILTIN_CORPUS)
    }

    /// With maximum candidates per fetch
    #[inline]
    #[must_use]
    pub fn with_max_resultados(mut self, max: usize) -> Self {
        self.max_resultados = max;
        self
    }

    /// Number of documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documentos.len()
    }

    /// Whether the corpus is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documentos.is_empty()
    }

    /// Candidates for `source`, best coverage first
    #[must_use]
    pub fn search(&self, source: &RequiredSource) -> Vec<RawDocument> {
        let mut scored: Vec<(f64, &RawDocument)> = self
            .documentos
            .iter()
            .filter(|d| d.tipo == source.tipo())
            .map(|d| {
                let haystack = format!(
                    "{} {}",
                    d.documento.titulo.as_deref().unwrap_or_default(),
                    d.documento.texto
                );
                (term_coverage(source.query(), &haystack), &d.documento)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(self.max_resultados)
            .map(|(_, doc)| doc.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl SourceFetcher for CorpusFetcher {
    async fn fetch(&self, source: &RequiredSource) -> Result<Vec<RawDocument>, FetchError> {
        Ok(self.search(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::Autoridad;

    #[test]
    fn builtin_corpus_parses() {
        let corpus = CorpusFetcher::builtin().unwrap();
        assert!(corpus.len() >= 6);
    }

    #[test]
    fn search_filters_by_kind_and_ranks() {
        let corpus = CorpusFetcher::builtin().unwrap();
        let hits = corpus.search(&RequiredSource::new(
            SourceKind::Jurisprudencia,
            "daño cierto personal",
            Autoridad::CorteSupremaDeJusticia,
        ));
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|d| d.sala.is_some() || d.magistrado_ponente.is_some() || d.emisor.is_some()));
    }

    #[test]
    fn unrelated_query_finds_nothing() {
        let corpus = CorpusFetcher::builtin().unwrap();
        let hits = corpus.search(&RequiredSource::new(
            SourceKind::Norma,
            "astronáutica orbital",
            Autoridad::CongresoDeLaRepublica,
        ));
        assert!(hits.is_empty());
    }

    #[test]
    fn malformed_corpus_is_parse_error() {
        assert!(matches!(
            CorpusFetcher::from_json_str("{\"documentos\": [{\"tipo\": \"ley\"}]}"),
            Err(CorpusError::Parse(_))
        ));
    }
}
