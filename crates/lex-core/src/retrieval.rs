//! Retrieval outcomes
//!
//! Each claim gets exactly one [`RetrieverResult`]. Resolved sources live once
//! in the [`SourceCatalog`]; results and claims refer to them by id.

use crate::claim::{ClaimId, RequiredSource, SourceKind};
use crate::pii::PiiKind;
use crate::source::{FuenteId, FuenteOficial};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Why a required-source entry produced no source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "codigo", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapReason {
    /// The fetcher returned no candidates
    NotFound,
    /// Candidates existed but none met length or relevance thresholds
    BelowThreshold {
        /// Number of candidates examined
        candidatos: usize,
    },
    /// The fetch or the claim budget timed out
    Timeout,
    /// The fetcher failed after exhausting retries
    FetchError {
        /// Error message
        detalle: String,
    },
    /// Every acceptable candidate failed redaction verification
    RedactionUnverified,
    /// No handler registered for the source kind
    NoHandler,
    /// The run was cancelled before the entry was resolved
    Cancelled,
}

impl fmt::Display for GapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("no se encontró fuente"),
            Self::BelowThreshold { candidatos } => {
                write!(f, "{candidatos} candidato(s) bajo el umbral de aceptación")
            }
            Self::Timeout => f.write_str("tiempo de consulta agotado"),
            Self::FetchError { detalle } => write!(f, "error de consulta: {detalle}"),
            Self::RedactionUnverified => f.write_str("redacción de datos personales no verificada"),
            Self::NoHandler => f.write_str("sin herramienta registrada"),
            Self::Cancelled => f.write_str("consulta cancelada"),
        }
    }
}

/// A required-source entry that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceGap {
    /// Position of the entry in the claim's required sources
    pub indice: usize,
    /// Kind of source that was required
    pub tipo: SourceKind,
    /// Query that was attempted
    pub query: String,
    /// Reason for the failure
    pub motivo: GapReason,
}

impl SourceGap {
    /// Record a gap for the entry at `indice`
    #[must_use]
    pub fn new(indice: usize, required: &RequiredSource, motivo: GapReason) -> Self {
        Self {
            indice,
            tipo: required.tipo(),
            query: required.query().to_string(),
            motivo,
        }
    }
}

/// Resolution of one claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimResolution {
    /// Every entry yielded a source
    Supported {
        /// Distinct sources, in resolution order
        fuentes: Vec<FuenteId>,
    },
    /// At least one entry failed
    Unsupported {
        /// Failed entries
        gaps: Vec<SourceGap>,
    },
}

impl ClaimResolution {
    /// Whether the claim is supported
    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported { .. })
    }

    /// Resolved source ids (empty unless supported)
    #[inline]
    #[must_use]
    pub fn fuentes(&self) -> &[FuenteId] {
        match self {
            Self::Supported { fuentes } => fuentes,
            Self::Unsupported { .. } => &[],
        }
    }
}

/// Findings of one redaction pass
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RedactionReport {
    /// Document the report refers to
    pub url: String,
    /// Whether anything was removed
    pub redacted: bool,
    /// Replacements per category
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hallazgos: BTreeMap<PiiKind, usize>,
}

/// Redaction bookkeeping for one claim
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RedactionLedger {
    /// Accepted documents that had PII removed
    pub redactados: usize,
    /// Candidates discarded because redaction could not be verified
    pub descartados: usize,
    /// Reports for accepted and discarded candidates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reportes: Vec<RedactionReport>,
}

impl RedactionLedger {
    /// Record a verified redaction of an accepted document
    pub fn record_accepted(&mut self, report: RedactionReport) {
        if report.redacted {
            self.redactados += 1;
        }
        self.reportes.push(report);
    }

    /// Record a discarded candidate
    pub fn record_discarded(&mut self, report: RedactionReport) {
        self.descartados += 1;
        self.reportes.push(report);
    }
}

/// Retrieval outcome of one claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieverResult {
    /// Claim this result belongs to
    pub claim_id: ClaimId,
    /// Supported or unsupported, with detail
    #[serde(flatten)]
    pub resolucion: ClaimResolution,
    /// Redaction bookkeeping
    pub redaccion: RedactionLedger,
}

/// Order-preserving, deduplicated set of resolved sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCatalog {
    fuentes: IndexMap<FuenteId, FuenteOficial>,
}

impl SourceCatalog {
    /// Empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a source, keeping the first copy of a duplicated id
    ///
    /// Returns the id of the stored source.
    pub fn insert(&mut self, fuente: FuenteOficial) -> FuenteId {
        let id = fuente.id().clone();
        self.fuentes.entry(id.clone()).or_insert(fuente);
        id
    }

    /// Merge another catalog into this one
    pub fn extend(&mut self, other: SourceCatalog) {
        for (id, fuente) in other.fuentes {
            self.fuentes.entry(id).or_insert(fuente);
        }
    }

    /// Look up a source
    #[inline]
    #[must_use]
    pub fn get(&self, id: &FuenteId) -> Option<&FuenteOficial> {
        self.fuentes.get(id)
    }

    /// Whether the id was retrieved
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &FuenteId) -> bool {
        self.fuentes.contains_key(id)
    }

    /// Number of sources
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fuentes.len()
    }

    /// Whether the catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fuentes.is_empty()
    }

    /// Sources in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &FuenteOficial> {
        self.fuentes.values()
    }
}

impl Serialize for SourceCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.fuentes.values())
    }
}

/// Output of the retrieval stage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrieverOutput {
    /// One result per claim, in planner order
    pub resultados: Vec<RetrieverResult>,
    /// Every source resolved during the run
    pub fuentes: SourceCatalog,
}

impl RetrieverOutput {
    /// Result for a claim
    #[must_use]
    pub fn result_for(&self, claim: &ClaimId) -> Option<&RetrieverResult> {
        self.resultados.iter().find(|r| &r.claim_id == claim)
    }

    /// Number of supported claims
    #[must_use]
    pub fn supported_count(&self) -> usize {
        self.resultados.iter().filter(|r| r.resolucion.is_supported()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::Autoridad;
    use crate::source::RawDocument;

    fn fuente(url: &str) -> FuenteOficial {
        FuenteOficial::from_redacted(SourceKind::Norma, RawDocument::new(url, "t"), "t".into())
    }

    #[test]
    fn catalog_dedupes_and_keeps_order() {
        let mut catalog = SourceCatalog::new();
        let a = catalog.insert(fuente("https://a.gov.co/1"));
        let b = catalog.insert(fuente("https://a.gov.co/2"));
        let again = catalog.insert(fuente("https://a.gov.co/1/"));
        assert_eq!(a, again);
        assert_eq!(catalog.len(), 2);
        let ids: Vec<_> = catalog.iter().map(|f| f.id().clone()).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn result_wire_shape() {
        let required = RequiredSource::new(SourceKind::Jurisprudencia, "daño cierto", Autoridad::CorteSupremaDeJusticia);
        let result = RetrieverResult {
            claim_id: ClaimId::sequential(3),
            resolucion: ClaimResolution::Unsupported {
                gaps: vec![SourceGap::new(1, &required, GapReason::Timeout)],
            },
            redaccion: RedactionLedger::default(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["claim_id"], "C3");
        assert_eq!(json["status"], "UNSUPPORTED");
        assert_eq!(json["gaps"][0]["motivo"]["codigo"], "TIMEOUT");
        assert_eq!(json["gaps"][0]["tipo"], "jurisprudencia");
    }

    #[test]
    fn ledger_counts() {
        let mut ledger = RedactionLedger::default();
        ledger.record_accepted(RedactionReport {
            url: "u".into(),
            redacted: true,
            hallazgos: BTreeMap::from([(PiiKind::Email, 1)]),
        });
        ledger.record_accepted(RedactionReport::default());
        ledger.record_discarded(RedactionReport::default());
        assert_eq!(ledger.redactados, 1);
        assert_eq!(ledger.descartados, 1);
        assert_eq!(ledger.reportes.len(), 3);
    }
}
