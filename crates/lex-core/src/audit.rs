//! Audit trail (trazabilidad) and completion status
//!
//! The [`AuditLog`] is a hash chain: every entry commits to the previous
//! entry's hash, so removing or editing an entry breaks
//! [`AuditLog::verify_integrity`]. The log is owned by a single run and only
//! appended to by the orchestrator.

use crate::claim::{ClaimId, SectionId, SourceKind};
use crate::error::ModelError;
use crate::hash::ContentHash;
use crate::source::{FuenteId, FuenteOficial};
use crate::verification::RagScores;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique identifier of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Ulid);

impl RunId {
    /// Fresh run id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Outline and claims
    Planner,
    /// Source resolution
    Retriever,
    /// Prose rendering
    Drafter,
    /// Guardrails and scoring
    Verifier,
    /// Audit trail assembly
    Finalizer,
    /// Orchestrator-level events
    Pipeline,
}

impl Stage {
    /// Lowercase name used in logs
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Retriever => "retriever",
            Self::Drafter => "drafter",
            Self::Verifier => "verifier",
            Self::Finalizer => "finalizer",
            Self::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the hash-chained log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the chain, from zero
    pub seq: u64,
    /// When the entry was appended
    pub at: DateTime<Utc>,
    /// Stage that produced the event
    pub etapa: Stage,
    /// Short event name
    pub evento: String,
    /// Free-form detail
    pub detalle: String,
    /// Hash of the previous entry (zero for the first)
    pub prev_hash: ContentHash,
    /// Hash of this entry
    pub hash: ContentHash,
}

impl LogEntry {
    fn compute_hash(&self) -> ContentHash {
        let seq = self.seq.to_le_bytes();
        let at = self.at.to_rfc3339();
        ContentHash::compute_parts([
            seq.as_slice(),
            at.as_bytes(),
            self.etapa.as_str().as_bytes(),
            self.evento.as_bytes(),
            self.detalle.as_bytes(),
            self.prev_hash.as_bytes().as_slice(),
        ])
    }
}

/// Append-only, hash-chained event log of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<LogEntry>,
}

impl AuditLog {
    /// Empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return the stored entry
    pub fn append(
        &mut self,
        etapa: Stage,
        evento: impl Into<String>,
        detalle: impl Into<String>,
    ) -> &LogEntry {
        let prev_hash = self.head();
        let mut entry = LogEntry {
            seq: self.entries.len() as u64,
            at: Utc::now(),
            etapa,
            evento: evento.into(),
            detalle: detalle.into(),
            prev_hash,
            hash: ContentHash::default(),
        };
        entry.hash = entry.compute_hash();
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Hash of the last entry (zero when empty)
    #[inline]
    #[must_use]
    pub fn head(&self) -> ContentHash {
        self.entries.last().map(|e| e.hash).unwrap_or_default()
    }

    /// Entries in append order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no event was logged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check sequence numbers, back-links and entry hashes
    ///
    /// # Errors
    /// Returns [`ModelError::LogIntegrity`] with the first broken position.
    pub fn verify_integrity(&self) -> Result<(), ModelError> {
        let mut prev = ContentHash::default();
        for (i, entry) in self.entries.iter().enumerate() {
            let seq = i as u64;
            if entry.seq != seq || entry.prev_hash != prev || entry.compute_hash() != entry.hash {
                return Err(ModelError::LogIntegrity { seq });
            }
            prev = entry.hash;
        }
        Ok(())
    }
}

/// Compliance attestation for one control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Whether the control is met for this run
    pub cumple: bool,
    /// What supports the attestation
    pub evidencia: String,
}

impl Attestation {
    /// Build an attestation
    #[inline]
    #[must_use]
    pub fn new(cumple: bool, evidencia: impl Into<String>) -> Self {
        Self {
            cumple,
            evidencia: evidencia.into(),
        }
    }
}

/// Four-pillar AI risk management block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestionRiesgoIa {
    /// Policies and accountability in force
    pub govern: Attestation,
    /// Context and risks identified
    pub map: Attestation,
    /// Risks measured
    pub measure: Attestation,
    /// Risks treated
    pub manage: Attestation,
}

/// Access-control attestation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlAcceso {
    /// Caller identity as presented at the boundary
    pub solicitante: String,
    /// Whether the caller was authorized
    pub autorizado: bool,
}

/// Logging attestation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRegistro {
    /// Number of log entries
    pub entradas: usize,
    /// Whether the hash chain verified
    pub cadena_integra: bool,
}

/// Retention attestation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRetencion {
    /// Configured retention in days
    pub dias: u32,
    /// Date after which the run's artefacts must be purged
    pub purgar_despues_de: NaiveDate,
}

/// Security controls block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlesSeguridad {
    /// Access control
    pub control_acceso: ControlAcceso,
    /// Logging
    pub registro: ControlRegistro,
    /// Retention
    pub retencion: ControlRetencion,
}

/// A cited source as it appears in the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrazaFuente {
    /// Source id
    pub id: FuenteId,
    /// Canonical URL
    pub url: String,
    /// Source kind
    pub tipo: SourceKind,
    /// Issuing body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emisor: Option<String>,
    /// Issue date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha: Option<NaiveDate>,
    /// SHA-256 of the source text
    pub hash: ContentHash,
}

impl From<&FuenteOficial> for TrazaFuente {
    fn from(f: &FuenteOficial) -> Self {
        Self {
            id: f.id().clone(),
            url: f.url().to_string(),
            tipo: f.tipo(),
            emisor: f.emisor().map(str::to_string),
            fecha: f.fecha(),
            hash: ContentHash::compute(f.texto().as_bytes()),
        }
    }
}

/// Audit trail binding a document to its evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trazabilidad {
    /// Run identifier
    pub run_id: RunId,
    /// Prompt template version
    pub version_prompt: String,
    /// Model version
    pub version_modelo: String,
    /// When the trail was produced
    pub generado_en: DateTime<Utc>,
    /// Hash of the final document text
    pub hash_documento: ContentHash,
    /// Hashes of every cited source text, in citation order
    pub hashes_evidencia: Vec<ContentHash>,
    /// Cited sources
    pub fuentes: Vec<TrazaFuente>,
    /// RAG scores, when verification ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluacion: Option<RagScores>,
    /// Hash-chained event log
    pub registro: AuditLog,
    /// AI risk management attestations
    pub gestion_riesgo_ia: GestionRiesgoIa,
    /// Security control attestations
    pub controles_seguridad: ControlesSeguridad,
}

/// An element whose absence makes the document incomplete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tipo", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingElement {
    /// A section's primary claim was excluded
    Claim {
        /// Excluded claim
        claim_id: ClaimId,
        /// Section it belonged to
        seccion: SectionId,
    },
    /// An outline section was never rendered
    Seccion {
        /// Section id
        seccion: SectionId,
        /// Heading text
        titulo: String,
    },
    /// Verification rejected the draft
    Aprobacion {
        /// Rejection reasons
        observaciones: Vec<String>,
    },
    /// The global deadline fired during a stage
    Tiempo {
        /// Stage that was running
        etapa: Stage,
    },
}

/// Overall completion of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Completion {
    /// Approved with every primary claim present
    Completo,
    /// Something required is missing
    Incompleto {
        /// Missing elements
        faltantes: Vec<MissingElement>,
    },
}

impl Completion {
    /// Whether the run is complete
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completo)
    }

    /// Missing elements (empty when complete)
    #[inline]
    #[must_use]
    pub fn faltantes(&self) -> &[MissingElement] {
        match self {
            Self::Completo => &[],
            Self::Incompleto { faltantes } => faltantes,
        }
    }
}

/// Result of the finalization stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizerOutput {
    /// Audit trail
    pub trazabilidad: Trazabilidad,
    /// Completion status
    #[serde(flatten)]
    pub completion: Completion,
}
