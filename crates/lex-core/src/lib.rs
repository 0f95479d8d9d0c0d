//! Lex Core - data model for claim-grounded legal document generation
//!
//! Every factual assertion in a generated document is a [`Claim`] that must be
//! backed by at least one [`FuenteOficial`] before it may be drafted. This
//! crate defines those types, the stage outputs that carry them between
//! pipeline stages, and the shared primitives the stages rely on:
//!
//! - [`hash`]: SHA-256 content hashes for tamper evidence
//! - [`pii`]: personal-data patterns shared by redaction and verification
//! - [`citation`]: `[F:<id>]` citation markers
//! - [`text`]: normalization and lexical overlap
//! - [`audit`]: hash-chained log and trazabilidad

pub mod audit;
pub mod citation;
pub mod claim;
pub mod draft;
pub mod error;
pub mod hash;
pub mod pii;
pub mod plan;
pub mod request;
pub mod retrieval;
pub mod source;
pub mod text;
pub mod verification;

pub use audit::{
    Attestation, AuditLog, Completion, ControlAcceso, ControlRegistro, ControlRetencion,
    ControlesSeguridad, FinalizerOutput, GestionRiesgoIa, LogEntry, MissingElement, RunId, Stage,
    TrazaFuente, Trazabilidad,
};
pub use claim::{
    Autoridad, Claim, ClaimId, ClaimRole, ClaimStatus, Jurisdiccion, RequiredSource, RiskCategory,
    SectionId, SourceKind,
};
pub use draft::{DraftSection, DrafterOutput, ExcludedClaim, ExclusionReason, RenderOrigin};
pub use error::ModelError;
pub use hash::{ContentHash, HashError};
pub use plan::{HeadingLevel, PlannerOutput, Section, StyleContract};
pub use request::GenerationRequest;
pub use retrieval::{
    ClaimResolution, GapReason, RedactionLedger, RedactionReport, RetrieverOutput, RetrieverResult,
    SourceCatalog, SourceGap,
};
pub use source::{FuenteId, FuenteOficial, RawDocument};
pub use verification::{GuardrailCheck, RagScores, VerifierOutput};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audit::{AuditLog, Completion, FinalizerOutput, MissingElement, Stage};
    pub use crate::claim::{
        Autoridad, Claim, ClaimId, ClaimRole, ClaimStatus, RequiredSource, RiskCategory, SectionId,
        SourceKind,
    };
    pub use crate::draft::DrafterOutput;
    pub use crate::plan::{HeadingLevel, PlannerOutput, Section};
    pub use crate::request::GenerationRequest;
    pub use crate::retrieval::{ClaimResolution, RetrieverOutput, RetrieverResult, SourceCatalog};
    pub use crate::source::{FuenteId, FuenteOficial, RawDocument};
    pub use crate::verification::{RagScores, VerifierOutput};
}
