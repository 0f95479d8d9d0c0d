//! Error types for the data model

use crate::claim::ClaimId;
use crate::hash::HashError;

/// Violations of data-model invariants
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A required request field is missing or blank
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A claim was built without required sources
    #[error("claim {0} has no required sources")]
    EmptySources(ClaimId),

    /// A collaborator returned data that breaks a contract
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The audit log hash chain is broken
    #[error("audit log integrity violated at entry {seq}")]
    LogIntegrity {
        /// First broken position
        seq: u64,
    },

    /// Hash parsing error
    #[error("hash error: {0}")]
    Hash(#[from] HashError),
}

impl ModelError {
    /// Whether the error was caused by caller input
    #[inline]
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MissingField(_))
    }
}
