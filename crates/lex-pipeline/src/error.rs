//! Error types for the pipeline
//!
//! One enum per stage, aggregated into [`PipelineError`]. Retrieval gaps and
//! guardrail failures are data, not errors; only input problems and fatal
//! collaborator failures end up here.

use lex_core::ModelError;
use std::path::PathBuf;

/// Failure reported by a model-backed collaborator
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollaboratorError {
    /// Service could not be reached
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Service answered with something unusable
    #[error("invalid collaborator response: {0}")]
    InvalidResponse(String),

    /// Call exceeded its time budget
    #[error("collaborator timed out")]
    Timeout,

    /// The collaborator refused the input as insufficient
    #[error("insufficient input: {0}")]
    InsufficientInput(String),
}

impl CollaboratorError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// Failure reported by a source fetcher
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Temporary failure (rate limit, connection reset)
    #[error("transient fetch error: {0}")]
    Transient(String),

    /// Failure that will not go away on retry
    #[error("fetch failed: {0}")]
    Permanent(String),

    /// Fetch exceeded its time budget
    #[error("fetch timed out")]
    Timeout,
}

impl FetchError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout)
    }
}

/// Failure reported by a redactor
#[derive(Debug, Clone, thiserror::Error)]
pub enum RedactionError {
    /// Redaction could not run
    #[error("redaction failed: {0}")]
    Failed(String),

    /// Personal data still detected after redaction
    #[error("{residue} personal data match(es) remain after redaction")]
    Unverified {
        /// Matches found in the cleaned text
        residue: usize,
    },
}

/// Planning errors
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Request is malformed
    #[error("invalid request: {0}")]
    Input(#[from] ModelError),

    /// Request too underspecified to produce an outline
    #[error("insufficient input: {0}")]
    InsufficientInput(String),

    /// The proposal breaks the claim contract
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The proposal has no claims
    #[error("planner produced no claims")]
    NoClaims,

    /// Plan model failed beyond the retry budget
    #[error("plan model failed: {0}")]
    Collaborator(CollaboratorError),

    /// The run was cancelled
    #[error("planning cancelled")]
    Cancelled,
}

impl PlannerError {
    /// Whether the error is caused by the request
    #[inline]
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Input(_) | Self::InsufficientInput(_) | Self::ContractViolation(_)
        )
    }
}

/// Drafting errors
#[derive(Debug, thiserror::Error)]
pub enum DrafterError {
    /// Renderer unreachable beyond the retry budget
    #[error("renderer failed for section {seccion}: {source}")]
    Collaborator {
        /// Section being rendered
        seccion: String,
        /// Underlying failure
        source: CollaboratorError,
    },

    /// The run was cancelled
    #[error("drafting cancelled")]
    Cancelled,
}

/// Verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// Scorer unreachable beyond the retry budget
    #[error("scorer failed: {0}")]
    Collaborator(CollaboratorError),

    /// The run was cancelled
    #[error("verification cancelled")]
    Cancelled,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for the config schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

/// Corpus loading errors
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// File could not be read
    #[error("failed to read corpus {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not a valid corpus
    #[error("invalid corpus: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Request rejected before planning
    #[error("invalid request: {0}")]
    Input(#[from] ModelError),

    /// Planning failed
    #[error("planning failed: {0}")]
    Planner(#[from] PlannerError),

    /// Drafting failed
    #[error("drafting failed: {0}")]
    Drafter(#[from] DrafterError),

    /// Verification failed
    #[error("verification failed: {0}")]
    Verifier(#[from] VerifierError),

    /// A background task died
    #[error("internal error: {0}")]
    Internal(String),

    /// The run was cancelled by the caller
    #[error("pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether the caller should fix the request rather than retry
    #[inline]
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::Input(e) => e.is_input_error(),
            Self::Planner(e) => e.is_input_error(),
            _ => false,
        }
    }

    /// Whether retrying the same request may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Planner(PlannerError::Collaborator(e))
            | Self::Verifier(VerifierError::Collaborator(e))
            | Self::Drafter(DrafterError::Collaborator { source: e, .. }) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_classified() {
        assert!(PipelineError::from(ModelError::MissingField("tema")).is_input_error());
        assert!(PipelineError::from(PlannerError::InsufficientInput("x".into())).is_input_error());
        assert!(!PipelineError::from(PlannerError::NoClaims).is_input_error());
        assert!(!PipelineError::Cancelled.is_input_error());
    }

    #[test]
    fn retryable_only_for_transient_collaborators() {
        let e = PipelineError::from(PlannerError::Collaborator(CollaboratorError::Timeout));
        assert!(e.is_retryable());
        let e = PipelineError::from(VerifierError::Collaborator(CollaboratorError::InvalidResponse(
            "bad".into(),
        )));
        assert!(!e.is_retryable());
        assert!(!PipelineError::from(PlannerError::NoClaims).is_retryable());
    }

    #[test]
    fn collaborator_failures_name_their_stage() {
        let e = PipelineError::from(DrafterError::Collaborator {
            seccion: "S2".into(),
            source: CollaboratorError::Timeout,
        });
        assert!(e.is_retryable());
        assert!(!e.is_input_error());
        let msg = e.to_string();
        assert!(msg.starts_with("drafting failed"), "{msg}");
        assert!(msg.contains("S2"), "{msg}");
        let e = PipelineError::from(PlannerError::Collaborator(CollaboratorError::Timeout));
        assert!(e.to_string().starts_with("planning failed"));
    }

    #[test]
    fn fetch_error_retry_classes() {
        assert!(FetchError::Transient("429".into()).is_retryable());
        assert!(FetchError::Timeout.is_retryable());
        assert!(!FetchError::Permanent("404".into()).is_retryable());
    }
}
