//! Pattern-based personal-data redactor

use crate::collaborators::{Redaction, Redactor};
use crate::error::RedactionError;
use lex_core::pii;

/// Regex redactor for Colombian personal identifiers
///
/// Replaces emails, NIT and cédula numbers, card numbers and mobile numbers
/// with category placeholders, then re-scans the output. Any residue is
/// reported as [`RedactionError::Unverified`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternRedactor;

impl PatternRedactor {
    /// Create redactor
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Redact synchronously
    ///
    /// # Errors
    /// Returns [`RedactionError::Unverified`] if patterns still match after
    /// replacement.
    pub fn redact_text(&self, text: &str) -> Result<Redaction, RedactionError> {
        let pass = pii::redact(text);
        let residue = pii::detect(&pass.text).len();
        if residue > 0 {
            return Err(RedactionError::Unverified { residue });
        }
        Ok(Redaction {
            redacted: pass.redacted(),
            texto: pass.text,
            hallazgos: pass.counts,
        })
    }
}

#[async_trait::async_trait]
impl Redactor for PatternRedactor {
    async fn redact(&self, text: &str) -> Result<Redaction, RedactionError> {
        self.redact_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::pii::PiiKind;

    #[tokio::test]
    async fn removes_identifiers() {
        let r = PatternRedactor::new()
            .redact("El demandante, C.C. 79.456.123, escribió a notificaciones@empresa.com.co")
            .await
            .unwrap();
        assert!(r.redacted);
        assert!(!pii::contains_pii(&r.texto));
        assert_eq!(r.hallazgos.get(&PiiKind::Cedula), Some(&1));
        assert_eq!(r.hallazgos.get(&PiiKind::Email), Some(&1));
    }

    #[tokio::test]
    async fn clean_text_passes_through() {
        let text = "Artículo 2341. El que ha cometido un delito o culpa, que ha inferido daño a otro, es obligado a la indemnización.";
        let r = PatternRedactor::new().redact(text).await.unwrap();
        assert!(!r.redacted);
        assert_eq!(r.texto, text);
        assert!(r.hallazgos.is_empty());
    }
}
