//! Personally identifiable information patterns
//!
//! A single pattern set is shared by the redactor (which removes PII from
//! retrieved sources) and by the verifier guardrail (which checks that none
//! survives into the draft). Patterns target Colombian identifiers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of personal data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiKind {
    /// Email address
    Email,
    /// Tax identification number (NIT)
    Nit,
    /// Citizenship card number (cédula)
    Cedula,
    /// Payment card number
    Tarjeta,
    /// Mobile phone number
    Telefono,
}

impl PiiKind {
    /// All kinds, in redaction order
    pub const ALL: [PiiKind; 5] = [
        PiiKind::Email,
        PiiKind::Nit,
        PiiKind::Cedula,
        PiiKind::Tarjeta,
        PiiKind::Telefono,
    ];

    /// Placeholder written in place of a redacted span
    #[inline]
    #[must_use]
    pub const fn placeholder(self) -> &'static str {
        match self {
            PiiKind::Email => "[EMAIL_REDACTADO]",
            PiiKind::Nit => "[NIT_REDACTADO]",
            PiiKind::Cedula => "[CEDULA_REDACTADA]",
            PiiKind::Tarjeta => "[TARJETA_REDACTADA]",
            PiiKind::Telefono => "[TELEFONO_REDACTADO]",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            PiiKind::Email => &EMAIL,
            PiiKind::Nit => &NIT,
            PiiKind::Cedula => &CEDULA,
            PiiKind::Tarjeta => &TARJETA,
            PiiKind::Telefono => &TELEFONO,
        }
    }
}

impl fmt::Display for PiiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PiiKind::Email => "email",
            PiiKind::Nit => "nit",
            PiiKind::Cedula => "cedula",
            PiiKind::Tarjeta => "tarjeta",
            PiiKind::Telefono => "telefono",
        };
        f.write_str(name)
    }
}

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").expect("valid email pattern"));

static NIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bnit\.?\s*(?:no\.?\s*)?[:#]?\s*\d{3}\.?\d{3}\.?\d{3}(?:\s*-\s*\d)?\b").expect("valid nit pattern")
});

static CEDULA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:c\.\s?c\.?|cc|c[ée]dula(?:\s+de\s+ciudadan[íi]a)?)\s*(?:no\.?\s*|n[°º]\s*)?[:#]?\s*\d{1,3}(?:\.?\d{3}){1,3}\b",
    )
    .expect("valid cedula pattern")
});

static TARJETA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{4}[\s-]?){3}\d{4}\b").expect("valid card pattern"));

static TELEFONO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\+57[\s-]?)?\b3\d{2}[\s-]?\d{3}[\s-]?\d{4}\b").expect("valid phone pattern"));

/// A PII occurrence in a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiMatch {
    /// Category of the match
    pub kind: PiiKind,
    /// Byte offset where the match starts
    pub start: usize,
    /// Byte offset where the match ends
    pub end: usize,
}

/// Result of a pattern redaction pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRedaction {
    /// Text with every match replaced by its placeholder
    pub text: String,
    /// Number of replacements per category
    pub counts: BTreeMap<PiiKind, usize>,
}

impl PatternRedaction {
    /// Whether anything was replaced
    #[inline]
    #[must_use]
    pub fn redacted(&self) -> bool {
        self.counts.values().any(|n| *n > 0)
    }
}

/// Find every PII occurrence in `text`
#[must_use]
pub fn detect(text: &str) -> Vec<PiiMatch> {
    let mut found: Vec<PiiMatch> = PiiKind::ALL
        .iter()
        .flat_map(|kind| {
            kind.pattern().find_iter(text).map(move |m| PiiMatch {
                kind: *kind,
                start: m.start(),
                end: m.end(),
            })
        })
        .collect();
    found.sort_by_key(|m| (m.start, m.end));
    found
}

/// Whether `text` contains any PII pattern
#[inline]
#[must_use]
pub fn contains_pii(text: &str) -> bool {
    PiiKind::ALL.iter().any(|k| k.pattern().is_match(text))
}

/// Replace every PII occurrence with its category placeholder
#[must_use]
pub fn redact(text: &str) -> PatternRedaction {
    let mut current = text.to_string();
    let mut counts = BTreeMap::new();
    for kind in PiiKind::ALL {
        let pattern = kind.pattern();
        let n = pattern.find_iter(&current).count();
        if n > 0 {
            current = pattern.replace_all(&current, kind.placeholder()).into_owned();
            counts.insert(kind, n);
        }
    }
    PatternRedaction {
        text: current,
        counts,
    }
}
