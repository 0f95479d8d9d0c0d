//! Official sources
//!
//! [`RawDocument`] is what a fetcher hands back; [`FuenteOficial`] is the
//! immutable, redacted, citable record the retriever builds from it. Only the
//! retriever constructs `FuenteOficial` values; every later stage refers to
//! them through [`FuenteId`].

use crate::claim::SourceKind;
use crate::hash::ContentHash;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a resolved official source
///
/// Derived from the source kind and the canonical URL, so resolving the same
/// document twice yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FuenteId(String);

impl FuenteId {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier for a document of `kind` located at `url`
    #[must_use]
    pub fn derive(kind: SourceKind, url: &str) -> Self {
        let canonical = canonical_url(url);
        let hash = ContentHash::compute(canonical.as_bytes());
        Self(format!("{}-{}", kind.id_prefix(), hash.short()))
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FuenteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of a URL for identity purposes
///
/// Trims whitespace, lowercases scheme and host, drops fragments and a
/// trailing slash.
#[must_use]
pub fn canonical_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
    let (scheme_host, rest) = match without_fragment.find("://") {
        Some(idx) => {
            let after = &without_fragment[idx + 3..];
            let path_start = after.find('/').map_or(without_fragment.len(), |p| idx + 3 + p);
            without_fragment.split_at(path_start)
        }
        None => ("", without_fragment),
    };
    let mut canonical = format!("{}{}", scheme_host.to_lowercase(), rest);
    while canonical.ends_with('/') {
        canonical.pop();
    }
    canonical
}

/// A candidate document returned by a source fetcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Location of the document
    pub url: String,
    /// Extracted text
    pub texto: String,
    /// Document title, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titulo: Option<String>,
    /// Issuing body, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emisor: Option<String>,
    /// Document number (law number, ruling number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numero: Option<String>,
    /// Issue date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha: Option<NaiveDate>,
    /// Chamber that issued a ruling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sala: Option<String>,
    /// Reporting judge of a ruling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magistrado_ponente: Option<String>,
}

impl RawDocument {
    /// Create a document with only URL and text
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>, texto: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            texto: texto.into(),
            titulo: None,
            emisor: None,
            numero: None,
            fecha: None,
            sala: None,
            magistrado_ponente: None,
        }
    }

    /// With title
    #[inline]
    #[must_use]
    pub fn with_titulo(mut self, titulo: impl Into<String>) -> Self {
        self.titulo = Some(titulo.into());
        self
    }

    /// With issuing body
    #[inline]
    #[must_use]
    pub fn with_emisor(mut self, emisor: impl Into<String>) -> Self {
        self.emisor = Some(emisor.into());
        self
    }

    /// With document number
    #[inline]
    #[must_use]
    pub fn with_numero(mut self, numero: impl Into<String>) -> Self {
        self.numero = Some(numero.into());
        self
    }

    /// With issue date
    #[inline]
    #[must_use]
    pub fn with_fecha(mut self, fecha: NaiveDate) -> Self {
        self.fecha = Some(fecha);
        self
    }

    /// With judicial metadata
    #[inline]
    #[must_use]
    pub fn with_judicial(mut self, sala: impl Into<String>, ponente: impl Into<String>) -> Self {
        self.sala = Some(sala.into());
        self.magistrado_ponente = Some(ponente.into());
        self
    }
}

/// A resolved, redacted, citable official source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuenteOficial {
    id: FuenteId,
    tipo: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    emisor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    numero: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fecha: Option<NaiveDate>,
    texto: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sala: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    magistrado_ponente: Option<String>,
    hash: ContentHash,
}

impl FuenteOficial {
    /// Build a source from a fetched document and its redacted text
    ///
    /// The hash seals the redacted text. Judicial metadata is only kept for
    /// rulings.
    #[must_use]
    pub fn from_redacted(tipo: SourceKind, raw: RawDocument, redacted_text: String) -> Self {
        let judicial = tipo == SourceKind::Jurisprudencia;
        let url = canonical_url(&raw.url);
        Self {
            id: FuenteId::derive(tipo, &url),
            tipo,
            emisor: raw.emisor,
            numero: raw.numero,
            fecha: raw.fecha,
            hash: ContentHash::compute(redacted_text.as_bytes()),
            texto: redacted_text,
            url,
            sala: raw.sala.filter(|_| judicial),
            magistrado_ponente: raw.magistrado_ponente.filter(|_| judicial),
        }
    }

    /// Source identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &FuenteId {
        &self.id
    }

    /// Source kind
    #[inline]
    #[must_use]
    pub fn tipo(&self) -> SourceKind {
        self.tipo
    }

    /// Issuing body
    #[inline]
    #[must_use]
    pub fn emisor(&self) -> Option<&str> {
        self.emisor.as_deref()
    }

    /// Document number
    #[inline]
    #[must_use]
    pub fn numero(&self) -> Option<&str> {
        self.numero.as_deref()
    }

    /// Issue date
    #[inline]
    #[must_use]
    pub fn fecha(&self) -> Option<NaiveDate> {
        self.fecha
    }

    /// Redacted text
    #[inline]
    #[must_use]
    pub fn texto(&self) -> &str {
        &self.texto
    }

    /// Canonical URL
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ruling chamber
    #[inline]
    #[must_use]
    pub fn sala(&self) -> Option<&str> {
        self.sala.as_deref()
    }

    /// Ruling reporting judge
    #[inline]
    #[must_use]
    pub fn magistrado_ponente(&self) -> Option<&str> {
        self.magistrado_ponente.as_deref()
    }

    /// SHA-256 of the redacted text
    #[inline]
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Whether the stored hash still matches the text
    #[must_use]
    pub fn verify_hash(&self) -> bool {
        ContentHash::compute(self.texto.as_bytes()) == self.hash
    }
}
