//! Claims and their retrieval instructions
//!
//! A [`Claim`] is an atomic legal assertion. It starts PENDING and only the
//! retriever's [`ClaimResolution`] can move it to SUPPORTED or UNSUPPORTED.
//! Status and sources are private so that "sources present iff supported"
//! holds by construction.

use crate::error::ModelError;
use crate::retrieval::ClaimResolution;
use crate::source::FuenteId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable claim identifier (`C1`, `C2`, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(String);

impl ClaimId {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for the `n`th claim (1-based)
    #[inline]
    #[must_use]
    pub fn sequential(n: usize) -> Self {
        Self(format!("C{n}"))
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outline section identifier (`S1`, `S1.1`, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supported jurisdiction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiccion {
    /// Colombia
    #[default]
    #[serde(rename = "CO")]
    Colombia,
}

/// Kind of official source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Statute, decree or other normative text
    Norma,
    /// Judicial ruling
    Jurisprudencia,
    /// Legal doctrine or official concept
    Doctrina,
}

impl SourceKind {
    /// All kinds
    pub const ALL: [SourceKind; 3] = [Self::Norma, Self::Jurisprudencia, Self::Doctrina];

    /// Prefix used in source identifiers
    #[inline]
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Norma => "NOR",
            Self::Jurisprudencia => "JUR",
            Self::Doctrina => "DOC",
        }
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Norma => "norma",
            Self::Jurisprudencia => "jurisprudencia",
            Self::Doctrina => "doctrina",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preferred authoritative body
///
/// Variant order is the preference rank: lower ranks are consulted first when
/// a claim needs several sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Autoridad {
    /// Corte Constitucional
    CorteConstitucional,
    /// Congreso de la República
    CongresoDeLaRepublica,
    /// Corte Suprema de Justicia
    CorteSupremaDeJusticia,
    /// Consejo de Estado
    ConsejoDeEstado,
    /// Presidencia de la República (decrees)
    PresidenciaDeLaRepublica,
    /// Superintendencia de Industria y Comercio
    SuperintendenciaDeIndustriaYComercio,
    /// Academic doctrine
    Academia,
    /// Any other body
    Otra,
}

impl Autoridad {
    /// Preference rank (0 = most preferred)
    #[inline]
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Human-readable name of the body
    #[must_use]
    pub const fn nombre(self) -> &'static str {
        match self {
            Self::CorteConstitucional => "Corte Constitucional",
            Self::CongresoDeLaRepublica => "Congreso de la República",
            Self::CorteSupremaDeJusticia => "Corte Suprema de Justicia",
            Self::ConsejoDeEstado => "Consejo de Estado",
            Self::PresidenciaDeLaRepublica => "Presidencia de la República",
            Self::SuperintendenciaDeIndustriaYComercio => "Superintendencia de Industria y Comercio",
            Self::Academia => "Academia",
            Self::Otra => "Otra",
        }
    }

    /// Whether a free-text issuing body names this authority
    #[must_use]
    pub fn matches(self, emisor: &str) -> bool {
        match self {
            Self::Otra => false,
            other => crate::text::contains_normalized(emisor, other.nombre()),
        }
    }

    /// Default authority for a source kind
    #[inline]
    #[must_use]
    pub const fn default_for(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Norma => Self::CongresoDeLaRepublica,
            SourceKind::Jurisprudencia => Self::CorteConstitucional,
            SourceKind::Doctrina => Self::Academia,
        }
    }
}

impl fmt::Display for Autoridad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nombre())
    }
}

/// A retrieval instruction attached to a claim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredSource {
    tipo: SourceKind,
    query: String,
    prefer: Autoridad,
}

impl RequiredSource {
    /// Create a retrieval instruction
    #[inline]
    #[must_use]
    pub fn new(tipo: SourceKind, query: impl Into<String>, prefer: Autoridad) -> Self {
        Self {
            tipo,
            query: query.into(),
            prefer,
        }
    }

    /// Kind of source required
    #[inline]
    #[must_use]
    pub fn tipo(&self) -> SourceKind {
        self.tipo
    }

    /// Free-text query
    #[inline]
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Preferred authority
    #[inline]
    #[must_use]
    pub fn prefer(&self) -> Autoridad {
        self.prefer
    }
}

/// Risk category flagged on a claim or checked downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    /// Confidentiality or conflict with professional secrecy
    Confidencialidad,
    /// Personal data handling
    DatosPersonales,
    /// Minors involved
    MenoresDeEdad,
    /// Norm may have been repealed or modified
    VigenciaNormativa,
    /// Conflict of interest
    ConflictoDeIntereses,
}

impl RiskCategory {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confidencialidad => "CONFIDENCIALIDAD",
            Self::DatosPersonales => "DATOS_PERSONALES",
            Self::MenoresDeEdad => "MENORES_DE_EDAD",
            Self::VigenciaNormativa => "VIGENCIA_NORMATIVA",
            Self::ConflictoDeIntereses => "CONFLICTO_DE_INTERESES",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval status of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    /// Not yet resolved
    Pending,
    /// Every required source resolved
    Supported,
    /// At least one required source failed
    Unsupported,
}

/// Role of a claim inside its section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimRole {
    /// The section's primary assertion
    Principal,
    /// Supporting assertion
    #[default]
    Apoyo,
}

/// An atomic legal assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    id: ClaimId,
    texto: String,
    jurisdiccion: Jurisdiccion,
    seccion: SectionId,
    rol: ClaimRole,
    required_sources: Vec<RequiredSource>,
    status: ClaimStatus,
    riesgos: BTreeSet<RiskCategory>,
    fuentes: Vec<FuenteId>,
}

impl Claim {
    /// Create a PENDING claim
    ///
    /// # Errors
    /// Returns [`ModelError::EmptySources`] when `required_sources` is empty.
    pub fn new(
        id: ClaimId,
        texto: impl Into<String>,
        seccion: SectionId,
        rol: ClaimRole,
        required_sources: Vec<RequiredSource>,
    ) -> Result<Self, ModelError> {
        if required_sources.is_empty() {
            return Err(ModelError::EmptySources(id));
        }
        Ok(Self {
            id,
            texto: texto.into(),
            jurisdiccion: Jurisdiccion::Colombia,
            seccion,
            rol,
            required_sources,
            status: ClaimStatus::Pending,
            riesgos: BTreeSet::new(),
            fuentes: Vec::new(),
        })
    }

    /// With flagged risk categories
    #[inline]
    #[must_use]
    pub fn with_riesgos(mut self, riesgos: impl IntoIterator<Item = RiskCategory>) -> Self {
        self.riesgos.extend(riesgos);
        self
    }

    /// Apply a retrieval resolution, consuming the pending claim
    #[must_use]
    pub fn resolve(mut self, resolution: &ClaimResolution) -> Self {
        match resolution {
            ClaimResolution::Supported { fuentes } if !fuentes.is_empty() => {
                self.status = ClaimStatus::Supported;
                self.fuentes = fuentes.clone();
            }
            _ => {
                self.status = ClaimStatus::Unsupported;
                self.fuentes.clear();
            }
        }
        self
    }

    /// Claim identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ClaimId {
        &self.id
    }

    /// Assertion text
    #[inline]
    #[must_use]
    pub fn texto(&self) -> &str {
        &self.texto
    }

    /// Jurisdiction
    #[inline]
    #[must_use]
    pub fn jurisdiccion(&self) -> Jurisdiccion {
        self.jurisdiccion
    }

    /// Owning section
    #[inline]
    #[must_use]
    pub fn seccion(&self) -> &SectionId {
        &self.seccion
    }

    /// Role within the section
    #[inline]
    #[must_use]
    pub fn rol(&self) -> ClaimRole {
        self.rol
    }

    /// Retrieval instructions, in planner order
    #[inline]
    #[must_use]
    pub fn required_sources(&self) -> &[RequiredSource] {
        &self.required_sources
    }

    /// Current status
    #[inline]
    #[must_use]
    pub fn status(&self) -> ClaimStatus {
        self.status
    }

    /// Flagged risk categories
    #[inline]
    #[must_use]
    pub fn riesgos(&self) -> &BTreeSet<RiskCategory> {
        &self.riesgos
    }

    /// Resolved sources; empty unless SUPPORTED
    #[inline]
    #[must_use]
    pub fn fuentes(&self) -> &[FuenteId] {
        &self.fuentes
    }

    /// Whether the claim may be drafted
    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.status == ClaimStatus::Supported
    }
}
