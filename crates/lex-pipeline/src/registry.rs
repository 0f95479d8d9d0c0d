//! Tool registry for source fetchers
//!
//! Provides [`ToolRegistry`], mapping a typed [`LegalTool`] tag to the fetcher
//! that handles it.

use crate::cache::CachedFetcher;
use crate::collaborators::SourceFetcher;
use crate::config::CacheConfig;
use lex_core::SourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Legal research tool, one per source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalTool {
    /// Statute and decree search
    BuscarNorma,
    /// Case-law search
    BuscarJurisprudencia,
    /// Doctrine search
    BuscarDoctrina,
}

impl LegalTool {
    /// All tools
    pub const ALL: [LegalTool; 3] = [Self::BuscarNorma, Self::BuscarJurisprudencia, Self::BuscarDoctrina];

    /// Tool responsible for a source kind
    #[inline]
    #[must_use]
    pub const fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Norma => Self::BuscarNorma,
            SourceKind::Jurisprudencia => Self::BuscarJurisprudencia,
            SourceKind::Doctrina => Self::BuscarDoctrina,
        }
    }

    /// Tool name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuscarNorma => "buscar_norma",
            Self::BuscarJurisprudencia => "buscar_jurisprudencia",
            Self::BuscarDoctrina => "buscar_doctrina",
        }
    }
}

impl fmt::Display for LegalTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry of fetchers keyed by tool
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: BTreeMap<LegalTool, Arc<dyn SourceFetcher>>,
}

impl ToolRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry where every tool is handled by the same fetcher
    #[must_use]
    pub fn with_fetcher_for_all(fetcher: Arc<dyn SourceFetcher>) -> Self {
        let mut registry = Self::new();
        for tool in LegalTool::ALL {
            registry.register(tool, Arc::clone(&fetcher));
        }
        registry
    }

    /// Register (or replace) the handler for a tool
    pub fn register(&mut self, tool: LegalTool, fetcher: Arc<dyn SourceFetcher>) {
        self.handlers.insert(tool, fetcher);
    }

    /// With a handler for a tool
    #[inline]
    #[must_use]
    pub fn with(mut self, tool: LegalTool, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.register(tool, fetcher);
        self
    }

    /// Remove a tool's handler
    #[inline]
    pub fn remove(&mut self, tool: LegalTool) -> bool {
        self.handlers.remove(&tool).is_some()
    }

    /// Handler for a tool
    #[inline]
    #[must_use]
    pub fn get(&self, tool: LegalTool) -> Option<&Arc<dyn SourceFetcher>> {
        self.handlers.get(&tool)
    }

    /// Handler for a source kind
    #[inline]
    #[must_use]
    pub fn handler_for(&self, kind: SourceKind) -> Option<&Arc<dyn SourceFetcher>> {
        self.get(LegalTool::for_kind(kind))
    }

    /// Check if a tool has a handler
    #[inline]
    #[must_use]
    pub fn contains(&self, tool: LegalTool) -> bool {
        self.handlers.contains_key(&tool)
    }

    /// Registered tools
    #[must_use]
    pub fn tools(&self) -> Vec<LegalTool> {
        self.handlers.keys().copied().collect()
    }

    /// Get number of registered tools
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Wrap every handler in a fetch-result cache
    ///
    /// Returns the registry unchanged when caching is disabled.
    #[must_use]
    pub fn cached(self, config: &CacheConfig) -> Self {
        if !config.enabled {
            return self;
        }
        let handlers = self
            .handlers
            .into_iter()
            .map(|(tool, fetcher)| {
                let cached: Arc<dyn SourceFetcher> = Arc::new(CachedFetcher::new(fetcher, config));
                (tool, cached)
            })
            .collect();
        Self { handlers }
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use lex_core::{RawDocument, RequiredSource};

    struct Empty;

    #[async_trait::async_trait]
    impl SourceFetcher for Empty {
        async fn fetch(&self, _source: &RequiredSource) -> Result<Vec<RawDocument>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn one_tool_per_kind() {
        for kind in SourceKind::ALL {
            assert!(LegalTool::ALL.contains(&LegalTool::for_kind(kind)));
        }
        assert_eq!(LegalTool::for_kind(SourceKind::Jurisprudencia).as_str(), "buscar_jurisprudencia");
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        registry.register(LegalTool::BuscarNorma, Arc::new(Empty));
        assert!(registry.handler_for(SourceKind::Norma).is_some());
        assert!(registry.handler_for(SourceKind::Doctrina).is_none());
        assert!(registry.remove(LegalTool::BuscarNorma));
        assert!(!registry.contains(LegalTool::BuscarNorma));
    }

    #[test]
    fn shared_fetcher_covers_all_tools() {
        let registry = ToolRegistry::with_fetcher_for_all(Arc::new(Empty));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.tools(), LegalTool::ALL.to_vec());
    }

    #[test]
    fn disabled_cache_keeps_registry() {
        let registry = ToolRegistry::with_fetcher_for_all(Arc::new(Empty)).cached(&CacheConfig::disabled());
        assert_eq!(registry.len(), 3);
    }
}
