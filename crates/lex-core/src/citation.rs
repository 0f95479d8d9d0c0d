//! In-text citation markers
//!
//! Drafts cite sources with `[F:<fuente-id>]`. The same parser is used by the
//! drafter's output check, the verifier and the finalizer, so all three agree
//! on what counts as a citation.

use crate::source::FuenteId;
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[F:([A-Za-z0-9_\-]+)\]").expect("valid citation pattern"));

/// Render the citation marker for a source
#[inline]
#[must_use]
pub fn marker(id: &FuenteId) -> String {
    format!("[F:{id}]")
}

/// Every distinct source id cited in `text`, in order of first appearance
#[must_use]
pub fn extract_citations(text: &str) -> IndexSet<FuenteId> {
    MARKER
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| FuenteId::new(m.as_str()))
        .collect()
}

/// Text with every citation marker removed
#[must_use]
pub fn strip_citations(text: &str) -> String {
    MARKER.replace_all(text, "").into_owned()
}

/// Whether `text` carries at least one citation marker
#[inline]
#[must_use]
pub fn has_citation(text: &str) -> bool {
    MARKER.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_order_without_duplicates() {
        let text = "Uno [F:NOR-aa11]. Dos [F:JUR-bb22] y otra vez [F:NOR-aa11].";
        let ids: Vec<_> = extract_citations(text).into_iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["NOR-aa11", "JUR-bb22"]);
    }

    #[test]
    fn marker_round_trips_through_extraction() {
        let id = FuenteId::new("DOC-0123456789ab");
        let text = format!("Según la doctrina {}.", marker(&id));
        assert!(has_citation(&text));
        assert!(extract_citations(&text).contains(&id));
    }

    #[test]
    fn malformed_markers_ignored() {
        assert!(extract_citations("[F:] [F: NOR-1] [X:NOR-1] F:NOR-1").is_empty());
    }

    #[test]
    fn strip_removes_markers() {
        assert_eq!(strip_citations("Texto [F:NOR-1] final"), "Texto  final");
    }
}
