//! Text normalization helpers shared by retrieval, drafting and scoring
//!
//! All lexical comparisons in the pipeline go through [`normalize`] so that
//! accents, casing and punctuation never decide whether two texts match.

use indexmap::IndexSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Spanish function words ignored when extracting content terms
const STOPWORDS: &[&str] = &[
    "al", "ante", "con", "como", "cual", "cuando", "del", "desde", "donde", "el", "ella", "en",
    "entre", "era", "es", "esta", "este", "esto", "fue", "han", "hay", "la", "las", "le", "les",
    "lo", "los", "mas", "muy", "no", "para", "pero", "por", "que", "se", "segun", "ser", "si",
    "sin", "sobre", "son", "su", "sus", "tal", "tambien", "un", "una", "uno", "unos", "unas",
    "y", "ya", "de", "a", "o", "e", "u",
];

/// Abbreviations whose trailing period does not end a sentence (folded)
const ABBREVIATIONS: &[&str] = &[
    "art", "arts", "num", "nums", "nro", "inc", "lit", "par", "parag", "sent", "exp", "rad", "dr", "dra",
    "sr", "sra", "mp", "cfr", "pag", "pags", "pp", "ss", "cons", "ord", "dec", "res", "ibid", "op", "cit",
];

/// Lowercase, strip diacritics, turn punctuation into spaces and collapse
/// whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.nfd().filter(|c| !is_combining_mark(*c)).flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Content terms of a text, in first-seen order
///
/// A term is kept when it is not a stopword and is either at least three
/// characters long or purely numeric (article and law numbers).
#[must_use]
pub fn content_terms(text: &str) -> IndexSet<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .filter(|t| !STOPWORDS.contains(t))
        .filter(|t| t.chars().count() >= 3 || t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Share of `query` content terms present in `text`, in `[0, 1]`
///
/// A query without content terms has zero coverage.
#[must_use]
pub fn term_coverage(query: &str, text: &str) -> f64 {
    let wanted = content_terms(query);
    if wanted.is_empty() {
        return 0.0;
    }
    let present = content_terms(text);
    let hits = wanted.iter().filter(|t| present.contains(*t)).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = hits as f64 / wanted.len() as f64;
    ratio
}

/// Whether `needle` appears in `haystack` once both are normalized
#[must_use]
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    let needle = normalize(needle);
    if needle.is_empty() {
        return false;
    }
    let haystack = format!(" {} ", normalize(haystack));
    haystack.contains(&format!(" {needle} "))
}

/// Split prose into sentences on terminal punctuation followed by whitespace
///
/// A period closing a known abbreviation (`art.`, `núm.`, `inc.`, `Sent.`)
/// does not end the sentence.
#[must_use]
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, c) in text.char_indices() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let next = bytes.get(i + 1).copied();
        if !next.map_or(true, |b| b.is_ascii_whitespace()) {
            continue;
        }
        if c == '.' && next.is_some() && is_abbreviation(&text[start..i]) {
            continue;
        }
        let s = text[start..=i].trim();
        if !s.is_empty() {
            out.push(s);
        }
        start = i + 1;
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Whether `before` ends with an abbreviation word
fn is_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(|c: char| !c.is_alphabetic())
        .next()
        .unwrap_or_default();
    !word.is_empty() && ABBREVIATIONS.contains(&normalize(word).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_accents_and_punctuation() {
        assert_eq!(normalize("  Responsabilidad   Civil, Extracontractual!"), "responsabilidad civil extracontractual");
        assert_eq!(normalize("Daños y PERJUICIOS"), "danos y perjuicios");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn content_terms_skip_stopwords_and_keep_numbers() {
        let terms = content_terms("La Ley 1480 de 2011 sobre el consumidor");
        let terms: Vec<_> = terms.into_iter().collect();
        assert_eq!(terms, vec!["ley", "1480", "2011", "consumidor"]);
    }

    #[test]
    fn coverage_is_bounded() {
        assert!((term_coverage("responsabilidad civil", "la responsabilidad civil exige daño") - 1.0).abs() < f64::EPSILON);
        assert!((term_coverage("responsabilidad civil", "la responsabilidad penal") - 0.5).abs() < f64::EPSILON);
        assert_eq!(term_coverage("de la", "cualquier texto"), 0.0);
    }

    #[test]
    fn contains_respects_word_boundaries() {
        assert!(contains_normalized("El daño debe ser cierto.", "daño debe ser cierto"));
        assert!(!contains_normalized("El dañoso acto", "daño"));
        assert!(!contains_normalized("texto", ""));
    }

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        let s = sentences("Primera frase [F:NOR-1]. Segunda frase? Tercera");
        assert_eq!(s, vec!["Primera frase [F:NOR-1].", "Segunda frase?", "Tercera"]);
    }

    #[test]
    fn normalize_strips_any_combining_mark() {
        assert_eq!(normalize("Conceição"), "conceicao");
        assert_eq!(normalize("Façade Ýñigo"), "facade ynigo");
        // Decomposed input folds the same as precomposed.
        assert_eq!(normalize("cafe\u{0301}"), normalize("café"));
        assert!(contains_normalized("Sentencia de Conceicao", "Conceição"));
    }

    #[test]
    fn sentences_do_not_split_after_abbreviations() {
        let s = sentences(
            "Conforme al art. 2341 del Código Civil, quien cause daño debe indemnizar [F:NOR-1]. \
             Véase la Sent. T-025 y el núm. 3 del inc. 2 [F:JUR-2]. Fin.",
        );
        assert_eq!(
            s,
            vec![
                "Conforme al art. 2341 del Código Civil, quien cause daño debe indemnizar [F:NOR-1].",
                "Véase la Sent. T-025 y el núm. 3 del inc. 2 [F:JUR-2].",
                "Fin.",
            ]
        );
    }

    #[test]
    fn abbreviation_at_end_of_text_still_closes() {
        assert_eq!(sentences("Según el art."), vec!["Según el art."]);
    }

    #[test]
    fn sentences_keep_decimal_points() {
        let s = sentences("Artículo 2.3.1 del decreto. Fin.");
        assert_eq!(s, vec!["Artículo 2.3.1 del decreto.", "Fin."]);
    }
}
