//! Canonical forms of titles and person names used for comparison.
//!
//! Everything here is total: empty or odd input yields an empty or
//! unchanged string, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

static LATEX_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([^$]*)\$").expect("valid latex math regex"));

static LATEX_COMMAND_WITH_ARG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[a-zA-Z]+\{([^}]*)\}").expect("valid latex command regex"));

static LATEX_BARE_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[a-zA-Z]+").expect("valid latex bare command regex"));

static HTML_LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*br\s*/?\s*>").expect("valid br regex"));

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));

/// Characters that separate words in a title once punctuation is dropped.
const TITLE_PUNCTUATION: &[char] = &[
    ',', '.', ';', ':', '!', '?', '\n', '\t', '\r', '\'', '"', '-', '(', ')', '[', ']', '{', '}',
    '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}',
];

/// Substrings that mark a structurally present but meaningless value.
const PLACEHOLDER_MARKERS: &[&str] = &["n/a", "tbd", "unknown", "placeholder"];

/// Transliterate to ASCII: accents are stripped, other scripts are
/// romanized (`β` -> `b`, `Привет` -> `Privet`). Characters with no
/// transliteration are dropped.
pub fn fold_to_ascii(s: &str) -> String {
    deunicode::deunicode_with_tofu(s, "")
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison form of a title.
///
/// Drops LaTeX math delimiters and formatting commands (keeping their
/// content), transliterates to ASCII, lowercases, turns punctuation into
/// spaces and collapses whitespace. Idempotent; the result is always ASCII.
pub fn normalize_title(title: &str) -> String {
    if title.trim().is_empty() {
        return String::new();
    }

    let folded = fold_to_ascii(title).to_lowercase();
    let without_math = LATEX_MATH.replace_all(&folded, "$1");
    let without_args = LATEX_COMMAND_WITH_ARG.replace_all(&without_math, "$1");
    let without_commands = LATEX_BARE_COMMAND.replace_all(&without_args, "");

    let spaced: String = without_commands
        .chars()
        .map(|c| if TITLE_PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();
    collapse_whitespace(&spaced)
}

/// Trim whitespace and one or two trailing full stops, leaving ellipses alone.
pub fn trim_trailing_period(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.ends_with('…') || trimmed.ends_with("...") {
        return trimmed.to_string();
    }

    let dots = trimmed.chars().rev().take_while(|c| *c == '.').count();
    if dots == 0 || dots >= 3 {
        return trimmed.to_string();
    }
    trimmed[..trimmed.len() - dots].trim_end().to_string()
}

/// True when a value is missing in substance: empty, an ellipsis,
/// "et al", or one of the usual "n/a"-style fillers.
pub fn has_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.contains("...") || trimmed.contains('…') {
        return true;
    }
    let lower = trimmed.to_lowercase();
    if lower.contains("et al") {
        return true;
    }
    PLACEHOLDER_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Comparison form of a person name: folded, lowercase, punctuation as spaces.
pub fn normalize_person_name(name: &str) -> String {
    let folded = fold_to_ascii(name).to_lowercase();
    let cleaned: String = folded
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&cleaned)
}

/// Remove HTML/XML tags (line breaks become spaces) and collapse whitespace.
pub fn strip_markup(s: &str) -> String {
    if !s.contains('<') {
        return s.trim().to_string();
    }
    let with_breaks = HTML_LINE_BREAK.replace_all(s, " ");
    let without_tags = HTML_TAG.replace_all(&with_breaks, " ");
    collapse_whitespace(&without_tags)
}
