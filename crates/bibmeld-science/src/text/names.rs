//! Person-name signatures and author-list parsing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::normalize::normalize_person_name;

/// "H Huang", "D.V. Arnold", "JK Rowling": initials, a space, then a surname.
static ABBREVIATED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z]\.?\s*[A-Z]?\.?\s*[A-Z]?\.?\s+[A-Z][a-z]+")
        .expect("valid abbreviated name regex")
});

const ET_AL: &str = "et al.";

/// Keys that hold an author list inside a JSON object.
const AUTHOR_KEYS: &[&str] = &["authors", "author", "authorids", "creators", "contributors"];

/// Last name plus initials; the unit of fuzzy author comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSignature {
    pub last: String,
    pub initials: String,
}

impl NameSignature {
    /// Same last name and compatible initials (either side empty, equal, or a prefix).
    pub fn is_compatible(&self, other: &NameSignature) -> bool {
        if self.last != other.last {
            return false;
        }
        let (a, b) = (&self.initials, &other.initials);
        a.is_empty() || b.is_empty() || a.starts_with(b.as_str()) || b.starts_with(a.as_str())
    }
}

/// Reduce a name to `{last, initials}`.
///
/// "Last, First Middle" and "First Middle Last" are both understood.
/// Returns `None` when no usable last name exists.
pub fn name_signature(name: &str) -> Option<NameSignature> {
    let clean = normalize_person_name(name);
    if clean.is_empty() || clean == "et al" {
        return None;
    }

    if name.contains(',') {
        let mut parts = name.split(',').map(str::trim);
        let last_raw = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();
        let last: String = normalize_person_name(last_raw)
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        if last.is_empty() {
            return None;
        }
        let initials = initials_of(normalize_person_name(rest).split_whitespace());
        return Some(NameSignature { last, initials });
    }

    let tokens: Vec<&str> = clean.split_whitespace().collect();
    let (last, given) = tokens.split_last()?;
    Some(NameSignature {
        last: (*last).to_string(),
        initials: initials_of(given.iter().copied()),
    })
}

fn initials_of<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens.filter_map(|t| t.chars().next()).collect()
}

/// Split a free-form author string into individual names.
///
/// Separators, in priority order: " and ", "et al" (kept as a trailing
/// `et al.` marker), ";", then commas. A single comma is read as
/// "Last, First" unless both halves look like separate names.
pub fn parse_authors(raw: &str) -> Vec<String> {
    let s = raw.trim();
    if s.is_empty() {
        return Vec::new();
    }

    if s.contains(" and ") {
        return split_nonempty(s, " and ");
    }

    if s.contains(" et al") {
        let cleaned = s.replace(" et al.", "").replace(" et al", "");
        let mut names = if cleaned.contains(',') {
            split_nonempty(&cleaned, ",")
        } else {
            vec![cleaned.trim().to_string()]
        };
        names.retain(|n| !n.is_empty());
        names.push(ET_AL.to_string());
        return names;
    }

    if s.contains(';') {
        return split_nonempty(s, ";");
    }

    if s.contains(',') && s.contains(' ') {
        if s.matches(',').count() > 1 {
            return split_nonempty(s, ",");
        }
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let all_abbreviated = parts.iter().all(|p| ABBREVIATED_NAME.is_match(p));
        let all_spaced = parts.iter().all(|p| p.contains(' '));
        if all_abbreviated || all_spaced {
            return parts
                .into_iter()
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    vec![s.to_string()]
}

fn split_nonempty(s: &str, sep: &str) -> Vec<String> {
    s.split(sep)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Author names from an arbitrary JSON shape: a string, a list of strings,
/// a list of `{name}` / `{given|first, family|last}` objects, or an object
/// holding one of those under an author-like key.
pub fn authors_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => parse_authors(s),
        Value::Array(items) => items.iter().filter_map(name_from_item).collect(),
        Value::Object(map) => {
            for key in AUTHOR_KEYS {
                if let Some(inner) = map.get(*key) {
                    let names = authors_from_value(inner);
                    if !names.is_empty() {
                        return names;
                    }
                }
            }
            name_from_item(value).into_iter().collect()
        }
        Value::Null => Vec::new(),
        other => parse_authors(&other.to_string()),
    }
}

fn name_from_item(item: &Value) -> Option<String> {
    let name = match item {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => {
            let text = |key: &str| {
                map.get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string()
            };
            let full = text("name");
            if full.is_empty() {
                let given = Some(text("given")).filter(|s| !s.is_empty()).unwrap_or_else(|| text("first"));
                let family = Some(text("family")).filter(|s| !s.is_empty()).unwrap_or_else(|| text("last"));
                format!("{given} {family}").trim().to_string()
            } else {
                full
            }
        }
        Value::Null => String::new(),
        other => other.to_string(),
    };
    (!name.is_empty()).then_some(name)
}

/// Whether `target` appears among already-parsed `names`.
///
/// Signature compatibility first; when initials disagree, a substring match
/// between the normalized full names still counts.
pub fn author_matches_names<S: AsRef<str>>(target: &str, names: &[S]) -> bool {
    let Some(target_sig) = name_signature(target) else {
        return false;
    };

    for name in names {
        let name = name.as_ref();
        let Some(sig) = name_signature(name) else {
            continue;
        };
        if sig.last != target_sig.last {
            continue;
        }
        if target_sig.is_compatible(&sig) {
            return true;
        }
        let t = normalize_person_name(target);
        let c = normalize_person_name(name);
        if t.contains(&c) || c.contains(&t) {
            return true;
        }
    }
    false
}

/// Whether `target` appears in a raw author string.
pub fn author_name_matches(target: &str, authors: &str) -> bool {
    author_matches_names(target, &parse_authors(authors))
}

/// True if any name in `a` is signature-compatible with any name in `b`.
pub fn names_overlap<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    let sigs_b: Vec<NameSignature> = b.iter().filter_map(|n| name_signature(n.as_ref())).collect();
    if sigs_b.is_empty() {
        return false;
    }
    a.iter()
        .filter_map(|n| name_signature(n.as_ref()))
        .any(|sa| sigs_b.iter().any(|sb| sa.is_compatible(sb)))
}

/// [`names_overlap`] over two raw author strings.
pub fn authors_overlap(a: &str, b: &str) -> bool {
    names_overlap(&parse_authors(a), &parse_authors(b))
}

/// Whether the target's last name occurs as a whole word in `text`.
pub fn author_in_text(target: &str, text: &str) -> bool {
    let Some(sig) = name_signature(target) else {
        return false;
    };
    normalize_person_name(text)
        .split_whitespace()
        .any(|word| word == sig.last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signature_first_last() {
        let sig = name_signature("Dirk V. Arnold").unwrap();
        assert_eq!(sig.last, "arnold");
        assert_eq!(sig.initials, "dv");
    }

    #[test]
    fn signature_last_comma_first() {
        let sig = name_signature("Vaswani, Ashish").unwrap();
        assert_eq!(sig.last, "vaswani");
        assert_eq!(sig.initials, "a");

        let sig = name_signature("van der Berg, J. K.").unwrap();
        assert_eq!(sig.last, "vanderberg");
        assert_eq!(sig.initials, "jk");
    }

    #[test]
    fn signature_rejects_unusable_names() {
        assert!(name_signature("").is_none());
        assert!(name_signature("...").is_none());
        assert!(name_signature(", John").is_none());
        assert!(name_signature("et al.").is_none());
    }

    #[test]
    fn author_name_matches_initials() {
        assert!(author_name_matches("Hong Huang", "H Huang"));
        assert!(!author_name_matches("H Huang", "K Huang"));
        assert!(author_name_matches("Geoffrey Hinton", "Hinton"));
        assert!(!author_name_matches("", "Hinton"));
    }

    #[test]
    fn author_name_matches_substring_fallback() {
        // initials "jm" vs "m" disagree, but the shorter name is contained
        assert!(author_matches_names("Jean Marc Smith", &["Marc Smith"]));
    }

    #[test]
    fn authors_overlap_mixed_formats() {
        assert!(authors_overlap("H Huang, DV Arnold", "Hong Huang and Dirk V. Arnold"));
        assert!(!authors_overlap("H Huang", "K Huang"));
        assert!(!authors_overlap("", "Hong Huang"));
    }

    #[test]
    fn parse_authors_separators() {
        assert_eq!(parse_authors("Hinton, LeCun, Bengio").len(), 3);
        assert_eq!(parse_authors("Vaswani, Ashish"), vec!["Vaswani, Ashish"]);
        assert_eq!(parse_authors("J Devlin, M Chang"), vec!["J Devlin", "M Chang"]);
        assert_eq!(
            parse_authors("Ashish Vaswani and Noam Shazeer"),
            vec!["Ashish Vaswani", "Noam Shazeer"]
        );
        assert_eq!(parse_authors("A. Smith; B. Jones"), vec!["A. Smith", "B. Jones"]);
        assert_eq!(parse_authors("Smith et al."), vec!["Smith", "et al."]);
        assert_eq!(
            parse_authors("Smith, Jones et al."),
            vec!["Smith", "Jones", "et al."]
        );
        assert!(parse_authors("   ").is_empty());
    }

    #[test]
    fn authors_from_json_shapes() {
        assert_eq!(
            authors_from_value(&json!([{"given": "Ashish", "family": "Vaswani"}, {"name": "Noam Shazeer"}])),
            vec!["Ashish Vaswani", "Noam Shazeer"]
        );
        assert_eq!(
            authors_from_value(&json!({"authors": ["A Smith", " ", "B Jones"]})),
            vec!["A Smith", "B Jones"]
        );
        assert_eq!(
            authors_from_value(&json!({"first": "Ada", "last": "Lovelace"})),
            vec!["Ada Lovelace"]
        );
        assert!(authors_from_value(&Value::Null).is_empty());
    }

    #[test]
    fn author_in_text_needs_whole_word() {
        assert!(author_in_text("Yann LeCun", "by Y. LeCun and others"));
        assert!(!author_in_text("Ng", "Learning things"));
    }
}
