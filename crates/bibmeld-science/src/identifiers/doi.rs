use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::arxiv::normalize_arxiv_id;
use crate::error::{Result, ScienceError};

static DOI_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://(?:dx\.)?doi\.org/|doi:\s*)").expect("valid doi prefix regex")
});

/// Registrant prefix arXiv mints its preprint DOIs under.
const ARXIV_DOI_PREFIX: &str = "10.48550/arxiv.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
    pub url: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let stripped = DOI_PREFIX.replace(input, "");
        let stripped = stripped.trim();

        // Must start with "10.", contain "/", and have a non-empty suffix
        if !stripped.starts_with("10.") {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        }
        let slash_pos = stripped
            .find('/')
            .ok_or_else(|| ScienceError::InvalidDoi(input.to_string()))?;
        if stripped[slash_pos + 1..].trim().is_empty() {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        }

        let normalized = stripped.to_lowercase();
        let url = format!("https://doi.org/{normalized}");

        Ok(Self {
            raw: input.to_string(),
            normalized,
            url,
        })
    }

    /// DOIs minted by arXiv for preprints (`10.48550/arxiv.*`), whatever
    /// the id style after the prefix.
    pub fn is_arxiv_minted(&self) -> bool {
        self.normalized.starts_with(ARXIV_DOI_PREFIX)
    }

    /// The arXiv id embedded in an arXiv-minted DOI.
    pub fn arxiv_id(&self) -> Option<String> {
        self.normalized
            .strip_prefix(ARXIV_DOI_PREFIX)
            .and_then(normalize_arxiv_id)
    }
}

/// Canonical comparison form of a DOI, or `None` if the input is not one.
pub fn normalize_doi(input: &str) -> Option<String> {
    Doi::parse(input).ok().map(|doi| doi.normalized)
}

pub fn is_arxiv_doi(doi: &str) -> bool {
    Doi::parse(doi).is_ok_and(|d| d.is_arxiv_minted())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_doi() {
        let doi = Doi::parse("10.1000/xyz123").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
        assert_eq!(doi.url, "https://doi.org/10.1000/xyz123");
    }

    #[test]
    fn doi_url_prefix_is_stripped_and_lowercased() {
        assert_eq!(
            normalize_doi("https://doi.org/10.1111/AAA").as_deref(),
            Some("10.1111/aaa")
        );
        assert_eq!(
            normalize_doi("HTTP://DX.DOI.ORG/10.1000/Xyz").as_deref(),
            Some("10.1000/xyz")
        );
    }

    #[test]
    fn doi_colon_prefix_any_case() {
        assert_eq!(normalize_doi("doi:10.1000/xyz123").as_deref(), Some("10.1000/xyz123"));
        assert_eq!(normalize_doi("DOI: 10.1000/xyz123").as_deref(), Some("10.1000/xyz123"));
        assert_eq!(normalize_doi("Doi:10.1000/ABC").as_deref(), Some("10.1000/abc"));
    }

    #[test]
    fn reject_non_dois() {
        assert!(Doi::parse("not-a-doi").is_err());
        assert!(Doi::parse("10.1000").is_err());
        assert!(Doi::parse("10.1000/  ").is_err());
        assert_eq!(normalize_doi(""), None);
        assert_eq!(normalize_doi("https://doi.org/"), None);
    }

    #[test]
    fn arxiv_minted_dois() {
        let doi = Doi::parse("10.48550/arXiv.1706.03762").unwrap();
        assert!(doi.is_arxiv_minted());
        assert_eq!(doi.arxiv_id().as_deref(), Some("1706.03762"));
        assert!(!is_arxiv_doi("10.5555/3295222.3295349"));
        assert!(is_arxiv_doi("https://doi.org/10.48550/ARXIV.2401.12345"));
    }

    #[test]
    fn old_style_arxiv_dois_are_still_arxiv_minted() {
        let doi = Doi::parse("10.48550/arXiv.hep-th/9901001").unwrap();
        assert!(doi.is_arxiv_minted());
        assert_eq!(doi.arxiv_id().as_deref(), Some("hep-th/9901001"));

        // prefix alone decides, even when the id part is not parseable
        let odd = Doi::parse("10.48550/arxiv.something-else").unwrap();
        assert!(odd.is_arxiv_minted());
        assert_eq!(odd.arxiv_id(), None);
    }
}
