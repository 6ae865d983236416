use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScienceError};

// New format: YYMM.NNNN or YYMM.NNNNN (with optional version)
static NEW_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}\.\d{4,5})(v(\d+))?$").expect("valid arxiv regex"));

// Old format: category/YYMMNNN
static OLD_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z\-]+(?:\.[A-Z]{2})?/\d{7})(v(\d+))?$").expect("valid arxiv regex")
});

static ARXIV_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://(?:www\.)?arxiv\.org/(?:abs|pdf)/|arxiv:\s*)")
        .expect("valid arxiv prefix regex")
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArxivId {
    pub raw: String,
    /// Versionless identifier, e.g. `1706.03762` or `cs.AI/0601001`.
    pub id: String,
    pub version: Option<u32>,
    pub category: Option<String>,
}

impl ArxivId {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let stripped = ARXIV_PREFIX.replace(input, "");
        let stripped = stripped.trim().trim_end_matches(".pdf");

        let caps = NEW_FORMAT
            .captures(stripped)
            .or_else(|| OLD_FORMAT.captures(stripped))
            .ok_or_else(|| ScienceError::InvalidArxivId(input.to_string()))?;

        let id = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ScienceError::InvalidArxivId(input.to_string()))?;
        let version = caps.get(3).and_then(|v| v.as_str().parse::<u32>().ok());
        let category = id.split_once('/').map(|(cat, _)| cat.to_string());

        Ok(Self {
            raw: input.to_string(),
            id,
            version,
            category,
        })
    }

    pub fn abs_url(&self) -> String {
        format!("https://arxiv.org/abs/{}", self.id)
    }
}

/// Versionless arXiv id, or `None` if the input is not one.
pub fn normalize_arxiv_id(input: &str) -> Option<String> {
    ArxivId::parse(input).ok().map(|a| a.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_format_bare() {
        let id = ArxivId::parse("2301.04567").unwrap();
        assert_eq!(id.id, "2301.04567");
        assert_eq!(id.version, None);
        assert_eq!(id.abs_url(), "https://arxiv.org/abs/2301.04567");
    }

    #[test]
    fn new_format_with_version() {
        let id = ArxivId::parse("2301.04567v2").unwrap();
        assert_eq!(id.id, "2301.04567");
        assert_eq!(id.version, Some(2));
    }

    #[test]
    fn old_format_with_category() {
        let id = ArxivId::parse("cs.AI/0601001").unwrap();
        assert_eq!(id.id, "cs.AI/0601001");
        assert_eq!(id.category.as_deref(), Some("cs.AI"));
    }

    #[test]
    fn prefixes_and_urls() {
        assert_eq!(normalize_arxiv_id("arXiv:1706.03762v5").as_deref(), Some("1706.03762"));
        assert_eq!(normalize_arxiv_id("arxiv: 1706.03762").as_deref(), Some("1706.03762"));
        assert_eq!(
            normalize_arxiv_id("http://arxiv.org/pdf/1706.03762v1.pdf").as_deref(),
            Some("1706.03762")
        );
        assert_eq!(
            normalize_arxiv_id("https://arxiv.org/abs/1706.03762").as_deref(),
            Some("1706.03762")
        );
    }

    #[test]
    fn reject_garbage() {
        assert!(ArxivId::parse("").is_err());
        assert!(ArxivId::parse("not-an-id").is_err());
        assert_eq!(normalize_arxiv_id("12.345"), None);
    }
}
