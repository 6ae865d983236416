use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque provenance label of a metadata source ("crossref", "arxiv", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTag(String);

impl SourceTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceTag {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a source in a [`TrustOrder`]. Lower is more trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrustRank(usize);

impl TrustRank {
    pub fn index(&self) -> usize {
        self.0
    }

    pub fn outranks(&self, other: TrustRank) -> bool {
        self.0 < other.0
    }

    /// How many tiers `self` sits above `other` (0 when not above).
    pub fn tiers_above(&self, other: TrustRank) -> usize {
        other.0.saturating_sub(self.0)
    }
}

/// Total order over source tags, most trusted first.
///
/// Tags that are not listed share one rank below every listed tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustOrder(Vec<SourceTag>);

impl TrustOrder {
    pub fn new<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SourceTag>,
    {
        let mut seen = Vec::new();
        for tag in tags {
            let tag = tag.into();
            if !seen.contains(&tag) {
                seen.push(tag);
            }
        }
        Self(seen)
    }

    pub fn rank(&self, tag: &SourceTag) -> TrustRank {
        TrustRank(self.0.iter().position(|t| t == tag).unwrap_or(self.0.len()))
    }

    /// The shared rank of every unlisted tag.
    pub fn unlisted_rank(&self) -> TrustRank {
        TrustRank(self.0.len())
    }

    pub fn contains(&self, tag: &SourceTag) -> bool {
        self.0.contains(tag)
    }

    pub fn tags(&self) -> &[SourceTag] {
        &self.0
    }
}

impl Default for TrustOrder {
    fn default() -> Self {
        Self::new([
            "csl",
            "doi_bibtex",
            "datacite",
            "pubmed",
            "europepmc",
            "crossref",
            "openalex",
            "s2",
            "orcid",
            "openreview",
            "arxiv",
            "scholar_page",
            "scholar_min",
        ])
    }
}
