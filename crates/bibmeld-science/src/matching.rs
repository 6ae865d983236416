//! Strict same-publication decisions between two canonical records.

use bibmeld_core::{CanonicalRecord, MatchConfig};
use serde::Serialize;

use crate::identifiers::{arxiv_eprint_of, normalize_doi};
use crate::similarity::{Scorable, title_similarity, year_range};
use crate::text::{names_overlap, normalize_title};

/// Which evidence decided an identity comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityBasis {
    Doi,
    Arxiv,
    /// Title, year and author heuristics.
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdentityDecision {
    pub same: bool,
    pub basis: IdentityBasis,
    /// Title similarity, when the fuzzy path computed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_similarity: Option<f64>,
}

impl IdentityDecision {
    fn by(basis: IdentityBasis, same: bool) -> Self {
        Self {
            same,
            basis,
            title_similarity: None,
        }
    }
}

/// Decide whether `a` and `b` describe the same publication.
///
/// DOIs decide when both records carry one, in both directions, before
/// titles are even looked at. Otherwise arXiv ids decide. Otherwise titles
/// must be near-identical (`strict_title_threshold`), known years at most
/// `strict_year_window` apart, and the author lists must share a person.
pub fn compare_identity(
    a: &CanonicalRecord,
    b: &CanonicalRecord,
    config: &MatchConfig,
) -> IdentityDecision {
    let doi_a = a.doi().and_then(normalize_doi);
    let doi_b = b.doi().and_then(normalize_doi);
    if let (Some(da), Some(db)) = (&doi_a, &doi_b) {
        return IdentityDecision::by(IdentityBasis::Doi, da == db);
    }

    if let (Some(xa), Some(xb)) = (arxiv_eprint_of(a), arxiv_eprint_of(b)) {
        return IdentityDecision::by(IdentityBasis::Arxiv, xa == xb);
    }

    let mut decision = IdentityDecision::by(IdentityBasis::Fuzzy, false);
    let (Some(title_a), Some(title_b)) = (Scorable::title(a), Scorable::title(b)) else {
        return decision;
    };
    if normalize_title(title_a).is_empty() || normalize_title(title_b).is_empty() {
        return decision;
    }

    let similarity = title_similarity(title_a, title_b);
    decision.title_similarity = Some(similarity);
    if similarity < config.strict_title_threshold {
        return decision;
    }

    let range = year_range(config);
    if let (Some(ya), Some(yb)) = (Scorable::year(a, range), Scorable::year(b, range))
        && (ya - yb).abs() > config.strict_year_window
    {
        return decision;
    }

    decision.same = names_overlap(&a.author_names(), &b.author_names());
    decision
}

pub fn is_same_publication(a: &CanonicalRecord, b: &CanonicalRecord, config: &MatchConfig) -> bool {
    compare_identity(a, b, config).same
}
