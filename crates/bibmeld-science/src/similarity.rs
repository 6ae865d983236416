//! Weighted relatedness scoring of candidates against a [`MatchTarget`].

use bibmeld_core::{CanonicalRecord, Field, ListedPublication, MatchConfig, MatchTarget};
use serde::Serialize;
use serde_json::Value;

use crate::text::{
    YearRange, author_in_text, author_matches_names, authors_from_value, normalize_title,
    parse_authors, year_from_str, year_from_value,
};

/// Tolerance for threshold comparisons of additive float scores
/// (0.7 + 0.2 must clear a 0.9 bar).
const SCORE_EPSILON: f64 = 1e-9;

pub(crate) fn meets_threshold(score: f64, threshold: f64) -> bool {
    score + SCORE_EPSILON >= threshold
}

pub(crate) fn year_range(config: &MatchConfig) -> YearRange {
    YearRange::new(config.min_year, config.max_year)
}

/// Both years known and no more than `window` apart.
pub(crate) fn years_within(a: Option<i32>, b: Option<i32>, window: i32) -> bool {
    matches!((a, b), (Some(a), Some(b)) if (a - b).abs() <= window)
}

/// Anything that can be scored: it exposes a title, authors and a year.
///
/// A candidate without a title is malformed and is skipped by rankers.
pub trait Scorable {
    fn title(&self) -> Option<&str>;

    fn author_names(&self) -> Vec<String>;

    fn year(&self, range: YearRange) -> Option<i32>;

    /// Free text searched by the exact-match author fallback.
    fn author_text(&self) -> String {
        self.author_names().join(" and ")
    }
}

impl Scorable for CanonicalRecord {
    fn title(&self) -> Option<&str> {
        self.get(&Field::Title)
    }

    fn author_names(&self) -> Vec<String> {
        self.author().map(parse_authors).unwrap_or_default()
    }

    fn year(&self, range: YearRange) -> Option<i32> {
        self.get(&Field::Year).and_then(|y| year_from_str(y, range))
    }

    fn author_text(&self) -> String {
        self.author().unwrap_or_default().to_string()
    }
}

impl Scorable for ListedPublication {
    fn title(&self) -> Option<&str> {
        Some(self.title.trim()).filter(|t| !t.is_empty())
    }

    fn author_names(&self) -> Vec<String> {
        self.authors.clone()
    }

    fn year(&self, range: YearRange) -> Option<i32> {
        self.year
            .filter(|y| (range.min..=range.max).contains(y))
    }
}

/// Raw API payloads (`{"title": .., "authors": .., "year": ..}`).
impl Scorable for Value {
    fn title(&self) -> Option<&str> {
        self.get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    fn author_names(&self) -> Vec<String> {
        authors_from_value(self)
    }

    fn year(&self, range: YearRange) -> Option<i32> {
        year_from_value(self, range)
    }
}

/// Similarity of two titles in `[0, 1]` after normalization.
///
/// Equal normalized forms score exactly 1.0; otherwise the normalized
/// Levenshtein ratio. Symmetric.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_title(a);
    let nb = normalize_title(b);
    if na == nb {
        return 1.0;
    }
    strsim::normalized_levenshtein(&na, &nb)
}

/// How a candidate was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Normalized titles equal (and author hint satisfied); scoring skipped.
    Exact,
    Scored,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredCandidate<'a, C> {
    pub score: f64,
    pub kind: MatchKind,
    pub candidate: &'a C,
}

/// Additive relatedness of `candidate` to `target`.
///
/// `None` marks a malformed candidate (no title). A title below
/// `title_sim_min`, or an author hint that matches nobody, yields `Some(0.0)`:
/// the author is a hard filter when given, not just a bonus.
pub fn score<C: Scorable + ?Sized>(
    target: &MatchTarget,
    candidate: &C,
    config: &MatchConfig,
) -> Option<f64> {
    let title = candidate.title()?;
    let similarity = title_similarity(&target.title, title);
    if similarity < config.title_sim_min {
        return Some(0.0);
    }

    let mut total = config.title_weight * similarity;

    if let Some(author) = author_hint(target) {
        if !author_matches_names(author, &candidate.author_names()) {
            return Some(0.0);
        }
        total += config.author_bonus;
    }

    if years_within(
        target.year_hint,
        candidate.year(year_range(config)),
        config.year_window,
    ) {
        total += config.year_bonus;
    }

    Some(total)
}

fn author_hint(target: &MatchTarget) -> Option<&str> {
    target
        .author_name
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
}

/// The candidate with the strictly greatest score, if that score reaches
/// `threshold`. Ties keep the first one seen; malformed candidates are skipped.
pub fn best_by_score<'a, C: Scorable>(
    target: &MatchTarget,
    candidates: &'a [C],
    threshold: f64,
    config: &MatchConfig,
) -> Option<ScoredCandidate<'a, C>> {
    let mut best: Option<ScoredCandidate<'a, C>> = None;
    let mut best_score = 0.0;

    for candidate in candidates {
        let Some(s) = score(target, candidate, config) else {
            tracing::debug!("skipping candidate without a title");
            continue;
        };
        if s > best_score {
            best_score = s;
            best = Some(ScoredCandidate {
                score: s,
                kind: MatchKind::Scored,
                candidate,
            });
        }
    }

    best.filter(|b| meets_threshold(b.score, threshold))
}

/// Best related item in a result list, gated by `best_item_threshold`.
///
/// Looser than [`pick_candidate`]: there is no exact-title shortcut and the
/// bar is lower, for finding a related entry rather than the same one.
pub fn best_item<'a, C: Scorable>(
    target: &MatchTarget,
    candidates: &'a [C],
    config: &MatchConfig,
) -> Option<ScoredCandidate<'a, C>> {
    best_by_score(target, candidates, config.best_item_threshold, config)
}

/// First candidate whose normalized title equals the target's and, when an
/// author hint is given, lists that author (or mentions the surname).
pub fn exact_match<'a, C: Scorable>(target: &MatchTarget, candidates: &'a [C]) -> Option<&'a C> {
    let wanted = normalize_title(&target.title);
    if wanted.is_empty() {
        return None;
    }

    candidates.iter().find(|candidate| {
        let Some(title) = candidate.title() else {
            return false;
        };
        if normalize_title(title) != wanted {
            return false;
        }
        match author_hint(target) {
            None => true,
            Some(author) => {
                author_matches_names(author, &candidate.author_names())
                    || author_in_text(author, &candidate.author_text())
            }
        }
    })
}

/// Pick the search result describing `target`: exact title match first,
/// then the best scored candidate at `exact_pick_threshold`.
pub fn pick_candidate<'a, C: Scorable>(
    target: &MatchTarget,
    candidates: &'a [C],
    config: &MatchConfig,
) -> Option<ScoredCandidate<'a, C>> {
    if let Some(candidate) = exact_match(target, candidates) {
        return Some(ScoredCandidate {
            score: 1.0,
            kind: MatchKind::Exact,
            candidate,
        });
    }
    best_by_score(target, candidates, config.exact_pick_threshold, config)
}
