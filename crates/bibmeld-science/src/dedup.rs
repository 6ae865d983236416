//! Near-duplicate collapsing for publication lists.

use std::cmp::{Ordering, Reverse};

use bibmeld_core::{ListedPublication, MatchConfig};

use crate::similarity::{meets_threshold, title_similarity, years_within};
use crate::text::{names_overlap, normalize_person_name, normalize_title, trim_trailing_period};

/// Markers a listing site leaves where it cut a value short.
const TRUNCATION_MARKERS: &[&str] = &["...", "\u{2026}", "et al", "[truncated]", "[...]"];

/// Default [`truncation_score`] at which an item is worth fetching again.
pub const REFETCH_THRESHOLD: f64 = 0.5;

/// Whether `text` carries a truncation marker (case-insensitive).
pub fn is_truncated(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    !lower.is_empty() && TRUNCATION_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn authors_truncated(authors: &[String]) -> bool {
    is_truncated(&authors.join(", "))
}

/// Share of the present fields (title, authors, venue) that are truncated,
/// from 0.0 (complete) to 1.0. An item with none of them scores 0.0.
pub fn truncation_score(item: &ListedPublication) -> f64 {
    let mut checked = 0u32;
    let mut truncated = 0u32;
    let mut check = |present: bool, cut: bool| {
        if present {
            checked += 1;
            if cut {
                truncated += 1;
            }
        }
    };

    check(!item.title.trim().is_empty(), is_truncated(&item.title));
    check(!item.authors.is_empty(), authors_truncated(&item.authors));
    let venue = item.venue.as_deref().filter(|v| !v.trim().is_empty());
    check(venue.is_some(), venue.is_some_and(is_truncated));

    if checked == 0 {
        0.0
    } else {
        f64::from(truncated) / f64::from(checked)
    }
}

/// Whether enough of the item is cut short to fetch it again.
pub fn needs_refetch(item: &ListedPublication, threshold: f64) -> bool {
    meets_threshold(truncation_score(item), threshold)
}

#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    config: MatchConfig,
}

impl Deduplicator {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn with_duplicate_threshold(mut self, threshold: f64) -> Self {
        self.config.merge_duplicate_threshold = threshold.clamp(0.0, 2.0);
        self
    }

    /// Collapse near-duplicates inside one list.
    ///
    /// Input order does not matter: items are sorted by year (newest first),
    /// normalized title and first author, then every remaining field, before
    /// the greedy walk. Kept items have their titles trimmed.
    pub fn dedupe_within(&self, items: &[ListedPublication]) -> Vec<ListedPublication> {
        let mut accepted: Vec<Prepared> = Vec::new();
        for item in sorted(items) {
            if !accepted.iter().any(|kept| self.is_duplicate(&item, kept)) {
                accepted.push(item);
            }
        }
        accepted.into_iter().map(Prepared::into_trimmed).collect()
    }

    /// Union of two lists preferring `primary` entries on duplicates.
    ///
    /// Secondary items are checked against everything accepted so far,
    /// including earlier secondary items.
    pub fn merge_lists(
        &self,
        primary: &[ListedPublication],
        secondary: &[ListedPublication],
    ) -> Vec<ListedPublication> {
        let mut result: Vec<Prepared> = self
            .dedupe_within(primary)
            .into_iter()
            .map(Prepared::new)
            .collect();

        for item in self.dedupe_within(secondary).into_iter().map(Prepared::new) {
            if !result.iter().any(|kept| self.is_duplicate(&item, kept)) {
                result.push(item);
            }
        }
        result.into_iter().map(|p| p.item).collect()
    }

    /// Additive duplicate score of two list items, or `None` when the quick
    /// title check already rules them out.
    pub fn pair_score(&self, a: &ListedPublication, b: &ListedPublication) -> Option<f64> {
        let similarity = title_similarity(&a.title, &b.title);
        if similarity < self.config.title_sim_min {
            return None;
        }

        let mut total = self.config.title_weight * similarity;
        if names_overlap(&a.authors, &b.authors) {
            total += self.config.author_bonus;
        }
        if years_within(a.year, b.year, self.config.year_window) {
            total += self.config.year_bonus;
        }
        Some(total)
    }

    /// Fill the cut-short parts of `item` from the best matching entry in
    /// `richer`.
    ///
    /// The match is the strictly highest [`pair_score`](Self::pair_score)
    /// reaching the duplicate threshold. A truncated title or author list is
    /// replaced only by one that is itself complete; a missing or truncated
    /// venue and a missing year are filled. `None` when there is no match or
    /// nothing changed.
    pub fn repair_truncated(
        &self,
        item: &ListedPublication,
        richer: &[ListedPublication],
    ) -> Option<ListedPublication> {
        if item.title.trim().is_empty() {
            return None;
        }

        let mut best: Option<&ListedPublication> = None;
        let mut best_score = 0.0;
        for candidate in richer.iter().filter(|c| !c.title.trim().is_empty()) {
            if let Some(score) = self.pair_score(item, candidate)
                && score > best_score
            {
                best_score = score;
                best = Some(candidate);
            }
        }
        let source = best.filter(|_| meets_threshold(best_score, self.config.merge_duplicate_threshold))?;

        let mut repaired = item.clone();
        if is_truncated(&item.title) && !is_truncated(&source.title) {
            repaired.title = source.title.clone();
        }
        if authors_truncated(&item.authors)
            && !source.authors.is_empty()
            && !authors_truncated(&source.authors)
        {
            repaired.authors = source.authors.clone();
        }
        let venue_wanted = item
            .venue
            .as_deref()
            .is_none_or(|v| v.trim().is_empty() || is_truncated(v));
        if venue_wanted && let Some(venue) = source.venue.as_deref().filter(|v| !v.trim().is_empty()) {
            repaired.venue = Some(venue.to_string());
        }
        if repaired.year.is_none() {
            repaired.year = source.year;
        }

        if repaired == *item {
            return None;
        }
        tracing::debug!(title = %repaired.title, score = best_score, "repaired truncated list item");
        Some(repaired)
    }

    /// [`repair_truncated`](Self::repair_truncated) over a whole list; items
    /// without a match are returned unchanged.
    pub fn repair_list(
        &self,
        items: &[ListedPublication],
        richer: &[ListedPublication],
    ) -> Vec<ListedPublication> {
        items
            .iter()
            .map(|item| self.repair_truncated(item, richer).unwrap_or_else(|| item.clone()))
            .collect()
    }

    fn is_duplicate(&self, item: &Prepared, kept: &Prepared) -> bool {
        // Same title, year and authors is the same row whatever the weights say.
        if item.identity == kept.identity {
            return true;
        }
        self.pair_score(&item.item, &kept.item)
            .is_some_and(|s| meets_threshold(s, self.config.merge_duplicate_threshold))
    }
}

pub fn dedupe_within(items: &[ListedPublication], config: &MatchConfig) -> Vec<ListedPublication> {
    Deduplicator::new(config.clone()).dedupe_within(items)
}

pub fn merge_lists(
    primary: &[ListedPublication],
    secondary: &[ListedPublication],
    config: &MatchConfig,
) -> Vec<ListedPublication> {
    Deduplicator::new(config.clone()).merge_lists(primary, secondary)
}

/// A list item with its comparison forms computed once.
struct Prepared {
    item: ListedPublication,
    identity: (String, Option<i32>, Vec<String>),
}

impl Prepared {
    fn new(item: ListedPublication) -> Self {
        let identity = (
            normalize_title(&item.title),
            item.year,
            item.authors.iter().map(|a| normalize_person_name(a)).collect(),
        );
        Self { item, identity }
    }

    fn into_trimmed(mut self) -> ListedPublication {
        self.item.title = trim_trailing_period(&self.item.title);
        self.item
    }
}

fn sorted(items: &[ListedPublication]) -> Vec<Prepared> {
    let mut prepared: Vec<Prepared> = items
        .iter()
        .filter(|item| {
            let usable = !normalize_title(&item.title).is_empty();
            if !usable {
                tracing::debug!("dropping list item without a usable title");
            }
            usable
        })
        .cloned()
        .map(Prepared::new)
        .collect();
    prepared.sort_by(compare_for_walk);
    prepared
}

/// Total order over list items so the greedy walk is arrival-order independent.
fn compare_for_walk(a: &Prepared, b: &Prepared) -> Ordering {
    let key = |p: &Prepared| {
        (
            Reverse(p.item.year.unwrap_or(0)),
            p.identity.0.clone(),
            p.item.first_author().unwrap_or_default().to_lowercase(),
        )
    };
    key(a)
        .cmp(&key(b))
        .then_with(|| a.item.title.cmp(&b.item.title))
        .then_with(|| a.item.authors.cmp(&b.item.authors))
        .then_with(|| a.item.year.cmp(&b.item.year))
        .then_with(|| a.item.venue.cmp(&b.item.venue))
        .then_with(|| a.item.url.cmp(&b.item.url))
        .then_with(|| a.item.source.cmp(&b.item.source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, authors: &[&str], year: Option<i32>) -> ListedPublication {
        ListedPublication {
            year,
            ..ListedPublication::new(title).with_authors(authors.iter().copied())
        }
    }

    fn dedup() -> Deduplicator {
        Deduplicator::default()
    }

    #[test]
    fn trailing_period_variant_collapses() {
        let out = dedup().dedupe_within(&[item("Paper", &[], Some(2020)), item("paper.", &[], Some(2020))]);
        assert_eq!(out.len(), 1);
        assert!(!out[0].title.ends_with('.'));
    }

    #[test]
    fn same_title_different_era_is_kept_apart() {
        // 0.7 for the title alone does not reach 0.9
        let out = dedup().dedupe_within(&[
            item("Introduction", &["A Smith"], Some(1999)),
            item("Introduction", &["B Jones"], Some(2015)),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn author_overlap_counts_toward_duplicate() {
        let out = dedup().dedupe_within(&[
            item("Deep Residual Learning for Image Recognition", &["Kaiming He"], Some(2016)),
            item("Deep residual learning for image recognition.", &["K He", "X Zhang"], None),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn output_is_sorted_newest_first() {
        let out = dedup().dedupe_within(&[
            item("Older Work", &[], Some(2001)),
            item("Undated Work", &[], None),
            item("Newer Work", &[], Some(2020)),
        ]);
        let titles: Vec<_> = out.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Newer Work", "Older Work", "Undated Work"]);
    }

    #[test]
    fn untitled_items_are_dropped() {
        let out = dedup().dedupe_within(&[item("  ", &["A"], Some(2020)), item("Real", &[], None)]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn merge_lists_prefers_primary_and_adds_new() {
        let mut primary_item = item("Attention Is All You Need", &["A Vaswani"], Some(2017));
        primary_item.venue = Some("NeurIPS".into());
        let mut secondary_item = item("Attention is all you need", &["Ashish Vaswani"], Some(2017));
        secondary_item.venue = Some("arXiv".into());
        let fresh = item("Generative Adversarial Nets", &["Ian Goodfellow"], Some(2014));

        let out = dedup().merge_lists(&[primary_item.clone()], &[secondary_item, fresh.clone()]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].venue.as_deref(), Some("NeurIPS"));
        assert_eq!(out[1].title, fresh.title);
    }

    #[test]
    fn merge_lists_of_identical_lists_equals_dedupe() {
        let list = vec![
            item("Paper", &[], None),
            item("Another Paper", &["X Y"], Some(2011)),
            item("another paper.", &["X. Y"], Some(2011)),
        ];
        assert_eq!(dedup().merge_lists(&list, &list), dedup().dedupe_within(&list));
    }

    #[test]
    fn pair_score_quick_reject() {
        let d = dedup();
        assert_eq!(
            d.pair_score(&item("Completely Different", &[], None), &item("Nothing Alike", &[], None)),
            None
        );
    }

    #[test]
    fn truncation_markers() {
        assert!(is_truncated("Attention is all you..."));
        assert!(is_truncated("A Vaswani, N Shazeer, N Parmar\u{2026}"));
        assert!(is_truncated("Smith ET AL"));
        assert!(is_truncated("Proceedings of [truncated]"));
        assert!(!is_truncated("Attention Is All You Need"));
        assert!(!is_truncated(""));
    }

    #[test]
    fn truncation_score_counts_present_fields() {
        let mut listed = item("Attention is all you...", &["A Vaswani", "N Shazeer"], Some(2017));
        assert!((truncation_score(&listed) - 0.5).abs() < 1e-9);
        assert!(needs_refetch(&listed, REFETCH_THRESHOLD));

        listed.venue = Some("NeurIPS".into());
        assert!((truncation_score(&listed) - 1.0 / 3.0).abs() < 1e-9);
        assert!(!needs_refetch(&listed, REFETCH_THRESHOLD));

        assert_eq!(truncation_score(&ListedPublication::default()), 0.0);
    }

    #[test]
    fn repair_fills_truncated_fields_from_best_match() {
        let mut cut = item("Deep Residual Learning for Image Recog...", &["K He", "X Zhang\u{2026}"], Some(2016));
        cut.venue = Some("Computer Vision and Pat\u{2026}".into());

        let mut full = item(
            "Deep Residual Learning for Image Recognition",
            &["Kaiming He", "Xiangyu Zhang", "Shaoqing Ren"],
            Some(2016),
        );
        full.venue = Some("CVPR".into());
        let unrelated = item("Generative Adversarial Nets", &["Ian Goodfellow"], Some(2014));

        let repaired = dedup().repair_truncated(&cut, &[unrelated, full.clone()]).unwrap();
        assert_eq!(repaired.title, full.title);
        assert_eq!(repaired.authors, full.authors);
        assert_eq!(repaired.venue.as_deref(), Some("CVPR"));
        assert_eq!(truncation_score(&repaired), 0.0);
    }

    #[test]
    fn repair_keeps_complete_values_and_fills_missing_year() {
        let listed = item("Deep Residual Learning for Image Recognition", &["Kaiming He"], None);
        let mut richer = item("Deep residual learning for image recognition", &["K He", "X Zhang"], Some(2016));
        richer.venue = Some("CVPR".into());

        let repaired = dedup().repair_truncated(&listed, &[richer]).unwrap();
        assert_eq!(repaired.title, listed.title);
        assert_eq!(repaired.authors, listed.authors);
        assert_eq!(repaired.year, Some(2016));
        assert_eq!(repaired.venue.as_deref(), Some("CVPR"));
    }

    #[test]
    fn repair_needs_a_confident_match() {
        let cut = item("Introduction...", &["A Smith"], Some(1999));
        let other = item("Introduction", &["B Jones"], Some(2015));
        assert!(dedup().repair_truncated(&cut, &[other.clone()]).is_none());

        let list = dedup().repair_list(&[cut.clone()], &[other]);
        assert_eq!(list, vec![cut]);
    }

    #[test]
    fn stricter_threshold_keeps_more() {
        let list = [item("Paper", &[], Some(2020)), item("paper.", &[], Some(2021))];
        assert_eq!(dedup().dedupe_within(&list).len(), 1);
        assert_eq!(dedup().with_duplicate_threshold(1.2).dedupe_within(&list).len(), 2);
    }
}
