use std::collections::{BTreeMap, BTreeSet};

use bibmeld_core::{CanonicalRecord, EntryType, Field, SourceTag, TrustRank};

use super::policy::MergePolicy;
use super::sanitize::{apply_value_guards, sanitize_identifiers, starts_with_digit, trusted_dois};
use super::venue::{enforce_container, rederive_entry_type};
use super::{DataQualityEvent, Enricher, Fields, MergeOutcome};
use crate::identifiers::{is_arxiv_doi, normalize_doi};
use crate::text::{has_placeholder, normalize_title, strip_markup};

const PREPRINT_SERVERS: &[&str] = &[
    "arxiv",
    "biorxiv",
    "medrxiv",
    "ssrn",
    "chemrxiv",
    "psyarxiv",
    "research square",
    "preprints.org",
];

/// Who supplied the current value of a field.
#[derive(Debug, Clone)]
struct Provenance {
    source: SourceTag,
    rank: TrustRank,
}

fn is_preprint_venue(venue: &str) -> bool {
    let lower = venue.to_lowercase();
    PREPRINT_SERVERS.iter().any(|name| lower.contains(name))
}

fn clean_value(field: &Field, value: &str) -> String {
    match field {
        Field::Title | Field::Journal | Field::Booktitle | Field::Series => strip_markup(value),
        _ => value.trim().to_string(),
    }
}

fn is_usable(value: &str) -> bool {
    !has_placeholder(value)
}

impl MergePolicy {
    /// Merge `primary` with enrichers already known to describe the same
    /// publication.
    ///
    /// The result does not depend on enricher order for plain field
    /// conflicts: a value is only ever replaced by a strictly more trusted
    /// source. The key is always the primary's.
    pub fn merge(&self, primary: &CanonicalRecord, enrichers: &[Enricher]) -> MergeOutcome {
        let mut events = Vec::new();
        let trusted = trusted_dois(enrichers, self);

        let trust_type = self.select_type(primary, enrichers);

        let mut fields: Fields = primary.fields.clone();
        let baseline = Provenance {
            source: self.merge.baseline_source.clone(),
            rank: self.baseline_rank(),
        };
        let mut provenance: BTreeMap<Field, Provenance> = fields
            .keys()
            .map(|field| (field.clone(), baseline.clone()))
            .collect();

        for enricher in enrichers {
            let offered = Provenance {
                source: enricher.source.clone(),
                rank: self.rank(&enricher.source),
            };
            for (field, raw) in &enricher.record.fields {
                let value = clean_value(field, raw);
                if !is_usable(&value) {
                    continue;
                }
                let accept = match fields.get(field).filter(|current| is_usable(current)) {
                    None => true,
                    Some(current) => {
                        let current_prov = provenance.get(field).unwrap_or(&baseline);
                        self.should_replace(field, current, current_prov, &value, &offered, &trusted, &mut events)
                    }
                };
                if accept {
                    fields.insert(field.clone(), value);
                    provenance.insert(field.clone(), offered.clone());
                }
            }
        }

        let mut moves = sanitize_identifiers(&mut fields, enrichers, self, &mut events);
        apply_value_guards(&mut fields, &mut events);

        let entry_type = rederive_entry_type(trust_type, &fields);
        if entry_type != trust_type {
            tracing::debug!(from = %trust_type, to = %entry_type, "venue text overrides entry type");
            events.push(DataQualityEvent::EntryTypeReclassified {
                from: trust_type,
                to: entry_type,
            });
        }
        moves.extend(enforce_container(entry_type, &mut fields));

        // A value carried into another field keeps its supplier.
        for moved in &moves {
            if let Some(prov) = provenance.get(&moved.from).cloned() {
                provenance.insert(moved.to.clone(), prov);
            }
        }

        let mut contributions: BTreeMap<SourceTag, bool> =
            enrichers.iter().map(|e| (e.source.clone(), false)).collect();
        for (field, prov) in &provenance {
            if fields.contains_key(field)
                && let Some(flag) = contributions.get_mut(&prov.source)
            {
                *flag = true;
            }
        }

        let validated_sources = enrichers
            .iter()
            .map(|e| &e.source)
            .filter(|tag| self.merge.trust_order.contains(tag))
            .collect::<BTreeSet<_>>()
            .len();

        MergeOutcome {
            record: CanonicalRecord {
                entry_type,
                key: primary.key.clone(),
                fields,
            },
            contributions,
            validated_sources,
            events,
        }
    }

    /// The entry type of the most trusted enricher that states a specific
    /// one, as long as it outranks the baseline.
    fn select_type(&self, primary: &CanonicalRecord, enrichers: &[Enricher]) -> EntryType {
        let mut entry_type = primary.entry_type;
        let mut best = self.baseline_rank();
        for enricher in enrichers {
            let rank = self.rank(&enricher.source);
            if enricher.record.entry_type.is_specific() && rank.outranks(best) {
                entry_type = enricher.record.entry_type;
                best = rank;
            }
        }
        entry_type
    }

    /// Whether `offered` may overwrite a valid `current` value.
    #[allow(clippy::too_many_arguments)]
    fn should_replace(
        &self,
        field: &Field,
        current: &str,
        current_prov: &Provenance,
        value: &str,
        offered: &Provenance,
        trusted: &BTreeSet<String>,
        events: &mut Vec<DataQualityEvent>,
    ) -> bool {
        match field {
            Field::Doi => {
                let (Some(current_doi), Some(offered_doi)) = (normalize_doi(current), normalize_doi(value)) else {
                    return offered.rank.outranks(current_prov.rank);
                };
                if current_doi != offered_doi
                    && trusted.contains(&current_doi)
                    && !trusted.contains(&offered_doi)
                    && !self.is_trusted_doi_source(&offered.source)
                {
                    tracing::warn!(
                        source = %offered.source,
                        kept = %current_doi,
                        offered = %offered_doi,
                        "rejecting DOI that conflicts with a trusted one"
                    );
                    events.push(DataQualityEvent::ConflictingDoiRejected {
                        source: offered.source.clone(),
                        kept: current_doi,
                        offered: offered_doi,
                    });
                    return false;
                }
                // A publisher DOI beats an arXiv-minted one whatever the ranks.
                match (is_arxiv_doi(&current_doi), is_arxiv_doi(&offered_doi)) {
                    (true, false) => return true,
                    (false, true) => return false,
                    _ => {}
                }
            }
            Field::Journal => {
                if is_preprint_venue(value) && !is_preprint_venue(current) {
                    events.push(DataQualityEvent::PreprintJournalRefused {
                        source: offered.source.clone(),
                        offered: value.to_string(),
                    });
                    return false;
                }
            }
            Field::Pages => {
                if starts_with_digit(current) && !starts_with_digit(value) {
                    return false;
                }
            }
            Field::Title => {
                let current_len = normalize_title(current).chars().count() as f64;
                let offered_len = normalize_title(value).chars().count() as f64;
                let shrinks = offered_len < self.merge.title_shrink_ratio * current_len;
                if shrinks
                    && offered.rank.tiers_above(current_prov.rank) < self.merge.title_shrink_min_tiers
                {
                    events.push(DataQualityEvent::ShortTitleRefused {
                        source: offered.source.clone(),
                        offered: value.to_string(),
                    });
                    return false;
                }
            }
            _ => {}
        }
        offered.rank.outranks(current_prov.rank)
    }
}

/// Merge and keep only the record.
pub fn merge_with_policy(primary: &CanonicalRecord, enrichers: &[Enricher], policy: &MergePolicy) -> CanonicalRecord {
    policy.merge(primary, enrichers).record
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibmeld_core::TrustOrder;

    fn policy() -> MergePolicy {
        MergePolicy::default()
    }

    fn baseline() -> CanonicalRecord {
        CanonicalRecord::new(EntryType::Misc, "vaswani2017attention")
            .with(Field::Title, "Attention Is All You Need")
            .with(Field::Author, "A Vaswani")
            .with(Field::Year, "2017")
    }

    fn arxiv_enricher() -> Enricher {
        Enricher::new(
            "arxiv",
            CanonicalRecord::new(EntryType::Misc, "")
                .with(Field::Title, "Attention Is All You Need")
                .with(Field::Author, "Ashish Vaswani and Noam Shazeer")
                .with(Field::Year, "2017")
                .with(Field::Eprint, "1706.03762")
                .with(Field::ArchivePrefix, "arXiv"),
        )
    }

    fn crossref_enricher() -> Enricher {
        Enricher::new(
            "crossref",
            CanonicalRecord::new(EntryType::Inproceedings, "")
                .with(Field::Title, "Attention Is All You Need")
                .with(Field::Author, "Ashish Vaswani")
                .with(Field::Year, "2017")
                .with(Field::Booktitle, "NeurIPS")
                .with(Field::Doi, "10.5555/3295222.3295349"),
        )
    }

    #[test]
    fn published_version_wins_over_preprint() {
        let outcome = policy().merge(&baseline(), &[arxiv_enricher(), crossref_enricher()]);
        let record = &outcome.record;

        assert_eq!(record.entry_type, EntryType::Inproceedings);
        assert_eq!(record.key, "vaswani2017attention");
        assert_eq!(record.get(&Field::Booktitle), Some("NeurIPS"));
        assert_eq!(record.doi(), Some("10.5555/3295222.3295349"));
        assert!(!record.has(&Field::Eprint));
        assert!(!record.has(&Field::ArchivePrefix));
        // crossref outranks arxiv for the author list
        assert_eq!(record.author(), Some("Ashish Vaswani"));
        assert!(outcome.contributed(&"crossref".into()));
        assert_eq!(outcome.validated_sources, 2);
    }

    #[test]
    fn enricher_order_does_not_matter() {
        let forward = merge_with_policy(&baseline(), &[arxiv_enricher(), crossref_enricher()], &policy());
        let backward = merge_with_policy(&baseline(), &[crossref_enricher(), arxiv_enricher()], &policy());
        assert_eq!(forward, backward);
    }

    #[test]
    fn lower_trust_never_overwrites_higher_trust() {
        let crossref = Enricher::new(
            "crossref",
            CanonicalRecord::default().with(Field::Publisher, "Curran Associates"),
        );
        let s2 = Enricher::new("s2", CanonicalRecord::default().with(Field::Publisher, "Someone Else"));

        for enrichers in [vec![crossref.clone(), s2.clone()], vec![s2, crossref]] {
            let record = merge_with_policy(&baseline(), &enrichers, &policy());
            assert_eq!(record.get(&Field::Publisher), Some("Curran Associates"));
        }
    }

    #[test]
    fn placeholders_never_fill_and_are_replaced() {
        let primary = baseline().with(Field::Publisher, "n/a");
        let low = Enricher::new(
            "openreview",
            CanonicalRecord::default()
                .with(Field::Publisher, "Curran")
                .with(Field::Volume, "TBD"),
        );
        let record = merge_with_policy(&primary, &[low], &policy());
        assert_eq!(record.get(&Field::Publisher), Some("Curran"));
        assert!(!record.has(&Field::Volume));
    }

    #[test]
    fn unlisted_source_cannot_override_baseline() {
        let stranger = Enricher::new(
            "random_blog",
            CanonicalRecord::default()
                .with(Field::Title, "Attention Is All You Need (Annotated)")
                .with(Field::Volume, "30"),
        );
        let outcome = policy().merge(&baseline(), &[stranger]);
        assert_eq!(outcome.record.title(), Some("Attention Is All You Need"));
        assert_eq!(outcome.record.get(&Field::Volume), Some("30"));
        assert_eq!(outcome.validated_sources, 0);
        assert!(outcome.contributed(&"random_blog".into()));
    }

    #[test]
    fn uncorroborated_doi_is_dropped() {
        let s2 = Enricher::new("s2", CanonicalRecord::default().with(Field::Doi, "10.1000/guess"));
        let outcome = policy().merge(&baseline(), &[s2]);
        assert!(outcome.record.doi().is_none());
        assert!(
            outcome
                .events
                .contains(&DataQualityEvent::UncorroboratedDoiDropped { doi: "10.1000/guess".into() })
        );
    }

    #[test]
    fn conflicting_doi_from_weaker_source_is_rejected() {
        let primary = baseline().with(Field::Doi, "10.1000/right");
        let crossref = Enricher::new("crossref", CanonicalRecord::default().with(Field::Doi, "10.1000/RIGHT"));
        let order = TrustOrder::new(["openalex", "crossref", "scholar_min"]);
        let openalex = Enricher::new("openalex", CanonicalRecord::default().with(Field::Doi, "10.1000/wrong"));

        let outcome = policy()
            .with_trust_order(order)
            .merge(&primary, &[crossref, openalex]);
        assert_eq!(outcome.record.doi(), Some("10.1000/right"));
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            DataQualityEvent::ConflictingDoiRejected { offered, .. } if offered == "10.1000/wrong"
        )));
    }

    #[test]
    fn publisher_doi_replaces_arxiv_doi() {
        let primary = baseline().with(Field::Doi, "10.48550/arXiv.1706.03762");
        let arxiv = Enricher::new("arxiv", CanonicalRecord::default().with(Field::Doi, "10.48550/arxiv.1706.03762"));
        // ranked below the baseline, but still a publisher DOI
        let order = TrustOrder::new(["arxiv", "scholar_min", "crossref"]);
        let crossref = Enricher::new("crossref", CanonicalRecord::default().with(Field::Doi, "10.5555/3295222.3295349"));

        let record = merge_with_policy(
            &primary,
            &[arxiv, crossref],
            &policy().with_trust_order(order),
        );
        assert_eq!(record.doi(), Some("10.5555/3295222.3295349"));
    }

    #[test]
    fn preprint_server_never_replaces_journal() {
        let primary = CanonicalRecord::new(EntryType::Article, "k")
            .with(Field::Title, "Protein folding")
            .with(Field::Journal, "Nature");
        let biorxiv = Enricher::new("crossref", CanonicalRecord::default().with(Field::Journal, "bioRxiv"));
        let outcome = policy().merge(&primary, &[biorxiv]);
        assert_eq!(outcome.record.get(&Field::Journal), Some("Nature"));
        assert!(matches!(outcome.events[0], DataQualityEvent::PreprintJournalRefused { .. }));
    }

    #[test]
    fn truncated_title_needs_a_much_stronger_source() {
        let primary = baseline().with(Field::Title, "Attention Is All You Need: Transformers for Sequence Transduction");
        let near = Enricher::new("scholar_page", CanonicalRecord::default().with(Field::Title, "Attention Is All You Need"));
        let far = Enricher::new("crossref", CanonicalRecord::default().with(Field::Title, "Attention Is All You Need"));

        let outcome = policy().merge(&primary, &[near]);
        assert!(outcome.record.title().is_some_and(|t| t.contains("Transformers")));
        assert!(matches!(outcome.events[0], DataQualityEvent::ShortTitleRefused { .. }));

        let record = merge_with_policy(&primary, &[far], &policy());
        assert_eq!(record.title(), Some("Attention Is All You Need"));
    }

    #[test]
    fn invalid_pages_never_replace_valid_ones() {
        let primary = baseline().with(Field::Pages, "5998--6008");
        let crossref = Enricher::new("crossref", CanonicalRecord::default().with(Field::Pages, "e1000"));
        let record = merge_with_policy(&primary, &[crossref], &policy());
        assert_eq!(record.get(&Field::Pages), Some("5998--6008"));
    }

    #[test]
    fn venue_text_overrides_trusted_type() {
        let crossref = Enricher::new(
            "crossref",
            CanonicalRecord::new(EntryType::Article, "")
                .with(Field::Journal, "Proceedings of the AAAI Conference on Artificial Intelligence"),
        );
        let outcome = policy().merge(&baseline(), &[crossref]);
        assert_eq!(outcome.record.entry_type, EntryType::Inproceedings);
        assert_eq!(
            outcome.record.get(&Field::Booktitle),
            Some("Proceedings of the AAAI Conference on Artificial Intelligence")
        );
        assert!(!outcome.record.has(&Field::Journal));
        assert!(outcome.events.contains(&DataQualityEvent::EntryTypeReclassified {
            from: EntryType::Article,
            to: EntryType::Inproceedings,
        }));
        // the journal it supplied now lives in booktitle
        assert!(outcome.contributed(&"crossref".into()));
    }

    #[test]
    fn recovered_arxiv_id_credits_its_supplier() {
        let s2 = Enricher::new("s2", CanonicalRecord::default().with(Field::Pages, "arXiv: 1706.03762"));
        let outcome = policy().merge(&baseline(), &[s2]);
        assert_eq!(outcome.record.get(&Field::Eprint), Some("1706.03762"));
        assert!(!outcome.record.has(&Field::Pages));
        assert!(outcome.contributed(&"s2".into()));
    }

    #[test]
    fn merge_is_idempotent_on_its_output() {
        let first = merge_with_policy(&baseline(), &[arxiv_enricher(), crossref_enricher()], &policy());
        let second = merge_with_policy(&first, &[], &policy());
        assert_eq!(first, second);

        let preprint_only = merge_with_policy(&baseline(), &[arxiv_enricher()], &policy());
        assert_eq!(preprint_only.get(&Field::Eprint), Some("1706.03762"));
        assert_eq!(merge_with_policy(&preprint_only, &[], &policy()), preprint_only);

        // a chapter whose howpublished names a conference
        let chapter = baseline()
            .with(Field::Howpublished, "Proceedings of the Genetic and Evolutionary Computation Conference")
            .with(Field::Publisher, "Springer")
            .with(Field::Pages, "1-10");
        let first = merge_with_policy(&chapter, &[], &policy());
        assert_eq!(first.entry_type, EntryType::Incollection);
        assert_eq!(merge_with_policy(&first, &[], &policy()), first);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let primary = baseline();
        let enrichers = vec![crossref_enricher()];
        let _ = policy().merge(&primary, &enrichers);
        assert_eq!(primary, baseline());
        assert_eq!(enrichers, vec![crossref_enricher()]);
    }
}
