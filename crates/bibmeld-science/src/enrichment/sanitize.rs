//! Post-merge cleanup of identifiers, links and obviously broken values.
//!
//! Every step works on the merged field map in place and reports what it
//! dropped through [`DataQualityEvent`]s instead of failing.

use std::collections::BTreeSet;

use bibmeld_core::Field;

use super::policy::MergePolicy;
use super::{DataQualityEvent, Enricher, FieldMove, Fields, present};
use crate::identifiers::extract::ARXIV_COLON;
use crate::identifiers::{ArxivId, Doi, allowlisted_url, is_doi_url, normalize_arxiv_id, normalize_doi};
use crate::text::strip_markup;

const ARXIV_PLACEHOLDER_NAMES: &[&str] = &["arxiv", "arxiv.org", "arxiv e-prints"];
const ARXIV_JOURNAL: &str = "arXiv e-prints";

const MARKUP_FIELDS: [Field; 4] = [Field::Title, Field::Journal, Field::Booktitle, Field::Series];

/// Normalized DOIs reported by the trusted DOI sources among `enrichers`.
pub fn trusted_dois(enrichers: &[Enricher], policy: &MergePolicy) -> BTreeSet<String> {
    enrichers
        .iter()
        .filter(|e| policy.is_trusted_doi_source(&e.source))
        .filter_map(|e| e.record.doi().and_then(normalize_doi))
        .collect()
}

/// Identifier sanitation, in order: DOI normalization, DOI corroboration,
/// internal field removal, arXiv canonicalization, preprint id removal
/// under a published DOI, URL allow-listing.
///
/// Returns the fields whose values were derived from another field.
pub fn sanitize_identifiers(
    fields: &mut Fields,
    enrichers: &[Enricher],
    policy: &MergePolicy,
    events: &mut Vec<DataQualityEvent>,
) -> Vec<FieldMove> {
    normalize_doi_field(fields);
    if !enrichers.is_empty() {
        corroborate_doi(fields, &trusted_dois(enrichers, policy), events);
    }
    strip_internal_fields(fields, policy);
    let moves = canonicalize_arxiv(fields, events);
    drop_superseded_preprint(fields);
    restrict_url(fields);
    moves
}

fn normalize_doi_field(fields: &mut Fields) {
    match present(fields, &Field::Doi).map(normalize_doi) {
        Some(Some(doi)) => {
            fields.insert(Field::Doi, doi);
        }
        _ => {
            fields.remove(&Field::Doi);
        }
    }
}

/// A DOI survives only if some trusted source reported the same one.
fn corroborate_doi(fields: &mut Fields, trusted: &BTreeSet<String>, events: &mut Vec<DataQualityEvent>) {
    let Some(doi) = present(fields, &Field::Doi).map(str::to_string) else {
        return;
    };
    if !trusted.contains(&doi) {
        tracing::debug!(%doi, "dropping DOI no trusted source reported");
        fields.remove(&Field::Doi);
        events.push(DataQualityEvent::UncorroboratedDoiDropped { doi });
    }
}

fn strip_internal_fields(fields: &mut Fields, policy: &MergePolicy) {
    fields.retain(|field, _| !policy.is_internal_field(field.as_str()));
    if present(fields, &Field::Note).is_some_and(|note| note.starts_with("PMID:")) {
        fields.remove(&Field::Note);
    }
}

fn is_arxiv_placeholder(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    ARXIV_PLACEHOLDER_NAMES.contains(&lower.as_str())
}

/// Recover an arXiv id from wherever it ended up and write the canonical
/// eprint/archiveprefix pair.
///
/// Sources, first hit wins: eprint under an arXiv prefix, an arXiv-minted
/// DOI, `arXiv: ID` in pages (always removed from pages), the same in
/// journal, an arxiv.org link. The eprint, archiveprefix and a defaulted
/// url are reported as derived from the field the id came from.
fn canonicalize_arxiv(fields: &mut Fields, events: &mut Vec<DataQualityEvent>) -> Vec<FieldMove> {
    let mut found: Option<(String, Field)> = None;

    let arxiv_prefixed = present(fields, &Field::ArchivePrefix).is_some_and(|p| p.eq_ignore_ascii_case("arxiv"));
    if arxiv_prefixed {
        found = present(fields, &Field::Eprint)
            .and_then(normalize_arxiv_id)
            .map(|id| (id, Field::Eprint));
    }

    if found.is_none() {
        found = present(fields, &Field::Doi)
            .and_then(|doi| Doi::parse(doi).ok())
            .and_then(|doi| doi.arxiv_id())
            .map(|id| (id, Field::Doi));
    }

    let pages_mention = present(fields, &Field::Pages).and_then(|pages| {
        ARXIV_COLON
            .captures(pages)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    });
    if let Some(mention) = pages_mention {
        fields.remove(&Field::Pages);
        events.push(DataQualityEvent::ArxivIdRecoveredFromPages {
            eprint: mention.clone(),
        });
        if found.is_none() {
            found = normalize_arxiv_id(&mention).map(|id| (id, Field::Pages));
        }
    }

    if found.is_none() {
        found = present(fields, &Field::Journal)
            .and_then(|journal| {
                ARXIV_COLON
                    .captures(journal)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| normalize_arxiv_id(m.as_str()))
            })
            .map(|id| (id, Field::Journal));
    }

    if found.is_none() {
        found = present(fields, &Field::Url)
            .and_then(|url| ArxivId::parse(url).ok())
            .map(|id| (id.id, Field::Url));
    }

    let Some((arxiv_id, origin)) = found else {
        if present(fields, &Field::Journal).is_some_and(|j| {
            let lower = j.to_lowercase();
            lower == "arxiv" || lower == "arxiv.org"
        }) {
            fields.insert(Field::Journal, ARXIV_JOURNAL.to_string());
        }
        return Vec::new();
    };

    let mut moves = Vec::new();
    fields.insert(Field::Eprint, arxiv_id.clone());
    fields.insert(Field::ArchivePrefix, "arXiv".to_string());
    if origin != Field::Eprint {
        moves.push(FieldMove::new(origin.clone(), Field::Eprint));
        moves.push(FieldMove::new(origin.clone(), Field::ArchivePrefix));
    }

    if present(fields, &Field::Publisher).is_some_and(is_arxiv_placeholder) {
        fields.remove(&Field::Publisher);
    }

    let journal_is_arxiv = present(fields, &Field::Journal).is_some_and(|journal| {
        is_arxiv_placeholder(journal)
            || journal.to_lowercase().contains("arxiv preprint")
            || ARXIV_COLON.is_match(journal)
    });
    if journal_is_arxiv {
        fields.insert(Field::Journal, ARXIV_JOURNAL.to_string());
    }

    if !present(fields, &Field::Url).is_some_and(is_doi_url) {
        fields.insert(Field::Url, format!("https://arxiv.org/abs/{arxiv_id}"));
        if origin != Field::Url {
            moves.push(FieldMove::new(origin, Field::Url));
        }
    }
    moves
}

/// A published-venue DOI supersedes the preprint identifiers.
fn drop_superseded_preprint(fields: &mut Fields) {
    let published_doi = present(fields, &Field::Doi)
        .and_then(|doi| Doi::parse(doi).ok())
        .is_some_and(|doi| !doi.is_arxiv_minted());
    let has_eprint = present(fields, &Field::Eprint).is_some();

    if published_doi && has_eprint {
        for field in [Field::Eprint, Field::ArchivePrefix, Field::PrimaryClass] {
            fields.remove(&field);
        }
    }
}

fn restrict_url(fields: &mut Fields) {
    let Some(url) = present(fields, &Field::Url).map(str::to_string) else {
        fields.remove(&Field::Url);
        return;
    };
    match allowlisted_url(&url) {
        Some(canonical) => {
            fields.insert(Field::Url, canonical);
        }
        None => {
            tracing::debug!(%url, "dropping url outside the resolver allow-list");
            fields.remove(&Field::Url);
        }
    }
}

/// Value guards that hold regardless of where a value came from:
/// pages start with a digit, volume is not a copy of the year, and text
/// fields carry no HTML.
pub fn apply_value_guards(fields: &mut Fields, events: &mut Vec<DataQualityEvent>) {
    if let Some(pages) = present(fields, &Field::Pages).map(str::to_string)
        && !starts_with_digit(&pages)
    {
        fields.remove(&Field::Pages);
        events.push(DataQualityEvent::InvalidPagesDropped { value: pages });
    }

    if let (Some(volume), Some(year)) = (present(fields, &Field::Volume), present(fields, &Field::Year))
        && volume == year
    {
        let value = volume.to_string();
        fields.remove(&Field::Volume);
        events.push(DataQualityEvent::VolumeEqualsYearDropped { value });
    }

    for field in MARKUP_FIELDS {
        if let Some(text) = fields.get(&field) {
            let cleaned = strip_markup(text);
            if cleaned.is_empty() {
                fields.remove(&field);
            } else {
                fields.insert(field, cleaned);
            }
        }
    }
}

pub(crate) fn starts_with_digit(value: &str) -> bool {
    value.trim().chars().next().is_some_and(|c| c.is_ascii_digit())
}
