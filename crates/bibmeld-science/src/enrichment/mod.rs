//! Trust-weighted merging of a baseline record with second opinions.

pub mod merge;
pub mod policy;
pub mod sanitize;
pub mod venue;

use std::collections::BTreeMap;

use bibmeld_core::{CanonicalRecord, EntryType, Field, MatchConfig, SourceTag};
use serde::{Deserialize, Serialize};

use crate::matching::compare_identity;

pub use merge::merge_with_policy;
pub use policy::MergePolicy;
pub use venue::{classify_venue, container_field, enforce_container, rederive_entry_type};

pub(crate) type Fields = BTreeMap<Field, String>;

/// Trimmed field value; blank reads as absent.
pub(crate) fn present<'a>(fields: &'a Fields, field: &Field) -> Option<&'a str> {
    fields.get(field).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// A value sanitation carried from one field into another. The field it
/// lands in is credited to whoever supplied the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMove {
    pub from: Field,
    pub to: Field,
}

impl FieldMove {
    pub fn new(from: Field, to: Field) -> Self {
        Self { from, to }
    }
}

/// A second opinion about the baseline publication, labelled with its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enricher {
    pub source: SourceTag,
    pub record: CanonicalRecord,
}

impl Enricher {
    pub fn new(source: impl Into<SourceTag>, record: CanonicalRecord) -> Self {
        Self {
            source: source.into(),
            record,
        }
    }
}

/// Keep only the candidates that describe the same publication as `primary`.
///
/// The merge engine trusts its caller on identity; this is the gate callers
/// run first.
pub fn collect_enrichers<I>(primary: &CanonicalRecord, candidates: I, config: &MatchConfig) -> Vec<Enricher>
where
    I: IntoIterator<Item = Enricher>,
{
    candidates
        .into_iter()
        .filter(|candidate| {
            let decision = compare_identity(primary, &candidate.record, config);
            if !decision.same {
                tracing::debug!(
                    source = %candidate.source,
                    basis = ?decision.basis,
                    "rejecting enricher: not the same publication"
                );
            }
            decision.same
        })
        .collect()
}

/// Non-fatal data-quality signals raised while merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityEvent {
    /// A lower-confidence source offered a DOI that contradicts a trusted one.
    ConflictingDoiRejected {
        source: SourceTag,
        kept: String,
        offered: String,
    },
    UncorroboratedDoiDropped {
        doi: String,
    },
    PreprintJournalRefused {
        source: SourceTag,
        offered: String,
    },
    /// A much shorter title from a source not far enough up the trust order.
    ShortTitleRefused {
        source: SourceTag,
        offered: String,
    },
    InvalidPagesDropped {
        value: String,
    },
    VolumeEqualsYearDropped {
        value: String,
    },
    ArxivIdRecoveredFromPages {
        eprint: String,
    },
    EntryTypeReclassified {
        from: EntryType,
        to: EntryType,
    },
}

/// Everything a merge produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub record: CanonicalRecord,
    /// Per enricher tag: did it supply at least one field of the final record.
    pub contributions: BTreeMap<SourceTag, bool>,
    /// Distinct enricher tags that appear in the trust order.
    pub validated_sources: usize,
    pub events: Vec<DataQualityEvent>,
}

impl MergeOutcome {
    pub fn contributed(&self, source: &SourceTag) -> bool {
        self.contributions.get(source).copied().unwrap_or(false)
    }
}
