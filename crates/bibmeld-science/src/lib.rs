//! Bibmeld Science: identity resolution, deduplication and trust-weighted
//! merging of bibliographic records.

pub mod dedup;
pub mod enrichment;
pub mod error;
pub mod identifiers;
pub mod matching;
pub mod similarity;
pub mod sources;
pub mod store;
pub mod text;

pub use dedup::{
    Deduplicator, REFETCH_THRESHOLD, dedupe_within, is_truncated, merge_lists, needs_refetch, truncation_score,
};
pub use enrichment::{
    DataQualityEvent, Enricher, FieldMove, MergeOutcome, MergePolicy, collect_enrichers, merge_with_policy,
};
pub use error::{Result, ScienceError};
pub use matching::{IdentityBasis, IdentityDecision, compare_identity, is_same_publication};
pub use similarity::{MatchKind, Scorable, ScoredCandidate, best_by_score, best_item, pick_candidate, score, title_similarity};
pub use sources::{CslJsonAdapter, SourceAdapter};
pub use store::{RecordStore, StoreOutcome};
