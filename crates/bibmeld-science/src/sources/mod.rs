//! Translation of per-API payloads into canonical records.

pub mod csl;

use bibmeld_core::{CanonicalRecord, SourceTag};
use serde_json::Value;

use crate::enrichment::Enricher;
use crate::error::Result;

pub use csl::CslJsonAdapter;

/// One external metadata API, seen only through the record it produces.
pub trait SourceAdapter: Send + Sync {
    fn tag(&self) -> SourceTag;

    fn to_record(&self, raw: &Value) -> Result<CanonicalRecord>;

    /// Translate and label in one step.
    fn to_enricher(&self, raw: &Value) -> Result<Enricher> {
        Ok(Enricher::new(self.tag(), self.to_record(raw)?))
    }
}
