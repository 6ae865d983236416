use bibmeld_core::{AppConfig, MatchConfig, MergeConfig, SourceTag, TrustOrder, TrustRank};

/// Everything a merge consults: the trust order, guard thresholds and the
/// matching weights. Passed explicitly to every call; nothing is global.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePolicy {
    pub matching: MatchConfig,
    pub merge: MergeConfig,
}

impl MergePolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            matching: config.matching.clone(),
            merge: config.merge.clone(),
        }
    }

    pub fn with_trust_order(mut self, order: TrustOrder) -> Self {
        self.merge.trust_order = order;
        self
    }

    pub fn rank(&self, source: &SourceTag) -> TrustRank {
        self.merge.trust_order.rank(source)
    }

    /// Rank the baseline record's fields are attributed to.
    pub fn baseline_rank(&self) -> TrustRank {
        self.rank(&self.merge.baseline_source)
    }

    pub fn is_trusted_doi_source(&self, source: &SourceTag) -> bool {
        self.merge.trusted_doi_sources.contains(source)
    }

    pub(crate) fn is_internal_field(&self, name: &str) -> bool {
        self.merge
            .internal_fields
            .iter()
            .chain(&self.merge.dropped_fields)
            .any(|f| f.eq_ignore_ascii_case(name))
    }
}
