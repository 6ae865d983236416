use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BibmeldError, Result};
use crate::models::{SourceTag, TrustOrder};

/// Root configuration, loaded from `~/.config/bibmeld/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub matching: MatchConfig,
    pub merge: MergeConfig,
    pub store: StoreConfig,
}

/// Weights and thresholds of the similarity scorer and deduplicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub title_weight: f64,
    pub author_bonus: f64,
    pub year_bonus: f64,
    pub year_window: i32,
    pub title_sim_min: f64,
    pub exact_pick_threshold: f64,
    pub best_item_threshold: f64,
    pub merge_duplicate_threshold: f64,
    pub strict_title_threshold: f64,
    pub strict_year_window: i32,
    pub min_year: i32,
    pub max_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub trust_order: TrustOrder,
    /// Tag the baseline record's fields are attributed to.
    pub baseline_source: SourceTag,
    pub trusted_doi_sources: Vec<SourceTag>,
    pub internal_fields: Vec<String>,
    pub dropped_fields: Vec<String>,
    pub title_shrink_ratio: f64,
    pub title_shrink_min_tiers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub output_dir: String,
    pub same_artifact_title_threshold: f64,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            title_weight: 0.7,
            author_bonus: 0.2,
            year_bonus: 0.2,
            year_window: 1,
            title_sim_min: 0.8,
            exact_pick_threshold: 0.9,
            best_item_threshold: 0.8,
            merge_duplicate_threshold: 0.9,
            strict_title_threshold: 0.95,
            strict_year_window: 1,
            min_year: 1900,
            max_year: 2099,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            trust_order: TrustOrder::default(),
            baseline_source: SourceTag::new("scholar_min"),
            trusted_doi_sources: ["csl", "doi_bibtex", "datacite", "pubmed", "europepmc", "crossref"]
                .into_iter()
                .map(SourceTag::new)
                .collect(),
            internal_fields: vec!["x_scholar_citation_id".to_string()],
            dropped_fields: vec!["keywords".to_string(), "copyright".to_string()],
            title_shrink_ratio: 0.8,
            title_shrink_min_tiers: 3,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("bibmeld")
            .join("records");

        Self {
            output_dir: data_dir.to_string_lossy().to_string(),
            same_artifact_title_threshold: 0.9,
        }
    }
}

// ─── Validation ────────────────────────────────────────────

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("title_sim_min", self.title_sim_min),
            ("strict_title_threshold", self.strict_title_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(BibmeldError::ConfigError(format!(
                    "matching.{name} must be within 0..=1, got {value}"
                )));
            }
        }
        if self.year_window < 0 || self.strict_year_window < 0 {
            return Err(BibmeldError::ConfigError(
                "matching year windows must not be negative".to_string(),
            ));
        }
        if self.min_year > self.max_year {
            return Err(BibmeldError::ConfigError(format!(
                "matching.min_year {} is after max_year {}",
                self.min_year, self.max_year
            )));
        }
        Ok(())
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/bibmeld/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("BIBMELD_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("bibmeld")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.matching.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Directory holding one author's stored records.
    pub fn author_dir(&self, author: &str) -> PathBuf {
        let slug: String = author
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        PathBuf::from(&self.store.output_dir).join(slug)
    }
}
