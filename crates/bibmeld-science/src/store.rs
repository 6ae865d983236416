//! Duplicate-aware writes into one author's record directory.

use std::path::{Path, PathBuf};

use bibmeld_core::storage::json_records::{list_records, load_record, record_file_name, save_record, write_record};
use bibmeld_core::{AppConfig, CanonicalRecord};
use serde::Serialize;

use crate::error::{Result, ScienceError};
use crate::identifiers::normalize_doi;
use crate::similarity::{Scorable, meets_threshold, title_similarity};

/// What a save did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "path", rename_all = "snake_case")]
pub enum StoreOutcome {
    Created(PathBuf),
    /// Same artifact already stored; rewritten in place.
    Updated(PathBuf),
    /// Same artifact already stored with more fields; left alone.
    Skipped(PathBuf),
}

impl StoreOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Updated(p) | Self::Skipped(p) => p,
        }
    }
}

/// Record storage for a single author. Every operation stays inside `dir`,
/// so stores for different authors never need to coordinate.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
    title_threshold: f64,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            title_threshold: 0.9,
        }
    }

    pub fn for_author(config: &AppConfig, author: &str) -> Self {
        Self::new(config.author_dir(author)).with_title_threshold(config.store.same_artifact_title_threshold)
    }

    pub fn with_title_threshold(mut self, threshold: f64) -> Self {
        self.title_threshold = threshold;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether two records are the same stored artifact.
    ///
    /// Two different DOIs always mean different artifacts. Otherwise an
    /// equal DOI, an equal key or near-identical titles are enough.
    pub fn is_same_artifact(&self, a: &CanonicalRecord, b: &CanonicalRecord) -> bool {
        let doi_a = a.doi().and_then(normalize_doi);
        let doi_b = b.doi().and_then(normalize_doi);
        if let (Some(da), Some(db)) = (&doi_a, &doi_b) {
            return da == db;
        }

        let key_a = a.key.trim();
        if !key_a.is_empty() && key_a == b.key.trim() {
            return true;
        }

        match (Scorable::title(a), Scorable::title(b)) {
            (Some(ta), Some(tb)) => meets_threshold(title_similarity(ta, tb), self.title_threshold),
            _ => false,
        }
    }

    /// First stored record that is the same artifact as `record`.
    pub fn find_existing(&self, record: &CanonicalRecord) -> Result<Option<(PathBuf, CanonicalRecord)>> {
        Ok(list_records(&self.dir)?
            .into_iter()
            .find(|(_, stored)| self.is_same_artifact(stored, record)))
    }

    /// Save under the file name derived from the record's key.
    pub fn store(&self, record: &CanonicalRecord) -> Result<StoreOutcome> {
        self.save(record, &record_file_name(record))
    }

    /// Save `record`, preferring an existing file that holds the same
    /// artifact over `file_name`.
    ///
    /// A richer stored version is never downgraded. A different publication
    /// already sitting at `file_name` is a [`ScienceError::FilenameCollision`].
    pub fn save(&self, record: &CanonicalRecord, file_name: &str) -> Result<StoreOutcome> {
        if let Some((path, stored)) = self.find_existing(record)? {
            if stored.non_empty_field_count() > record.non_empty_field_count() {
                tracing::debug!(path = %path.display(), "stored record is richer, skipping write");
                return Ok(StoreOutcome::Skipped(path));
            }
            write_record(&path, record)?;
            tracing::debug!(path = %path.display(), "updated stored record");
            return Ok(StoreOutcome::Updated(path));
        }

        let target = self.dir.join(file_name);
        if target.exists() {
            let existing = load_record(&target)?;
            tracing::error!(
                path = %target.display(),
                existing = %existing.key,
                incoming = %record.key,
                "filename collision between different publications"
            );
            return Err(ScienceError::FilenameCollision {
                path: target,
                existing_key: existing.key,
                incoming_key: record.key.clone(),
            });
        }

        let path = save_record(&self.dir, file_name, record)?;
        tracing::debug!(path = %path.display(), "created stored record");
        Ok(StoreOutcome::Created(path))
    }
}
