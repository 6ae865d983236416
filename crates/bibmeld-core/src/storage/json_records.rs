use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::CanonicalRecord;

/// File name used for a record whose caller did not pick one: `{key}.json`.
pub fn record_file_name(record: &CanonicalRecord) -> String {
    let stem: String = record
        .key
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "untitled.json".to_string()
    } else {
        format!("{stem}.json")
    }
}

/// Write a record as pretty JSON: `{dir}/{file_name}`.
pub fn save_record(dir: &Path, file_name: &str, record: &CanonicalRecord) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    write_record(&path, record)?;
    Ok(path)
}

/// Overwrite the record stored at `path`.
pub fn write_record(path: &Path, record: &CanonicalRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_record(path: &Path) -> Result<CanonicalRecord> {
    let contents = fs::read_to_string(path)?;
    let record: CanonicalRecord = serde_json::from_str(&contents)?;
    Ok(record)
}

/// All readable records in `dir`, ordered by path.
///
/// Files that fail to parse are skipped with a warning.
pub fn list_records(dir: &Path) -> Result<Vec<(PathBuf, CanonicalRecord)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            match load_record(&path) {
                Ok(record) => records.push((path, record)),
                Err(e) => {
                    tracing::warn!("skipping unreadable record {}: {e}", path.display());
                }
            }
        }
    }
    records.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryType, Field};
    use tempfile::TempDir;

    fn sample(key: &str, title: &str) -> CanonicalRecord {
        CanonicalRecord::new(EntryType::Article, key).with(Field::Title, title)
    }

    #[test]
    fn test_save_and_load_record() {
        let dir = TempDir::new().unwrap();
        let records_dir = dir.path().join("hinton");

        let record = sample("hinton2006", "Reducing the Dimensionality of Data");
        let name = record_file_name(&record);
        let path = save_record(&records_dir, &name, &record).unwrap();

        assert_eq!(path, records_dir.join("hinton2006.json"));
        assert_eq!(load_record(&path).unwrap(), record);
    }

    #[test]
    fn test_list_records_sorted_and_skips_garbage() {
        let dir = TempDir::new().unwrap();
        save_record(dir.path(), "b.json", &sample("b", "Second")).unwrap();
        save_record(dir.path(), "a.json", &sample("a", "First")).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let records = list_records(dir.path()).unwrap();
        let keys: Vec<_> = records.iter().map(|(_, r)| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_list_records_nonexistent_dir() {
        let records = list_records(Path::new("/tmp/nonexistent_bibmeld_dir")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_record_file_name_sanitizes_key() {
        assert_eq!(record_file_name(&sample("smith:2020/x", "")), "smith_2020_x.json");
        assert_eq!(record_file_name(&sample("  ", "")), "untitled.json");
    }
}
