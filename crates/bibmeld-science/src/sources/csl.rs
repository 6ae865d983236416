use bibmeld_core::{CanonicalRecord, EntryType, Field, SourceTag};
use serde_json::Value;

use super::SourceAdapter;
use crate::enrichment::container_field;
use crate::error::{Result, ScienceError};
use crate::identifiers::{find_arxiv_in_text, find_doi_in_text};
use crate::text::{YearRange, collapse_whitespace, year_from_value};

/// CSL-JSON, as served by doi.org content negotiation and (wrapped in
/// `message`) by the Crossref works API.
#[derive(Debug, Clone)]
pub struct CslJsonAdapter {
    tag: SourceTag,
    years: YearRange,
}

impl Default for CslJsonAdapter {
    fn default() -> Self {
        Self::new("csl")
    }
}

impl CslJsonAdapter {
    pub fn new(tag: impl Into<SourceTag>) -> Self {
        Self {
            tag: tag.into(),
            years: YearRange::default(),
        }
    }

    pub fn crossref() -> Self {
        Self::new("crossref")
    }

    pub fn with_years(mut self, years: YearRange) -> Self {
        self.years = years;
        self
    }

    fn parse_error(&self, message: impl Into<String>) -> ScienceError {
        ScienceError::Parse {
            source_tag: self.tag.to_string(),
            message: message.into(),
        }
    }
}

impl SourceAdapter for CslJsonAdapter {
    fn tag(&self) -> SourceTag {
        self.tag.clone()
    }

    fn to_record(&self, raw: &Value) -> Result<CanonicalRecord> {
        let item = raw.get("message").unwrap_or(raw);
        if !item.is_object() {
            return Err(self.parse_error("expected a CSL-JSON object"));
        }

        let title = first_text(&item["title"])
            .ok_or_else(|| self.parse_error("missing title"))?;
        let entry_type = item["type"].as_str().map(entry_type_from_csl).unwrap_or_default();
        let key = item["id"].as_str().unwrap_or_default();

        let mut record = CanonicalRecord::new(entry_type, key).with(Field::Title, title);

        let authors = parse_authors(&item["author"]);
        if !authors.is_empty() {
            record.set(Field::Author, authors.join(" and "));
        }

        // issued / published-print / published-online date-parts
        if let Some(year) = year_from_value(item, self.years) {
            record.set(Field::Year, year.to_string());
        }

        if let Some(container) = first_text(&item["container-title"]) {
            record.set(container_field(entry_type), container);
        }
        if let Some(series) = first_text(&item["collection-title"]) {
            record.set(Field::Series, series);
        }

        let scalars = [
            ("volume", Field::Volume),
            ("issue", Field::Number),
            ("page", Field::Pages),
            ("publisher", Field::Publisher),
            ("DOI", Field::Doi),
            ("URL", Field::Url),
        ];
        for (name, field) in scalars {
            if let Some(value) = scalar_text(&item[name]) {
                record.set(field, value);
            }
        }

        if !record.has(&Field::Doi)
            && let Some(doi) = record.get(&Field::Url).and_then(find_doi_in_text)
        {
            record.set(Field::Doi, doi);
        }

        // arXiv registrations carry the id in `number`, sometimes only in a note or link.
        let arxiv_id = ["number", "note", "URL"]
            .iter()
            .filter_map(|name| first_text(&item[*name]))
            .find_map(|text| find_arxiv_in_text(&text));
        if let Some(id) = arxiv_id {
            record.set(Field::Eprint, id);
            record.set(Field::ArchivePrefix, "arXiv");
        }

        Ok(record)
    }
}

/// CSL `type` to the four entry kinds the merge engine knows.
pub fn entry_type_from_csl(csl_type: &str) -> EntryType {
    match csl_type.trim().to_ascii_lowercase().as_str() {
        "article-journal" | "journal-article" | "article" => EntryType::Article,
        "paper-conference" | "proceedings-article" => EntryType::Inproceedings,
        "chapter" | "book-chapter" => EntryType::Incollection,
        _ => EntryType::Misc,
    }
}

/// A string, or the first non-blank string of an array.
fn first_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(collapse_whitespace(s)).filter(|s| !s.is_empty()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

/// Volumes and issues show up as both strings and numbers.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        other => first_text(other),
    }
}

fn parse_authors(v: &Value) -> Vec<String> {
    v.as_array()
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| {
                    let family = a["family"].as_str().map(str::trim).filter(|s| !s.is_empty());
                    let given = a["given"].as_str().map(str::trim).filter(|s| !s.is_empty());
                    match (family, given) {
                        (Some(f), Some(g)) => Some(format!("{f}, {g}")),
                        (Some(f), None) => Some(f.to_string()),
                        (None, Some(g)) => Some(g.to_string()),
                        (None, None) => a["literal"]
                            .as_str()
                            .or_else(|| a["name"].as_str())
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty()),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}
