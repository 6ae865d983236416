use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Bibliographic entry kind. Only the four kinds the merge engine reasons about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Article,
    Inproceedings,
    Incollection,
    #[default]
    Misc,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Inproceedings => "inproceedings",
            Self::Incollection => "incollection",
            Self::Misc => "misc",
        }
    }

    /// Case-insensitive lookup; unknown names are `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "article" => Some(Self::Article),
            "inproceedings" | "conference" => Some(Self::Inproceedings),
            "incollection" => Some(Self::Incollection),
            "misc" => Some(Self::Misc),
            _ => None,
        }
    }

    /// True for the kinds that carry venue information (everything but misc).
    pub fn is_specific(&self) -> bool {
        !matches!(self, Self::Misc)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field names of a canonical record.
///
/// The well-known vocabulary is a closed set; anything else is kept as
/// `Other` with its lowercased name so adapters can pass through extension
/// fields without losing them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Field {
    Title,
    Author,
    Year,
    Journal,
    Booktitle,
    Howpublished,
    Publisher,
    Series,
    Volume,
    Number,
    Pages,
    Doi,
    Url,
    Eprint,
    ArchivePrefix,
    PrimaryClass,
    Note,
    Other(String),
}

impl Field {
    /// The three mutually exclusive container fields.
    pub const CONTAINERS: [Field; 3] = [Field::Journal, Field::Booktitle, Field::Howpublished];

    pub fn from_name(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "title" => Self::Title,
            "author" => Self::Author,
            "year" => Self::Year,
            "journal" => Self::Journal,
            "booktitle" => Self::Booktitle,
            "howpublished" => Self::Howpublished,
            "publisher" => Self::Publisher,
            "series" => Self::Series,
            "volume" => Self::Volume,
            "number" => Self::Number,
            "pages" => Self::Pages,
            "doi" => Self::Doi,
            "url" => Self::Url,
            "eprint" => Self::Eprint,
            "archiveprefix" => Self::ArchivePrefix,
            "primaryclass" => Self::PrimaryClass,
            "note" => Self::Note,
            _ => Self::Other(lower),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Year => "year",
            Self::Journal => "journal",
            Self::Booktitle => "booktitle",
            Self::Howpublished => "howpublished",
            Self::Publisher => "publisher",
            Self::Series => "series",
            Self::Volume => "volume",
            Self::Number => "number",
            Self::Pages => "pages",
            Self::Doi => "doi",
            Self::Url => "url",
            Self::Eprint => "eprint",
            Self::ArchivePrefix => "archiveprefix",
            Self::PrimaryClass => "primaryclass",
            Self::Note => "note",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Self::from_name(value)
    }
}

impl From<Field> for String {
    fn from(value: Field) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized `type/key/fields` representation shared by every component.
///
/// Merge operations never mutate their inputs; they clone into a new record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "type", default)]
    pub entry_type: EntryType,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub fields: BTreeMap<Field, String>,
}

impl CanonicalRecord {
    pub fn new(entry_type: EntryType, key: impl Into<String>) -> Self {
        Self {
            entry_type,
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter, mostly for tests and adapters.
    pub fn with(mut self, field: impl Into<Field>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<Field>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &Field) -> Option<String> {
        self.fields.remove(field)
    }

    /// Field value, trimmed; empty values read as absent.
    pub fn get(&self, field: &Field) -> Option<&str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn has(&self, field: &Field) -> bool {
        self.get(field).is_some()
    }

    pub fn title(&self) -> Option<&str> {
        self.get(&Field::Title)
    }

    pub fn author(&self) -> Option<&str> {
        self.get(&Field::Author)
    }

    pub fn year(&self) -> Option<&str> {
        self.get(&Field::Year)
    }

    pub fn doi(&self) -> Option<&str> {
        self.get(&Field::Doi)
    }

    /// Number of fields carrying a non-blank value.
    pub fn non_empty_field_count(&self) -> usize {
        self.fields.values().filter(|v| !v.trim().is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_type_from_name_is_case_insensitive() {
        assert_eq!(EntryType::from_name("Article"), Some(EntryType::Article));
        assert_eq!(
            EntryType::from_name("INPROCEEDINGS"),
            Some(EntryType::Inproceedings)
        );
        assert_eq!(EntryType::from_name("book"), None);
        assert!(!EntryType::Misc.is_specific());
    }

    #[test]
    fn field_names_round_trip_and_keep_extensions() {
        assert_eq!(Field::from_name("ArchivePrefix"), Field::ArchivePrefix);
        assert_eq!(Field::from_name("x_custom"), Field::Other("x_custom".into()));
        assert_eq!(Field::Other("x_custom".into()).as_str(), "x_custom");
    }

    #[test]
    fn record_serializes_with_string_keys() {
        let record = CanonicalRecord::new(EntryType::Article, "smith2020")
            .with(Field::Title, "A Title")
            .with("keywords", "x, y");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "article");
        assert_eq!(json["fields"]["title"], "A Title");
        assert_eq!(json["fields"]["keywords"], "x, y");

        let back: CanonicalRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn blank_values_read_as_absent() {
        let record = CanonicalRecord::default().with(Field::Pages, "   ");
        assert_eq!(record.get(&Field::Pages), None);
        assert_eq!(record.non_empty_field_count(), 0);
    }
}
