//! Venue-text heuristics for entry types and the single-container rule.

use bibmeld_core::{EntryType, Field};

use super::{FieldMove, Fields, present as value};

const CONFERENCE_KEYWORDS: &[&str] = &[
    "proceedings",
    "conference",
    "symposium",
    "workshop",
    "meeting",
    "summit",
    "congress",
    "colloquium",
    "chapter of the association",
    "findings of",
    "lecture notes in computer science",
];

const BOOK_SERIES_KEYWORDS: &[&str] = &[
    "lecture notes",
    "series",
    "handbook",
    "advances in",
    "studies in",
    "chapter",
];

const BOOK_PUBLISHER_KEYWORDS: &[&str] =
    &["springer", "elsevier", "wiley", "crc press", "cambridge", "oxford"];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// The container field a given entry type publishes its venue in.
pub fn container_field(entry_type: EntryType) -> Field {
    match entry_type {
        EntryType::Article => Field::Journal,
        EntryType::Inproceedings | EntryType::Incollection => Field::Booktitle,
        EntryType::Misc => Field::Howpublished,
    }
}

/// Type implied by venue text alone, if the text is conclusive.
///
/// A book chapter shows up as howpublished + publisher + pages without a
/// journal or booktitle, with a book-series or book-publisher name.
/// Conference words anywhere in the venue text mean inproceedings, except
/// that an incollection already filed as a chapter stays put: its booktitle
/// names a book series, or it carries a book publisher and pages.
pub fn classify_venue(fields: &Fields, current: EntryType) -> Option<EntryType> {
    let howpublished = value(fields, &Field::Howpublished);
    let publisher = value(fields, &Field::Publisher);
    let has_pages = value(fields, &Field::Pages).is_some();
    let has_journal = value(fields, &Field::Journal).is_some();
    let booktitle = value(fields, &Field::Booktitle);

    if let (Some(howpublished), Some(publisher)) = (howpublished, publisher)
        && has_pages
        && !has_journal
        && booktitle.is_none()
        && (contains_any(howpublished, BOOK_SERIES_KEYWORDS)
            || contains_any(publisher, BOOK_PUBLISHER_KEYWORDS))
    {
        return Some(EntryType::Incollection);
    }

    if current == EntryType::Incollection
        && let Some(booktitle) = booktitle
        && (contains_any(booktitle, BOOK_SERIES_KEYWORDS)
            || (has_pages && publisher.is_some_and(|p| contains_any(p, BOOK_PUBLISHER_KEYWORDS))))
    {
        return None;
    }

    // howpublished is scanned too: it may become the container later.
    let venue_fields = [
        Field::Journal,
        Field::Other("container-title".to_string()),
        Field::Other("venue".to_string()),
        Field::Booktitle,
        Field::Howpublished,
    ];
    venue_fields
        .iter()
        .filter_map(|f| value(fields, f))
        .any(|venue| contains_any(venue, CONFERENCE_KEYWORDS))
        .then_some(EntryType::Inproceedings)
}

/// Weak hint from which container is filled: journal -> article,
/// booktitle -> inproceedings.
pub fn container_hint(fields: &Fields) -> Option<EntryType> {
    if value(fields, &Field::Journal).is_some() {
        Some(EntryType::Article)
    } else if value(fields, &Field::Booktitle).is_some() {
        Some(EntryType::Inproceedings)
    } else {
        None
    }
}

/// Final entry type: conclusive venue text overrides the trust-chosen type;
/// a type still at misc falls back to the container hint.
pub fn rederive_entry_type(current: EntryType, fields: &Fields) -> EntryType {
    let derived = classify_venue(fields, current).unwrap_or(current);
    if derived == EntryType::Misc {
        container_hint(fields).unwrap_or(EntryType::Misc)
    } else {
        derived
    }
}

/// Leave exactly the container field matching `entry_type`, moving a
/// venue over from another container when the right one is empty.
pub fn enforce_container(entry_type: EntryType, fields: &mut Fields) -> Option<FieldMove> {
    let target = container_field(entry_type);
    let mut migrated = None;

    if value(fields, &target).is_none() {
        // Preference order for the venue text that moves into the target slot.
        let donors: &[Field] = match entry_type {
            EntryType::Article => &[Field::Booktitle, Field::Howpublished],
            EntryType::Inproceedings | EntryType::Incollection => {
                &[Field::Journal, Field::Howpublished]
            }
            EntryType::Misc => &[],
        };
        if let Some((donor, moved)) = donors
            .iter()
            .find_map(|f| value(fields, f).map(|v| (f.clone(), v.to_string())))
        {
            fields.insert(target.clone(), moved);
            migrated = Some(FieldMove::new(donor, target.clone()));
        }
    }

    for field in Field::CONTAINERS {
        if field != target {
            fields.remove(&field);
        }
    }
    migrated
}
