use bibmeld_core::{CanonicalRecord, Field};
use once_cell::sync::Lazy;
use regex::Regex;

use super::arxiv::normalize_arxiv_id;
use super::doi::normalize_doi;

static DOI_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(10\.\d{4,9}/[-._;()/:A-Z0-9]+)\b").expect("valid doi regex")
});

static DOI_META_TAGS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)<meta[^>]+name=["']citation_doi["'][^>]+content=["']([^"']+)["']"#,
        r#"(?i)<meta[^>]+name=["']dc\.identifier["'][^>]+content=["']doi:?\s*([^"']+)["']"#,
        r#"(?i)<meta[^>]+property=["']og:doi["'][^>]+content=["']([^"']+)["']"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid doi meta regex"))
    .collect()
});

static ARXIV_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)arxiv[:/\s]*(\d{4}\.\d{4,5})(?:v\d+)?").expect("valid arxiv mention regex")
});

static ARXIV_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)arxiv\.org/(?:abs|pdf)/(\d{4}\.\d{4,5})").expect("valid arxiv link regex")
});

/// `arXiv: 2401.12345` as it shows up inside journal, howpublished or pages.
pub(crate) static ARXIV_COLON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)arxiv:\s*(\d{4}\.\d{4,5})(?:v\d+)?").expect("valid arxiv colon regex")
});

/// First DOI-looking token in free text, normalized.
pub fn find_doi_in_text(text: &str) -> Option<String> {
    DOI_IN_TEXT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| normalize_doi(m.as_str()))
}

/// DOI from an HTML page: citation meta tags first, then anywhere in the markup.
pub fn find_doi_in_html(html: &str) -> Option<String> {
    DOI_META_TAGS
        .iter()
        .filter_map(|re| re.captures(html))
        .filter_map(|caps| caps.get(1))
        .find_map(|m| normalize_doi(m.as_str()).filter(|d| DOI_IN_TEXT.is_match(d)))
        .or_else(|| find_doi_in_text(html))
}

/// arXiv id mentioned in text, either as `arXiv:ID` or as an arxiv.org link.
pub fn find_arxiv_in_text(text: &str) -> Option<String> {
    ARXIV_MENTION
        .captures(text)
        .and_then(|caps| caps.get(1))
        .or_else(|| ARXIV_LINK.captures(text).and_then(|caps| caps.get(1)))
        .and_then(|m| normalize_arxiv_id(m.as_str()))
}

/// arXiv id a record exposes: `archiveprefix=arXiv` plus `eprint`, or an
/// `arXiv:ID` mention in journal or howpublished.
pub fn arxiv_eprint_of(record: &CanonicalRecord) -> Option<String> {
    let is_arxiv_prefixed = record
        .get(&Field::ArchivePrefix)
        .is_some_and(|p| p.eq_ignore_ascii_case("arxiv"));
    if is_arxiv_prefixed {
        return record.get(&Field::Eprint).and_then(normalize_arxiv_id);
    }

    [Field::Journal, Field::Howpublished]
        .iter()
        .filter_map(|field| record.get(field))
        .find_map(|text| {
            ARXIV_COLON
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| normalize_arxiv_id(m.as_str()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibmeld_core::EntryType;

    #[test]
    fn doi_in_free_text() {
        assert_eq!(
            find_doi_in_text("see https://doi.org/10.1145/3292500.3330701 for details").as_deref(),
            Some("10.1145/3292500.3330701")
        );
        assert_eq!(find_doi_in_text("no identifier here"), None);
    }

    #[test]
    fn doi_in_html_prefers_meta_tags() {
        let html = r#"<html><head>
            <meta name="citation_doi" content="10.1000/META">
            </head><body>cites 10.9999/other</body></html>"#;
        assert_eq!(find_doi_in_html(html).as_deref(), Some("10.1000/meta"));

        let html = r#"<meta name="dc.identifier" content="doi:10.1000/DC">"#;
        assert_eq!(find_doi_in_html(html).as_deref(), Some("10.1000/dc"));

        assert_eq!(
            find_doi_in_html("<p>10.1234/body.text</p>").as_deref(),
            Some("10.1234/body.text")
        );
    }

    #[test]
    fn arxiv_in_text_variants() {
        assert_eq!(find_arxiv_in_text("arXiv:1706.03762v5").as_deref(), Some("1706.03762"));
        assert_eq!(
            find_arxiv_in_text("https://arxiv.org/abs/2401.12345").as_deref(),
            Some("2401.12345")
        );
        assert_eq!(find_arxiv_in_text("page 1706"), None);
    }

    #[test]
    fn eprint_from_record_fields() {
        let proper = CanonicalRecord::new(EntryType::Misc, "a")
            .with(Field::ArchivePrefix, "arXiv")
            .with(Field::Eprint, "1706.03762v2");
        assert_eq!(arxiv_eprint_of(&proper).as_deref(), Some("1706.03762"));

        let in_journal = CanonicalRecord::new(EntryType::Article, "b")
            .with(Field::Journal, "arXiv preprint arXiv: 2401.12345");
        assert_eq!(arxiv_eprint_of(&in_journal).as_deref(), Some("2401.12345"));

        let in_howpublished = CanonicalRecord::new(EntryType::Misc, "c")
            .with(Field::Howpublished, "arXiv:2002.00001");
        assert_eq!(arxiv_eprint_of(&in_howpublished).as_deref(), Some("2002.00001"));

        let none = CanonicalRecord::new(EntryType::Article, "d").with(Field::Journal, "Nature");
        assert_eq!(arxiv_eprint_of(&none), None);
    }
}
