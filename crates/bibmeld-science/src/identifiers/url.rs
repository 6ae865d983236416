use once_cell::sync::Lazy;
use regex::Regex;

static DOI_RESOLVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://(?:dx\.)?doi\.org/(\S+)$").expect("valid doi url regex")
});

static ARXIV_PAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.)?arxiv\.org/(abs|pdf)/(\S+)$").expect("valid arxiv url regex")
});

/// Keep only links to trusted resolvers, rewritten to canonical `https://` form.
///
/// `doi.org`/`dx.doi.org` become `https://doi.org/...`; arXiv abstract and
/// PDF pages become `https://arxiv.org/...`. Anything else is `None`.
pub fn allowlisted_url(url: &str) -> Option<String> {
    let url = url.trim();
    if let Some(caps) = DOI_RESOLVER.captures(url) {
        return caps.get(1).map(|suffix| format!("https://doi.org/{}", suffix.as_str()));
    }
    let caps = ARXIV_PAGE.captures(url)?;
    let kind = caps.get(1)?.as_str().to_ascii_lowercase();
    let rest = caps.get(2)?.as_str();
    Some(format!("https://arxiv.org/{kind}/{rest}"))
}

pub fn is_doi_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains("doi.org")
}
