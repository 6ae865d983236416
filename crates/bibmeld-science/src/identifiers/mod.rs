pub mod arxiv;
pub mod doi;
pub mod extract;
pub mod url;

pub use arxiv::{ArxivId, normalize_arxiv_id};
pub use doi::{Doi, is_arxiv_doi, normalize_doi};
pub use extract::{arxiv_eprint_of, find_arxiv_in_text, find_doi_in_html, find_doi_in_text};
pub use url::{allowlisted_url, is_doi_url};
