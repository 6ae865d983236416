pub mod names;
pub mod normalize;
pub mod year;

pub use names::{
    NameSignature, author_in_text, author_matches_names, author_name_matches, authors_from_value,
    authors_overlap, name_signature, names_overlap, parse_authors,
};
pub use normalize::{
    collapse_whitespace, fold_to_ascii, has_placeholder, normalize_person_name, normalize_title,
    strip_markup, trim_trailing_period,
};
pub use year::{YearRange, year_from_str, year_from_value};
