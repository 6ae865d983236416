use std::path::PathBuf;

use bibmeld_core::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("invalid arXiv ID: {0}")]
    InvalidArxivId(String),

    #[error("parse error from {source_tag}: {message}")]
    Parse { source_tag: String, message: String },

    /// Two different publications map to one stored file. Never swallowed.
    #[error("filename collision at {path}: stored record '{existing_key}' is a different publication than '{incoming_key}'")]
    FilenameCollision {
        path: PathBuf,
        existing_key: String,
        incoming_key: String,
    },

    #[error(transparent)]
    Core(#[from] bibmeld_core::BibmeldError),
}

impl ScienceError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidDoi(_) | Self::InvalidArxivId(_) | Self::Parse { .. } => ExitCode::InvalidArgs,
            Self::FilenameCollision { .. } => ExitCode::Conflict,
            Self::Core(e) => e.exit_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;
