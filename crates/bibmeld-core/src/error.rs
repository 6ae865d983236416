use thiserror::Error;

/// All errors that can occur in bibmeld-core.
#[derive(Debug, Error)]
pub enum BibmeldError {
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes used by the `bibmeld` binary.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    FileSystemError = 4,
    Conflict = 7,
}

impl BibmeldError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::RecordNotFound(_) | Self::DirectoryNotFound(_) => ExitCode::NotFound,
            Self::ValidationError(_) | Self::ConfigError(_) => ExitCode::InvalidArgs,
            Self::Io(_) => ExitCode::FileSystemError,
            Self::Json(_) | Self::TomlParse(_) | Self::TomlSerialize(_) => ExitCode::GeneralError,
        }
    }
}

pub type Result<T> = std::result::Result<T, BibmeldError>;
