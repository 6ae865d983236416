pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::{AppConfig, MatchConfig, MergeConfig, StoreConfig};
pub use error::{BibmeldError, ExitCode, Result};
pub use models::*;
