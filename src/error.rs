use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Config directory not found at {0}. Run 'salesreport init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("API token not set. Export {0} or add it to a .env file.")]
    MissingToken(String),

    #[error("Project '{0}' not found in projects.toml")]
    UnknownProject(String),

    #[error("Invalid period: start {start} is after end {end}")]
    InvalidPeriod { start: String, end: String },

    #[error("Invalid date '{0}'. Expected 'YYYY-MM-DD' or 'YYYY-MM-DD HH:MM[:SS]'")]
    InvalidDate(String),

    #[error("External API request to {url} failed: {reason}")]
    ExternalApi { url: String, reason: String },

    #[error("Malformed record in {context}: {reason}")]
    MalformedRecord { context: String, reason: String },

    #[error("Template does not match the expected layout: {0}")]
    TemplateMismatch(String),

    #[error("Report file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid report file name '{0}'")]
    InvalidFileName(String),

    #[error("Failed to parse {part}: {reason}")]
    Xml { part: String, reason: String },

    #[error("Spreadsheet archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub(crate) fn api(url: &str, reason: impl ToString) -> Self {
        ReportError::ExternalApi {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(context: &str, reason: impl ToString) -> Self {
        ReportError::MalformedRecord {
            context: context.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn xml(part: &str, reason: impl ToString) -> Self {
        ReportError::Xml {
            part: part.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
