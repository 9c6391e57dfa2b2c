pub mod api;
pub mod config;
pub mod error;
pub mod report;
pub mod sheet;

pub use config::{Config, ProjectAgentMap, ProjectEntry};
pub use error::{ReportError, Result};
pub use report::{deliver, generate_report, FetchedReport, Fetcher, GeneratedReport, ReportLine};
