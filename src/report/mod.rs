mod deliver;
mod fetch;
mod generator;
mod line;

pub use deliver::{deliver, report_path};
pub use fetch::{FetchedReport, Fetcher, ReportRequest};
pub use generator::{generate_report, generate_with_source, render_report, GeneratedReport};
pub use line::{
    classify, Category, CommissionReturn, CommissionSold, CustomerReturn, DocumentLabel,
    ReportLine, Shipment,
};
