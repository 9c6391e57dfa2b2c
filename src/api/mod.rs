mod client;
mod model;

pub use client::MoyskladClient;
pub use model::{Assortment, CommissionReport, Document, Meta, MetaRef, Page, RawPosition, RemoteProject};

use chrono::NaiveDateTime;

use crate::error::Result;

/// Timestamp format used by the API in filters and period fields
pub const MOMENT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Filter bounds carry milliseconds, matching the precision of document moments
const FILTER_MOMENT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Server-side filter for project documents inside a period
#[derive(Debug, Clone)]
pub struct PeriodFilter {
    pub project: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodFilter {
    /// Render as the API `filter` parameter (both bounds inclusive)
    pub fn expression(&self) -> String {
        format!(
            "project={};moment>={};moment<={}",
            self.project,
            self.start.format(FILTER_MOMENT_FORMAT),
            self.end.format(FILTER_MOMENT_FORMAT)
        )
    }
}

/// Read-only view of the documents a report is built from.
pub trait DocumentSource {
    /// Shipments (demands) of a project inside the period
    fn shipments(&self, filter: &PeriodFilter) -> Result<Vec<Document>>;

    /// Customer returns of a project inside the period
    fn customer_returns(&self, filter: &PeriodFilter) -> Result<Vec<Document>>;

    /// Every incoming commission report of an agent, regardless of period
    fn commission_reports(&self, agent: &str) -> Result<Vec<CommissionReport>>;

    /// Line items behind a positions reference, with assortment expanded
    fn positions(&self, href: &str) -> Result<Vec<RawPosition>>;
}

impl<S: DocumentSource + ?Sized> DocumentSource for &S {
    fn shipments(&self, filter: &PeriodFilter) -> Result<Vec<Document>> {
        (**self).shipments(filter)
    }

    fn customer_returns(&self, filter: &PeriodFilter) -> Result<Vec<Document>> {
        (**self).customer_returns(filter)
    }

    fn commission_reports(&self, agent: &str) -> Result<Vec<CommissionReport>> {
        (**self).commission_reports(agent)
    }

    fn positions(&self, href: &str) -> Result<Vec<RawPosition>> {
        (**self).positions(href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn filter_expression_uses_inclusive_bounds() {
        let filter = PeriodFilter {
            project: "https://example.test/entity/project/1".to_string(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31)
                .unwrap()
                .and_hms_milli_opt(23, 59, 59, 999)
                .unwrap(),
        };
        assert_eq!(
            filter.expression(),
            "project=https://example.test/entity/project/1;moment>=2024-01-01 00:00:00.000;moment<=2024-01-31 23:59:59.999"
        );
    }
}
