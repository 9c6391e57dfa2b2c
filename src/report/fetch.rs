use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::line::{
    classify, Category, CommissionReturn, CommissionSold, CustomerReturn, DocumentLabel,
    ReportLine, Shipment,
};
use crate::api::{CommissionReport, DocumentSource, PeriodFilter, RawPosition, MOMENT_FORMAT};
use crate::config::ProjectAgentMap;
use crate::error::{ReportError, Result};

const SHIPMENT_LABEL: &str = "Отгрузка № ";
const COMMISSION_LABEL: &str = "Отчёт комиссионера № ";
const CUSTOMER_RETURN_LABEL: &str = "Возврат покупателя № ";

/// Parameters of one report run. Both period bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub project: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub agent: String,
}

impl ReportRequest {
    fn period_filter(&self) -> PeriodFilter {
        PeriodFilter {
            project: self.project.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// Everything fetched for one report, grouped by document category
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FetchedReport {
    pub shipments: Vec<ReportLine>,
    pub shipment_labels: Vec<DocumentLabel>,
    pub commission_sold: Vec<ReportLine>,
    pub commission_returned: Vec<ReportLine>,
    pub commission_labels: Vec<DocumentLabel>,
    pub customer_returns: Vec<ReportLine>,
    pub customer_return_labels: Vec<DocumentLabel>,
}

/// Collects and classifies the documents of a report period.
pub struct Fetcher<S> {
    source: S,
    agents: ProjectAgentMap,
}

impl<S: DocumentSource> Fetcher<S> {
    pub fn new(source: S, agents: ProjectAgentMap) -> Self {
        Self { source, agents }
    }

    /// Build a request for `project`, resolving its commission agent
    pub fn request(
        &self,
        project: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<ReportRequest> {
        if start > end {
            return Err(ReportError::InvalidPeriod {
                start: start.format(MOMENT_FORMAT).to_string(),
                end: end.format(MOMENT_FORMAT).to_string(),
            });
        }

        let agent = self
            .agents
            .agent_for(project)
            .ok_or_else(|| ReportError::UnknownProject(project.to_string()))?;

        Ok(ReportRequest {
            project: project.to_string(),
            start,
            end,
            agent: agent.to_string(),
        })
    }

    pub fn fetch(&self, request: &ReportRequest) -> Result<FetchedReport> {
        let mut report = FetchedReport::default();

        self.fetch_shipments(request, &mut report)?;
        self.fetch_commission_reports(request, &mut report)?;
        self.fetch_customer_returns(request, &mut report)?;

        info!(
            documents = ?report.shipment_labels,
            count = report.shipment_labels.len(),
            positions = report.shipments.len(),
            "shipments fetched"
        );
        info!(
            documents = ?report.commission_labels,
            count = report.commission_labels.len(),
            sold = report.commission_sold.len(),
            returned = report.commission_returned.len(),
            "commission reports fetched"
        );
        info!(
            documents = ?report.customer_return_labels,
            count = report.customer_return_labels.len(),
            positions = report.customer_returns.len(),
            "customer returns fetched"
        );

        Ok(report)
    }

    fn fetch_shipments(&self, request: &ReportRequest, report: &mut FetchedReport) -> Result<()> {
        for document in self.source.shipments(&request.period_filter())? {
            let Some(href) = document.positions_href() else {
                debug!(name = ?document.name, "shipment without positions skipped");
                continue;
            };
            let label = document_label(SHIPMENT_LABEL, document.name.as_deref())?;
            let positions = self.source.positions(href)?;

            report.shipments.extend(classify_all::<Shipment>(&positions, &label)?);
            report.shipment_labels.push(label);
        }
        Ok(())
    }

    fn fetch_commission_reports(
        &self,
        request: &ReportRequest,
        report: &mut FetchedReport,
    ) -> Result<()> {
        for commission in self.source.commission_reports(&request.agent)? {
            if !in_period(&commission, request)? {
                continue;
            }

            let sold = match commission.sold_href() {
                Some(href) => self.source.positions(href)?,
                None => Vec::new(),
            };
            let returned = match commission.returned_href() {
                Some(href) => self.source.positions(href)?,
                None => Vec::new(),
            };

            // Empty on both sides: nothing sold, nothing returned in this report
            if sold.is_empty() && returned.is_empty() {
                debug!(name = ?commission.name, "empty commission report skipped");
                continue;
            }

            let label = document_label(COMMISSION_LABEL, commission.name.as_deref())?;
            report
                .commission_sold
                .extend(classify_all::<CommissionSold>(&sold, &label)?);
            report
                .commission_returned
                .extend(classify_all::<CommissionReturn>(&returned, &label)?);
            report.commission_labels.push(label);
        }
        Ok(())
    }

    fn fetch_customer_returns(
        &self,
        request: &ReportRequest,
        report: &mut FetchedReport,
    ) -> Result<()> {
        for document in self.source.customer_returns(&request.period_filter())? {
            let Some(href) = document.positions_href() else {
                debug!(name = ?document.name, "customer return without positions skipped");
                continue;
            };
            let label = document_label(CUSTOMER_RETURN_LABEL, document.name.as_deref())?;
            let positions = self.source.positions(href)?;

            report
                .customer_returns
                .extend(classify_all::<CustomerReturn>(&positions, &label)?);
            report.customer_return_labels.push(label);
        }
        Ok(())
    }
}

/// Interval overlap between the commission period and the request window.
/// Reports without both period bounds never match.
fn in_period(commission: &CommissionReport, request: &ReportRequest) -> Result<bool> {
    let (Some(start), Some(end)) = (
        commission.commission_period_start.as_deref(),
        commission.commission_period_end.as_deref(),
    ) else {
        debug!(name = ?commission.name, "commission report without period skipped");
        return Ok(false);
    };

    let period_start = parse_moment(start).ok_or_else(|| {
        ReportError::malformed("commission report", format!("bad period start '{start}'"))
    })?;
    let period_end = parse_moment(end).ok_or_else(|| {
        ReportError::malformed("commission report", format!("bad period end '{end}'"))
    })?;

    Ok(overlaps(period_start, period_end, request.start, request.end))
}

pub(crate) fn overlaps(
    period_start: NaiveDateTime,
    period_end: NaiveDateTime,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> bool {
    period_end >= start && period_start <= end
}

/// Parse an API timestamp: "2024-01-31 23:59:59.000", with or without
/// fractional seconds, space or `T` separated
pub(crate) fn parse_moment(value: &str) -> Option<NaiveDateTime> {
    let normalized = value.trim().replacen('T', " ", 1);
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
}

fn document_label(prefix: &str, name: Option<&str>) -> Result<DocumentLabel> {
    let name = name.ok_or_else(|| ReportError::malformed("document", "missing 'name'"))?;
    Ok(format!("{prefix}{name}"))
}

fn classify_all<C: Category>(positions: &[RawPosition], label: &str) -> Result<Vec<ReportLine>> {
    positions
        .iter()
        .map(|raw| {
            classify::<C>(raw).map_err(|e| match e {
                ReportError::MalformedRecord { reason, .. } => ReportError::MalformedRecord {
                    context: label.to_string(),
                    reason,
                },
                other => other,
            })
        })
        .collect()
}
