use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

use super::model::{CommissionReport, Document, Page, RawPosition, RemoteProject};
use super::{DocumentSource, PeriodFilter};
use crate::config::ApiSettings;
use crate::error::{ReportError, Result};

/// Page size requested from list endpoints (the API caps expanded lists at 100)
const PAGE_LIMIT: &str = "100";

/// Blocking client for the MoySklad JSON API.
pub struct MoyskladClient {
    agent: Agent,
    base_url: String,
    token: String,
}

impl MoyskladClient {
    pub fn new(settings: &ApiSettings, token: String) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn entity_url(&self, entity: &str) -> String {
        format!("{}/entity/{}", self.base_url, entity)
    }

    /// All projects visible to the token
    pub fn projects(&self) -> Result<Vec<RemoteProject>> {
        self.get_all(&self.entity_url("project"), &[])
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!(url, ?query, "GET");

        let mut request = self
            .agent
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token));
        for (key, value) in query {
            request = request.query(*key, *value);
        }

        let mut response = request.call().map_err(|e| match e {
            ureq::Error::StatusCode(code) => ReportError::api(url, format!("HTTP status {code}")),
            other => ReportError::api(url, other),
        })?;

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ReportError::api(url, e))?;

        parse_body(url, &body)
    }

    /// Fetch every page of a list endpoint by following `meta.nextHref`
    fn get_all<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<T>> {
        let mut query = query.to_vec();
        query.push(("limit", PAGE_LIMIT));

        let first = self.get_json(url, &query)?;
        collect_pages(url, first, |next| self.get_json(next, &[]))
    }
}

fn parse_body<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ReportError::api(url, format!("malformed JSON: {e}")))
}

/// Join the rows of `first` and every page reached through `meta.nextHref`
fn collect_pages<T, F>(url: &str, first: Page<T>, mut next_page: F) -> Result<Vec<T>>
where
    F: FnMut(&str) -> Result<Page<T>>,
{
    let mut rows = Vec::new();
    let mut page = first;
    let mut page_url = url.to_string();

    loop {
        let page_rows = page
            .rows
            .ok_or_else(|| ReportError::api(&page_url, "response has no 'rows'"))?;
        rows.extend(page_rows);

        match page.meta.and_then(|meta| meta.next_href) {
            Some(next) => {
                page = next_page(&next)?;
                page_url = next;
            }
            None => break,
        }
    }

    debug!(url, rows = rows.len(), "pages collected");
    Ok(rows)
}

impl DocumentSource for MoyskladClient {
    fn shipments(&self, filter: &PeriodFilter) -> Result<Vec<Document>> {
        let expression = filter.expression();
        self.get_all(
            &self.entity_url("demand"),
            &[("filter", expression.as_str()), ("order", "name,desc")],
        )
    }

    fn customer_returns(&self, filter: &PeriodFilter) -> Result<Vec<Document>> {
        let expression = filter.expression();
        self.get_all(
            &self.entity_url("salesreturn"),
            &[("filter", expression.as_str()), ("order", "name,desc")],
        )
    }

    fn commission_reports(&self, agent: &str) -> Result<Vec<CommissionReport>> {
        let expression = format!("agent={agent}");
        self.get_all(
            &self.entity_url("commissionreportin"),
            &[("filter", expression.as_str()), ("order", "name,desc")],
        )
    }

    fn positions(&self, href: &str) -> Result<Vec<RawPosition>> {
        self.get_all(href, &[("expand", "assortment")])
    }
}
