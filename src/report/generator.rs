use chrono::{Local, NaiveDateTime};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;
use uuid::Uuid;

use super::fetch::Fetcher;
use crate::api::{DocumentSource, MoyskladClient, MOMENT_FORMAT};
use crate::config::{
    api_token, load_config, load_projects, resolve_path, Config, ProjectAgentMap, ProjectEntry,
};
use crate::error::{ReportError, Result};
use crate::sheet::xlsx::XlsxTemplate;
use crate::sheet::{fill_report, LayoutSummary, ReportHeader, ReportSections, TemplateLayout};

/// A report written to the output directory
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub file_name: String,
    pub path: PathBuf,
    pub summary: LayoutSummary,
}

/// Generate a report for the project `project_key` of projects.toml,
/// fetching documents from the configured API.
pub fn generate_report(
    cfg_dir: &Path,
    project_key: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<GeneratedReport> {
    let config = load_config(cfg_dir)?;
    let projects = load_projects(cfg_dir)?;

    // Unknown projects fail before the token is needed
    project_entry(&projects, project_key)?;

    let token = api_token(&config.api)?;
    let client = MoyskladClient::new(&config.api, token);

    generate_with_source(client, &config, &projects, cfg_dir, project_key, start, end)
}

/// Generate a report from any document source
pub fn generate_with_source<S: DocumentSource>(
    source: S,
    config: &Config,
    projects: &BTreeMap<String, ProjectEntry>,
    cfg_dir: &Path,
    project_key: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<GeneratedReport> {
    let entry = project_entry(projects, project_key)?;
    let layout = config.template.layout()?;

    // Open the template first so a broken one fails before any API call
    let template_path = resolve_path(&config.template.path, cfg_dir);
    let template = XlsxTemplate::open(&template_path, &layout.sheet)?;

    let agents: ProjectAgentMap = projects.values().collect();
    let fetcher = Fetcher::new(source, agents);
    let request = fetcher.request(&entry.project, start, end)?;
    info!(project = %entry.name, %start, %end, "generating report");

    let fetched = fetcher.fetch(&request)?;

    let header = ReportHeader {
        project: entry.name.clone(),
        period: format!(
            "{} - {}",
            start.format(MOMENT_FORMAT),
            end.format(MOMENT_FORMAT)
        ),
    };

    let output_dir = resolve_path(&config.output.dir, cfg_dir);
    render_report(template, &layout, &header, &fetched.into(), &output_dir)
}

/// Fill `template` and persist it under a fresh name in `output_dir`.
///
/// The workbook is written to a temporary file in the same directory and
/// only renamed into place once complete.
pub fn render_report(
    mut template: XlsxTemplate,
    layout: &TemplateLayout,
    header: &ReportHeader,
    sections: &ReportSections,
    output_dir: &Path,
) -> Result<GeneratedReport> {
    let summary = fill_report(&mut template, layout, header, sections)?;

    fs::create_dir_all(output_dir)?;
    let mut temp = NamedTempFile::new_in(output_dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        template.write_to(&mut writer)?;
        writer.flush()?;
    }

    let file_name = report_file_name();
    let path = output_dir.join(&file_name);
    temp.persist_noclobber(&path)
        .map_err(|e| ReportError::Io(e.error))?;

    info!(
        file = %file_name,
        inserted = summary.total_inserted(),
        "report written"
    );

    Ok(GeneratedReport {
        file_name,
        path,
        summary,
    })
}

fn project_entry<'a>(
    projects: &'a BTreeMap<String, ProjectEntry>,
    key: &str,
) -> Result<&'a ProjectEntry> {
    projects
        .get(key)
        .ok_or_else(|| ReportError::UnknownProject(key.to_string()))
}

/// report_20240131235959_1a2b3c4d.xlsx
fn report_file_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!(
        "report_{}_{}.xlsx",
        Local::now().format("%Y%m%d%H%M%S"),
        &id[..8]
    )
}
