use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use salesreport::api::MoyskladClient;
use salesreport::config::{
    api_token, config_dir, load_config, load_projects, resolve_path, CONFIG_TEMPLATE,
    PROJECTS_TEMPLATE,
};
use salesreport::report::{deliver, generate_report, report_path};
use salesreport::{ReportError, Result};

#[derive(Parser)]
#[command(name = "salesreport")]
#[command(version, about = "Sales and returns reports from MoySklad documents", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.salesreport or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// List configured projects
    Projects {
        /// List projects known to the API instead
        #[arg(long)]
        remote: bool,
    },

    /// Generate a report for a project and period
    Generate {
        /// Project identifier from projects.toml
        #[arg(short, long)]
        project: String,

        /// Period start (YYYY-MM-DD or YYYY-MM-DD HH:MM[:SS])
        #[arg(long)]
        from: String,

        /// Period end (YYYY-MM-DD or YYYY-MM-DD HH:MM[:SS])
        #[arg(long)]
        to: String,
    },

    /// Deliver a generated report and remove it from the output directory
    Send {
        /// File name printed by 'generate'
        file: String,

        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        tracing::error!(error = ?e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("salesreport=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("salesreport=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Projects { remote } => cmd_projects(&cfg_dir, remote),
        Commands::Generate { project, from, to } => cmd_generate(&cfg_dir, &project, &from, &to),
        Commands::Send { file, output } => cmd_send(&cfg_dir, &file, output.as_deref()),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(ReportError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("output"))?;

    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("projects.toml"), PROJECTS_TEMPLATE)?;

    println!("Initialized salesreport config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Place the report template at:  {}/template.xlsx",
        cfg_dir.display()
    );
    println!(
        "  2. Review your projects:          $EDITOR {}/projects.toml",
        cfg_dir.display()
    );
    println!("  3. Export the API token:          export MOYSKLAD_TOKEN=...");
    println!();
    println!("Then generate your first report:");
    println!("  salesreport generate --project <project-id> --from 2024-01-01 --to 2024-01-31");

    Ok(())
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "AGENT")]
    agent: String,
}

#[derive(Tabled)]
struct RemoteProjectRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "HREF")]
    href: String,
}

/// List projects from projects.toml or from the API
fn cmd_projects(cfg_dir: &Path, remote: bool) -> Result<()> {
    require_config(cfg_dir)?;

    if remote {
        let config = load_config(cfg_dir)?;
        let client = MoyskladClient::new(&config.api, api_token(&config.api)?);
        let rows: Vec<RemoteProjectRow> = client
            .projects()?
            .into_iter()
            .map(|project| RemoteProjectRow {
                name: project.name.unwrap_or_default(),
                href: project.meta.href.unwrap_or_default(),
            })
            .collect();

        if rows.is_empty() {
            println!("No projects visible to this token.");
            return Ok(());
        }
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
        return Ok(());
    }

    let projects = load_projects(cfg_dir)?;
    if projects.is_empty() {
        println!("No projects configured.");
        println!("Add projects to: {}/projects.toml", cfg_dir.display());
        return Ok(());
    }

    let rows: Vec<ProjectRow> = projects
        .iter()
        .map(|(id, entry)| ProjectRow {
            id: id.clone(),
            name: entry.name.clone(),
            agent: entry.agent.clone(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// Generate a report
fn cmd_generate(cfg_dir: &Path, project: &str, from: &str, to: &str) -> Result<()> {
    require_config(cfg_dir)?;

    let start = parse_datetime(from, NaiveTime::MIN)?;
    let end = parse_datetime(to, end_of_day())?;

    let report = generate_report(cfg_dir, project, start, end)?;

    println!("Generated report: {}", report.file_name);
    println!("  Path: {}", report.path.display());
    println!("  Rows inserted: {}", report.summary.total_inserted());

    Ok(())
}

/// Copy a generated report to a file or stdout, then remove it
fn cmd_send(cfg_dir: &Path, file: &str, output: Option<&Path>) -> Result<()> {
    require_config(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let output_dir = resolve_path(&config.output.dir, cfg_dir);

    // Checked up front so a missing report never creates an empty target
    if !report_path(&output_dir, file)?.is_file() {
        return missing_report(file);
    }

    let result = match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            deliver(&output_dir, file, &mut writer)
        }
        None => deliver(&output_dir, file, &mut io::stdout().lock()),
    };

    match result {
        Ok(bytes) => {
            if let Some(path) = output {
                println!("Sent {file} to {} ({bytes} bytes)", path.display());
            }
            Ok(())
        }
        Err(ReportError::FileNotFound(_)) => missing_report(file),
        Err(e) => Err(e),
    }
}

fn missing_report(file: &str) -> Result<()> {
    eprintln!("Report '{file}' not found. It may have been sent already.");
    Ok(())
}

fn require_config(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        Ok(())
    } else {
        Err(ReportError::ConfigNotFound(cfg_dir.to_path_buf()))
    }
}

/// Last millisecond of a day; API moments carry milliseconds
fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

/// Parse "YYYY-MM-DD HH:MM[:SS]", or a bare date completed with `day_time`
fn parse_datetime(value: &str, day_time: NaiveTime) -> Result<NaiveDateTime> {
    let value = value.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(datetime);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(day_time))
        .map_err(|_| ReportError::InvalidDate(value.to_string()))
}
