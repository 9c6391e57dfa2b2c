mod project;
mod settings;

pub use project::{ProjectAgentMap, ProjectEntry};
pub use settings::{ApiSettings, Config, OutputSettings, TemplateSettings};

use crate::error::{ReportError, Result};
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.salesreport/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "salesreport") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.salesreport/
    let home = dirs_home().ok_or_else(|| {
        ReportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".salesreport"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve a configured path; relative paths are taken from the config directory
pub fn resolve_path(path: &str, cfg_dir: &Path) -> PathBuf {
    let expanded = expand_path(path);
    if expanded.is_absolute() {
        expanded
    } else {
        cfg_dir.join(expanded)
    }
}

/// Load the main config.toml
pub fn load_config(cfg_dir: &Path) -> Result<Config> {
    let path = cfg_dir.join("config.toml");
    if !path.exists() {
        return Err(ReportError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| ReportError::ConfigParse { path, source: e })
}

/// Load projects.toml keyed by project identifier
pub fn load_projects(cfg_dir: &Path) -> Result<BTreeMap<String, ProjectEntry>> {
    let path = cfg_dir.join("projects.toml");
    if !path.exists() {
        return Err(ReportError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| ReportError::ConfigParse { path, source: e })
}

/// Read the bearer token from the environment variable named in [api]
pub fn api_token(settings: &ApiSettings) -> Result<String> {
    match std::env::var(&settings.token_env) {
        Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(ReportError::MissingToken(settings.token_env.clone())),
    }
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
base_url = "https://api.moysklad.ru/api/remap/1.2"
token_env = "MOYSKLAD_TOKEN"   # the token itself is read from this variable
timeout_secs = 30

[template]
path = "template.xlsx"         # relative to this directory
sheet = "Товары WB на реализации"
paired_row = 5                 # shipments and returns, side by side
shipment_labels_row = 8
return_labels_row = 10

[output]
dir = "output"
"#;

/// Template content for projects.toml
pub const PROJECTS_TEMPLATE: &str = r#"# Define your projects here. The table name (e.g., [ozon]) is used
# as the project identifier in the generate command.
#
# Example:
#   salesreport generate --project ozon --from 2024-01-01 --to 2024-01-31

[ozon]
name = "OZON"
project = "https://api.moysklad.ru/api/remap/1.2/entity/project/9eecc057-dc57-11ee-0a80-1406000914a9"
agent = "https://api.moysklad.ru/api/remap/1.2/entity/counterparty/9e082119-cecc-11f0-0a80-177e00540242"

[wb]
name = "WB"
project = "https://api.moysklad.ru/api/remap/1.2/entity/project/b0fc98ef-ec4c-11ee-0a80-17510017c31f"
agent = "https://api.moysklad.ru/api/remap/1.2/entity/counterparty/fa059598-cecc-11f0-0a80-11e900544c25"

[yandex]
name = "YANDEX"
project = "https://api.moysklad.ru/api/remap/1.2/entity/project/a2fce344-bee3-11f0-0a80-0311000b7b12"
agent = "https://api.moysklad.ru/api/remap/1.2/entity/counterparty/c15d626b-1189-11f1-0a80-0338004494a9"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_template_parses_with_layout_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        let layout = config.template.layout().unwrap();
        assert_eq!(layout, crate::sheet::TemplateLayout::default());
        assert_eq!(config.api.token_env, "MOYSKLAD_TOKEN");
    }

    #[test]
    fn empty_config_falls_back_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.output.dir, "output");
        assert_eq!(config.template.paired_row, 5);
    }

    #[test]
    fn template_anchors_out_of_order_are_rejected() {
        let config: Config = toml::from_str(
            r#"
[template]
paired_row = 5
shipment_labels_row = 4
"#,
        )
        .unwrap();
        let err = config.template.layout().unwrap_err();
        assert!(matches!(err, ReportError::TemplateMismatch(_)), "{err}");

        let config: Config = toml::from_str("[template]\nreturn_labels_row = 0\n").unwrap();
        assert!(config.template.layout().is_err());
    }

    #[test]
    fn projects_template_builds_agent_map() {
        let projects: BTreeMap<String, ProjectEntry> = toml::from_str(PROJECTS_TEMPLATE).unwrap();
        assert_eq!(projects.len(), 3);
        let map: ProjectAgentMap = projects.values().collect();
        let wb = &projects["wb"];
        assert_eq!(map.agent_for(&wb.project), Some(wb.agent.as_str()));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = Path::new("/etc/salesreport");
        assert_eq!(
            resolve_path("template.xlsx", dir),
            PathBuf::from("/etc/salesreport/template.xlsx")
        );
        assert_eq!(resolve_path("/tmp/out", dir), PathBuf::from("/tmp/out"));
    }
}
