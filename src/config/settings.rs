use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sheet::TemplateLayout;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub template: TemplateSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TemplateSettings {
    #[serde(default = "default_template_path")]
    pub path: String,
    #[serde(default = "default_sheet")]
    pub sheet: String,
    #[serde(default = "default_paired_row")]
    pub paired_row: u32,
    #[serde(default = "default_shipment_labels_row")]
    pub shipment_labels_row: u32,
    #[serde(default = "default_return_labels_row")]
    pub return_labels_row: u32,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            path: default_template_path(),
            sheet: default_sheet(),
            paired_row: default_paired_row(),
            shipment_labels_row: default_shipment_labels_row(),
            return_labels_row: default_return_labels_row(),
        }
    }
}

impl TemplateSettings {
    /// Section layout described by this table, with its anchors checked
    pub fn layout(&self) -> Result<TemplateLayout> {
        let layout = TemplateLayout {
            sheet: self.sheet.clone(),
            paired_row: self.paired_row,
            shipment_labels_row: self.shipment_labels_row,
            return_labels_row: self.return_labels_row,
        };
        layout.validate()?;
        Ok(layout)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.moysklad.ru/api/remap/1.2".to_string()
}

fn default_token_env() -> String {
    "MOYSKLAD_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_template_path() -> String {
    "template.xlsx".to_string()
}

fn default_sheet() -> String {
    TemplateLayout::default().sheet
}

fn default_paired_row() -> u32 {
    TemplateLayout::default().paired_row
}

fn default_shipment_labels_row() -> u32 {
    TemplateLayout::default().shipment_labels_row
}

fn default_return_labels_row() -> u32 {
    TemplateLayout::default().return_labels_row
}

fn default_output_dir() -> String {
    "output".to_string()
}
