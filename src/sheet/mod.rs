//! Template filling.
//!
//! [`fill_report`] expands and fills the report sections of any
//! [`TemplateSheet`]; [`xlsx::XlsxTemplate`] is the on-disk implementation.

mod layout;
#[cfg(test)]
mod memory;
pub mod xlsx;

pub use layout::{
    fill_report, LayoutSummary, ReportHeader, ReportSections, TemplateLayout, FLAG_MARK,
};

use rust_decimal::Decimal;

use crate::error::Result;

/// Value written into a template cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Text(&'a str),
    Number(Decimal),
}

/// A worksheet that can be expanded and filled in place.
///
/// Rows and columns are 1-based.
pub trait TemplateSheet {
    /// Whether the template defines `row`
    fn has_row(&self, row: u32) -> bool;

    /// Move every row `>= at` down by `count`, leaving a gap of empty rows
    fn insert_rows(&mut self, at: u32, count: u32);

    /// Give columns `1..=last_col` of `target` the formatting of `source`
    fn copy_row_style(&mut self, source: u32, target: u32, last_col: u32) -> Result<()>;

    fn write(&mut self, row: u32, col: u32, value: CellValue<'_>) -> Result<()>;

    /// Remove borders from columns `first_col..=last_col` of `row`
    fn clear_borders(&mut self, row: u32, first_col: u32, last_col: u32) -> Result<()>;

    /// Solid red fill with a bold small font
    fn highlight(&mut self, row: u32, col: u32) -> Result<()>;
}
