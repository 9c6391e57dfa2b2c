//! In-place editing of an existing xlsx workbook.
//!
//! Only the target worksheet and, when formats were derived, the
//! stylesheet are rewritten. Every other part is copied byte for byte.

mod cellref;
mod package;
mod styles;
mod worksheet;
mod xml;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use package::Package;
use styles::StyleSheet;
use worksheet::Worksheet;

use super::{CellValue, TemplateSheet};
use crate::error::{ReportError, Result};

/// One worksheet of a workbook opened as a fill-in template
#[derive(Debug, Clone)]
pub struct XlsxTemplate {
    package: Package,
    sheet_part: String,
    worksheet: Worksheet,
    styles_part: String,
    styles: StyleSheet,
}

impl XlsxTemplate {
    pub fn open(path: &Path, sheet: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(ReportError::TemplateMismatch(format!(
                "template file {} not found",
                path.display()
            )));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), sheet)
    }

    pub fn from_reader<R: Read + Seek>(reader: R, sheet: &str) -> Result<Self> {
        let package = Package::read(reader)?;

        let sheet_part = package.worksheet_part(sheet)?;
        let worksheet = Worksheet::parse(package.part(&sheet_part)?, &sheet_part)?;

        let styles_part = package.styles_part()?;
        let styles = StyleSheet::parse(package.part(&styles_part)?, &styles_part)?;

        tracing::debug!(sheet, part = %sheet_part, rows = worksheet.row_count(), "template loaded");

        Ok(Self {
            package,
            sheet_part,
            worksheet,
            styles_part,
            styles,
        })
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let sheet_xml = self.worksheet.to_xml()?;
        let styles_xml = self.styles.to_xml();

        let mut overrides: Vec<(&str, &[u8])> = vec![(self.sheet_part.as_str(), sheet_xml.as_bytes())];
        if self.styles.is_modified() {
            overrides.push((self.styles_part.as_str(), styles_xml.as_bytes()));
        }
        self.package.write(writer, &overrides)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Number of rows present in the sheet
    pub fn row_count(&self) -> usize {
        self.worksheet.row_count()
    }

    /// Cell format index of a cell
    pub fn style_id(&self, row: u32, col: u32) -> Option<u32> {
        self.worksheet.style(row, col)
    }

    /// Inline text or raw value of a cell
    pub fn value(&self, row: u32, col: u32) -> Option<String> {
        self.worksheet.value(row, col)
    }

    /// Attribute of the format applied to a cell, e.g. `borderId`
    pub fn format_attribute(&self, row: u32, col: u32, key: &str) -> Option<String> {
        self.styles.format_attribute(self.style_id(row, col)?, key)
    }

    /// Raw `<border>` element applied to a cell
    pub fn border(&self, row: u32, col: u32) -> Option<&str> {
        let id = self.format_attribute(row, col, "borderId")?.parse().ok()?;
        self.styles.border(id)
    }
}

impl TemplateSheet for XlsxTemplate {
    fn has_row(&self, row: u32) -> bool {
        self.worksheet.has_row(row)
    }

    fn insert_rows(&mut self, at: u32, count: u32) {
        self.worksheet.insert_rows(at, count);
    }

    fn copy_row_style(&mut self, source: u32, target: u32, last_col: u32) -> Result<()> {
        self.worksheet.copy_row_style(source, target, last_col)
    }

    fn write(&mut self, row: u32, col: u32, value: CellValue<'_>) -> Result<()> {
        match value {
            CellValue::Text(text) => self.worksheet.write_text(row, col, text),
            CellValue::Number(number) => self.worksheet.write_number(row, col, number),
        }
        Ok(())
    }

    fn clear_borders(&mut self, row: u32, first_col: u32, last_col: u32) -> Result<()> {
        for col in first_col..=last_col {
            let style = self.styles.without_border(self.worksheet.style(row, col))?;
            self.worksheet.set_style(row, col, style);
        }
        Ok(())
    }

    fn highlight(&mut self, row: u32, col: u32) -> Result<()> {
        let style = self.styles.highlighted(self.worksheet.style(row, col))?;
        self.worksheet.set_style(row, col, style);
        Ok(())
    }
}
