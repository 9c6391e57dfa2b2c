//! In-memory sheet used to exercise the layout engine.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{CellValue, TemplateSheet};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub name: String,
    pub border: bool,
    pub highlighted: bool,
}

impl Style {
    pub fn bordered(name: &str) -> Self {
        Self {
            name: name.to_string(),
            border: true,
            highlighted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Stored {
    Text(String),
    Number(Decimal),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Cell {
    style: Style,
    value: Option<Stored>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySheet {
    rows: BTreeMap<u32, BTreeMap<u32, Cell>>,
    width: u32,
}

impl MemorySheet {
    pub fn with_rows(rows: u32, width: u32) -> Self {
        let mut sheet = MemorySheet {
            rows: BTreeMap::new(),
            width,
        };
        for row in 1..=rows {
            sheet.set_row_style(row, Style::default());
        }
        sheet
    }

    pub fn set_row_style(&mut self, row: u32, style: Style) {
        let cells = self.rows.entry(row).or_default();
        for col in 1..=self.width {
            cells.entry(col).or_default().style = style.clone();
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn style(&self, row: u32, col: u32) -> Style {
        self.cell(row, col).map(|c| c.style.clone()).unwrap_or_default()
    }

    pub fn text(&self, row: u32, col: u32) -> Option<String> {
        match self.cell(row, col)?.value.as_ref()? {
            Stored::Text(text) => Some(text.clone()),
            Stored::Number(_) => None,
        }
    }

    pub fn number(&self, row: u32, col: u32) -> Option<Decimal> {
        match self.cell(row, col)?.value.as_ref()? {
            Stored::Number(value) => Some(*value),
            Stored::Text(_) => None,
        }
    }

    fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.rows.get(&row)?.get(&col)
    }

    fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        self.rows.entry(row).or_default().entry(col).or_default()
    }
}

impl TemplateSheet for MemorySheet {
    fn has_row(&self, row: u32) -> bool {
        self.rows.contains_key(&row)
    }

    fn insert_rows(&mut self, at: u32, count: u32) {
        let moved = self.rows.split_off(&at);
        for (row, cells) in moved {
            self.rows.insert(row + count, cells);
        }
    }

    fn copy_row_style(&mut self, source: u32, target: u32, last_col: u32) -> Result<()> {
        for col in 1..=last_col {
            let style = self.style(source, col);
            self.cell_mut(target, col).style = style;
        }
        Ok(())
    }

    fn write(&mut self, row: u32, col: u32, value: CellValue<'_>) -> Result<()> {
        self.cell_mut(row, col).value = Some(match value {
            CellValue::Text(text) => Stored::Text(text.to_string()),
            CellValue::Number(number) => Stored::Number(number),
        });
        Ok(())
    }

    fn clear_borders(&mut self, row: u32, first_col: u32, last_col: u32) -> Result<()> {
        for col in first_col..=last_col {
            self.cell_mut(row, col).style.border = false;
        }
        Ok(())
    }

    fn highlight(&mut self, row: u32, col: u32) -> Result<()> {
        self.cell_mut(row, col).style.highlighted = true;
        Ok(())
    }
}
