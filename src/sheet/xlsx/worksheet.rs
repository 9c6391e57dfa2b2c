use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::cellref::{cell_name, parse_cell, shift_references};
use super::xml::{attribute, raw_attributes, render_tag, set_attributes, skip_element};
use crate::error::{ReportError, Result};

/// Row attributes that carry formatting and travel with copied styles
const ROW_FORMAT_ATTRS: [&str; 6] = ["s", "customFormat", "ht", "customHeight", "thickTop", "thickBot"];

/// Elements outside sheetData whose references follow inserted rows
const REFERENCE_ATTRS: [(&[u8], &str); 5] = [
    (b"dimension", "ref"),
    (b"mergeCell", "ref"),
    (b"conditionalFormatting", "sqref"),
    (b"dataValidation", "sqref"),
    (b"hyperlink", "ref"),
];

#[derive(Debug, Clone, Default)]
struct Row {
    /// Attributes other than `r`
    attrs: Vec<(String, String)>,
    cells: BTreeMap<u32, Cell>,
}

#[derive(Debug, Clone, Default)]
struct Cell {
    style: Option<u32>,
    kind: Option<String>,
    /// Attributes other than `r`, `s` and `t`
    attrs: Vec<(String, String)>,
    /// Raw children (`<v>`, `<f>`, `<is>`)
    inner: String,
}

/// Parsed worksheet part. Rows are editable, everything around
/// `<sheetData>` is kept verbatim apart from shifted references.
#[derive(Debug, Clone)]
pub struct Worksheet {
    part: String,
    head: String,
    tail: String,
    rows: BTreeMap<u32, Row>,
    insertions: Vec<(u32, u32)>,
}

impl Worksheet {
    pub fn parse(xml: &str, part: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut rows = BTreeMap::new();

        loop {
            let before = reader.buffer_position() as usize;
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"sheetData" => {
                    parse_rows(&mut reader, xml, part, &mut rows)?;
                    let after = reader.buffer_position() as usize;
                    return Ok(Self::from_parts(part, &xml[..before], &xml[after..], rows));
                }
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheetData" => {
                    let after = reader.buffer_position() as usize;
                    return Ok(Self::from_parts(part, &xml[..before], &xml[after..], rows));
                }
                Ok(Event::Eof) => {
                    return Err(ReportError::TemplateMismatch(format!(
                        "{part} has no sheetData"
                    )));
                }
                Err(e) => return Err(ReportError::xml(part, e)),
                _ => {}
            }
        }
    }

    fn from_parts(part: &str, head: &str, tail: &str, rows: BTreeMap<u32, Row>) -> Self {
        Self {
            part: part.to_string(),
            head: head.to_string(),
            tail: tail.to_string(),
            rows,
            insertions: Vec::new(),
        }
    }

    pub fn has_row(&self, row: u32) -> bool {
        self.rows.contains_key(&row)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn style(&self, row: u32, col: u32) -> Option<u32> {
        self.rows.get(&row)?.cells.get(&col)?.style
    }

    pub fn set_style(&mut self, row: u32, col: u32, style: u32) {
        self.cell_mut(row, col).style = Some(style);
    }

    /// Text of an inline string cell or the raw `<v>` of any other cell
    pub fn value(&self, row: u32, col: u32) -> Option<String> {
        let cell = self.rows.get(&row)?.cells.get(&col)?;
        let (open, close) = if cell.kind.as_deref() == Some("inlineStr") {
            ("<t", "</t>")
        } else {
            ("<v", "</v>")
        };
        let start = cell.inner.find(open)?;
        let content = &cell.inner[start..];
        let content = &content[content.find('>')? + 1..];
        let end = content.find(close)?;
        let raw = &content[..end];
        quick_xml::escape::unescape(raw).ok().map(|v| v.into_owned())
    }

    pub fn insert_rows(&mut self, at: u32, count: u32) {
        if count == 0 {
            return;
        }
        let moved = self.rows.split_off(&at);
        for (index, row) in moved {
            self.rows.insert(index + count, row);
        }
        self.insertions.push((at, count));
    }

    pub fn copy_row_style(&mut self, source: u32, target: u32, last_col: u32) -> Result<()> {
        let source_row = self.rows.get(&source).cloned().ok_or_else(|| {
            ReportError::TemplateMismatch(format!("row {source} is missing in {}", self.part))
        })?;

        let carried = |key: &str| key == "spans" || ROW_FORMAT_ATTRS.contains(&key);
        let target_row = self.rows.entry(target).or_default();
        target_row.attrs.retain(|(key, _)| !carried(key.as_str()));
        target_row.attrs.extend(
            source_row
                .attrs
                .iter()
                .filter(|(key, _)| carried(key.as_str()))
                .cloned(),
        );

        for col in 1..=last_col {
            let style = source_row.cells.get(&col).and_then(|c| c.style);
            match target_row.cells.get_mut(&col) {
                Some(cell) => cell.style = style,
                None if style.is_some() => {
                    target_row.cells.insert(
                        col,
                        Cell {
                            style,
                            ..Cell::default()
                        },
                    );
                }
                None => {}
            }
        }
        Ok(())
    }

    pub fn write_text(&mut self, row: u32, col: u32, text: &str) {
        let cell = self.cell_mut(row, col);
        cell.kind = Some("inlineStr".to_string());
        cell.inner = format!("<is><t xml:space=\"preserve\">{}</t></is>", escape(text));
    }

    pub fn write_number(&mut self, row: u32, col: u32, value: Decimal) {
        let cell = self.cell_mut(row, col);
        cell.kind = None;
        cell.inner = format!("<v>{}</v>", value.normalize());
    }

    fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        self.rows
            .entry(row)
            .or_default()
            .cells
            .entry(col)
            .or_default()
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut out = String::with_capacity(self.head.len() + self.tail.len() + self.rows.len() * 512);
        out.push_str(&self.head);
        out.push_str("<sheetData>");
        for (index, row) in &self.rows {
            write_row(&mut out, *index, row);
        }
        out.push_str("</sheetData>");
        out.push_str(&self.tail);

        if self.insertions.is_empty() {
            Ok(out)
        } else {
            self.shift_references(&out)
        }
    }

    /// Apply every recorded insertion to references outside sheetData
    fn shift_references(&self, xml: &str) -> Result<String> {
        let mut reader = Reader::from_str(xml);
        let mut out = String::with_capacity(xml.len());
        let mut in_sheet_data = false;

        loop {
            let before = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|e| ReportError::xml(&self.part, e))?;
            let after = reader.buffer_position() as usize;
            match event {
                Event::Start(e) if e.local_name().as_ref() == b"sheetData" => in_sheet_data = true,
                Event::End(e) if e.local_name().as_ref() == b"sheetData" => in_sheet_data = false,
                Event::Start(e) if !in_sheet_data => {
                    if let Some(tag) = self.shifted_tag(&e, false)? {
                        out.push_str(&tag);
                        continue;
                    }
                }
                Event::Empty(e) if !in_sheet_data => {
                    if let Some(tag) = self.shifted_tag(&e, true)? {
                        out.push_str(&tag);
                        continue;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            out.push_str(&xml[before..after]);
        }

        Ok(out)
    }

    fn shifted_tag(&self, e: &BytesStart<'_>, empty: bool) -> Result<Option<String>> {
        let local = e.local_name();
        let Some((_, key)) = REFERENCE_ATTRS.iter().find(|(name, _)| *name == local.as_ref()) else {
            return Ok(None);
        };

        let mut attrs = raw_attributes(e, &self.part)?;
        let Some(value) = attribute(&attrs, key).map(str::to_string) else {
            return Ok(None);
        };
        let shifted = self
            .insertions
            .iter()
            .fold(value, |value, (at, count)| shift_references(&value, *at, *count));
        set_attributes(&mut attrs, &[(*key, shifted)]);

        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        Ok(Some(render_tag(&name, &attrs, empty)))
    }
}

fn parse_rows(
    reader: &mut Reader<&[u8]>,
    xml: &str,
    part: &str,
    rows: &mut BTreeMap<u32, Row>,
) -> Result<()> {
    let mut last_row = 0;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"row" => {
                let (index, mut row) = row_header(&e, part, last_row)?;
                parse_cells(reader, xml, part, index, &mut row)?;
                rows.insert(index, row);
                last_row = index;
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"row" => {
                let (index, row) = row_header(&e, part, last_row)?;
                rows.insert(index, row);
                last_row = index;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"sheetData" => return Ok(()),
            Ok(Event::Eof) => return Err(ReportError::xml(part, "unterminated sheetData")),
            Err(e) => return Err(ReportError::xml(part, e)),
            _ => {}
        }
    }
}

fn row_header(e: &BytesStart<'_>, part: &str, last_row: u32) -> Result<(u32, Row)> {
    let mut attrs = raw_attributes(e, part)?;
    let index = match attribute(&attrs, "r") {
        Some(r) => r
            .parse()
            .map_err(|_| ReportError::xml(part, format!("bad row number '{r}'")))?,
        None => last_row + 1,
    };
    attrs.retain(|(key, _)| key != "r");
    Ok((
        index,
        Row {
            attrs,
            cells: BTreeMap::new(),
        },
    ))
}

fn parse_cells(
    reader: &mut Reader<&[u8]>,
    xml: &str,
    part: &str,
    row_index: u32,
    row: &mut Row,
) -> Result<()> {
    let mut last_col = 0;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"c" => {
                let (col, mut cell) = cell_header(&e, part, row_index, last_col)?;
                let inner_start = reader.buffer_position() as usize;
                let inner_end = skip_element(reader, part)?;
                cell.inner = xml[inner_start..inner_end].to_string();
                row.cells.insert(col, cell);
                last_col = col;
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"c" => {
                let (col, cell) = cell_header(&e, part, row_index, last_col)?;
                row.cells.insert(col, cell);
                last_col = col;
            }
            Ok(Event::Start(_)) => {
                // row level extensions are dropped
                skip_element(reader, part)?;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"row" => return Ok(()),
            Ok(Event::Eof) => return Err(ReportError::xml(part, "unterminated row")),
            Err(e) => return Err(ReportError::xml(part, e)),
            _ => {}
        }
    }
}

fn cell_header(e: &BytesStart<'_>, part: &str, row_index: u32, last_col: u32) -> Result<(u32, Cell)> {
    let attrs = raw_attributes(e, part)?;
    let col = match attribute(&attrs, "r") {
        Some(r) => match parse_cell(r) {
            Some((col, row)) if row == row_index => col,
            _ => {
                return Err(ReportError::xml(
                    part,
                    format!("cell '{r}' does not belong to row {row_index}"),
                ))
            }
        },
        None => last_col + 1,
    };
    let style = attribute(&attrs, "s")
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| ReportError::xml(part, format!("bad style index '{s}'")))
        })
        .transpose()?;
    let kind = attribute(&attrs, "t").map(str::to_string);
    let attrs = attrs
        .into_iter()
        .filter(|(key, _)| !matches!(key.as_str(), "r" | "s" | "t"))
        .collect();

    Ok((
        col,
        Cell {
            style,
            kind,
            attrs,
            inner: String::new(),
        },
    ))
}

fn write_row(out: &mut String, index: u32, row: &Row) {
    let mut attrs = Vec::with_capacity(row.attrs.len() + 1);
    attrs.push(("r".to_string(), index.to_string()));
    attrs.extend(row.attrs.iter().cloned());

    if row.cells.is_empty() {
        out.push_str(&render_tag("row", &attrs, true));
        return;
    }

    out.push_str(&render_tag("row", &attrs, false));
    for (col, cell) in &row.cells {
        write_cell(out, index, *col, cell);
    }
    out.push_str("</row>");
}

fn write_cell(out: &mut String, row: u32, col: u32, cell: &Cell) {
    let mut attrs = Vec::with_capacity(cell.attrs.len() + 3);
    attrs.push(("r".to_string(), cell_name(row, col)));
    if let Some(style) = cell.style {
        attrs.push(("s".to_string(), style.to_string()));
    }
    if let Some(kind) = &cell.kind {
        attrs.push(("t".to_string(), kind.clone()));
    }
    attrs.extend(cell.attrs.iter().cloned());

    if cell.inner.is_empty() {
        out.push_str(&render_tag("c", &attrs, true));
    } else {
        out.push_str(&render_tag("c", &attrs, false));
        out.push_str(&cell.inner);
        out.push_str("</c>");
    }
}
