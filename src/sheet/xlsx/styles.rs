use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::ops::Range;

use super::xml::{attribute, raw_attributes, render_tag, set_attributes, skip_element, with_attributes};
use crate::error::{ReportError, Result};

const EMPTY_BORDER: &str = "<border><left/><right/><top/><bottom/><diagonal/></border>";
const HIGHLIGHT_FILL: &str = r#"<fill><patternFill patternType="solid"><fgColor rgb="FFFF0000"/><bgColor rgb="FFFF0000"/></patternFill></fill>"#;
const HIGHLIGHT_FONT: &str = r#"<font><b/><sz val="8"/><name val="Calibri"/><family val="2"/></font>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Derivation {
    NoBorder,
    Highlight,
}

/// A `<fonts>`, `<fills>`, `<borders>` or `<cellXfs>` list
#[derive(Debug, Clone)]
struct Collection {
    name: String,
    attrs: Vec<(String, String)>,
    span: Range<usize>,
    items: Vec<String>,
    added: Vec<String>,
}

impl Collection {
    fn len(&self) -> u32 {
        (self.items.len() + self.added.len()) as u32
    }

    fn get(&self, index: u32) -> Option<&str> {
        let index = index as usize;
        self.items
            .get(index)
            .or_else(|| self.added.get(index.checked_sub(self.items.len())?))
            .map(String::as_str)
    }

    fn push(&mut self, item: String) -> u32 {
        self.added.push(item);
        self.len() - 1
    }

    fn render(&self) -> String {
        let mut attrs = self.attrs.clone();
        set_attributes(&mut attrs, &[("count", self.len().to_string())]);
        let mut out = render_tag(&self.name, &attrs, false);
        for item in self.items.iter().chain(&self.added) {
            out.push_str(item);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
        out
    }
}

/// The workbook stylesheet. Cell formats can be derived from existing ones;
/// the part is rewritten only when something was added.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    part: String,
    xml: String,
    fonts: Collection,
    fills: Collection,
    borders: Collection,
    cell_xfs: Collection,
    derived: HashMap<(u32, Derivation), u32>,
    empty_border: Option<u32>,
    highlight_fill: Option<u32>,
    highlight_font: Option<u32>,
}

impl StyleSheet {
    pub fn parse(xml: &str, part: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut found: HashMap<&'static str, Collection> = HashMap::new();
        let mut depth = 0usize;

        loop {
            let before = reader.buffer_position() as usize;
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    match collection_name(&e).filter(|_| depth == 1) {
                        Some(name) if !found.contains_key(name) => {
                            let collection = read_collection(&mut reader, xml, part, &e, before)?;
                            found.insert(name, collection);
                        }
                        _ => depth += 1,
                    }
                }
                Ok(Event::Empty(e)) => {
                    if let Some(name) = collection_name(&e).filter(|_| depth == 1) {
                        let after = reader.buffer_position() as usize;
                        found.entry(name).or_insert(Collection {
                            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                            attrs: raw_attributes(&e, part)?,
                            span: before..after,
                            items: Vec::new(),
                            added: Vec::new(),
                        });
                    }
                }
                Ok(Event::End(_)) => depth = depth.saturating_sub(1),
                Ok(Event::Eof) => break,
                Err(e) => return Err(ReportError::xml(part, e)),
                _ => {}
            }
        }

        let mut take = |name: &str| {
            found.remove(name).ok_or_else(|| {
                ReportError::TemplateMismatch(format!("{part} has no <{name}> list"))
            })
        };

        Ok(Self {
            part: part.to_string(),
            xml: xml.to_string(),
            fonts: take("fonts")?,
            fills: take("fills")?,
            borders: take("borders")?,
            cell_xfs: take("cellXfs")?,
            derived: HashMap::new(),
            empty_border: None,
            highlight_fill: None,
            highlight_font: None,
        })
    }

    pub fn is_modified(&self) -> bool {
        !self.fonts.added.is_empty()
            || !self.fills.added.is_empty()
            || !self.borders.added.is_empty()
            || !self.cell_xfs.added.is_empty()
    }

    /// Number of cell formats, including derived ones
    pub fn format_count(&self) -> u32 {
        self.cell_xfs.len()
    }

    /// Raw attribute of a cell format, e.g. `borderId`
    pub fn format_attribute(&self, style: u32, key: &str) -> Option<String> {
        let xf = self.cell_xfs.get(style)?;
        let mut reader = Reader::from_str(xf);
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    let attrs = raw_attributes(&e, &self.part).ok()?;
                    return attribute(&attrs, key).map(str::to_string);
                }
                Ok(Event::Eof) | Err(_) => return None,
                _ => {}
            }
        }
    }

    /// Raw `<border>` element with the given index
    pub fn border(&self, index: u32) -> Option<&str> {
        self.borders.get(index)
    }

    /// `style` without any border
    pub fn without_border(&mut self, style: Option<u32>) -> Result<u32> {
        self.derive(style.unwrap_or(0), Derivation::NoBorder)
    }

    /// `style` with a solid red fill and a bold size 8 font
    pub fn highlighted(&mut self, style: Option<u32>) -> Result<u32> {
        self.derive(style.unwrap_or(0), Derivation::Highlight)
    }

    fn derive(&mut self, base: u32, derivation: Derivation) -> Result<u32> {
        if let Some(index) = self.derived.get(&(base, derivation)) {
            return Ok(*index);
        }

        let xf = self
            .cell_xfs
            .get(base)
            .ok_or_else(|| ReportError::TemplateMismatch(format!("cell format {base} is not defined")))?
            .to_string();

        let updates = match derivation {
            Derivation::NoBorder => {
                let border = *self
                    .empty_border
                    .get_or_insert_with(|| self.borders.push(EMPTY_BORDER.to_string()));
                vec![("borderId", border.to_string()), ("applyBorder", "1".to_string())]
            }
            Derivation::Highlight => {
                let fill = *self
                    .highlight_fill
                    .get_or_insert_with(|| self.fills.push(HIGHLIGHT_FILL.to_string()));
                let font = *self
                    .highlight_font
                    .get_or_insert_with(|| self.fonts.push(HIGHLIGHT_FONT.to_string()));
                vec![
                    ("fontId", font.to_string()),
                    ("fillId", fill.to_string()),
                    ("applyFont", "1".to_string()),
                    ("applyFill", "1".to_string()),
                ]
            }
        };

        let index = self.cell_xfs.push(with_attributes(&xf, &updates, &self.part)?);
        self.derived.insert((base, derivation), index);
        Ok(index)
    }

    pub fn to_xml(&self) -> String {
        if !self.is_modified() {
            return self.xml.clone();
        }

        let mut collections = [&self.fonts, &self.fills, &self.borders, &self.cell_xfs];
        collections.sort_by_key(|c| c.span.start);

        let mut out = String::with_capacity(self.xml.len() + 1024);
        let mut cursor = 0;
        for collection in collections {
            out.push_str(&self.xml[cursor..collection.span.start]);
            out.push_str(&collection.render());
            cursor = collection.span.end;
        }
        out.push_str(&self.xml[cursor..]);
        out
    }
}

fn collection_name(e: &BytesStart<'_>) -> Option<&'static str> {
    match e.local_name().as_ref() {
        b"fonts" => Some("fonts"),
        b"fills" => Some("fills"),
        b"borders" => Some("borders"),
        b"cellXfs" => Some("cellXfs"),
        _ => None,
    }
}

fn read_collection(
    reader: &mut Reader<&[u8]>,
    xml: &str,
    part: &str,
    start: &BytesStart<'_>,
    start_offset: usize,
) -> Result<Collection> {
    let mut items = Vec::new();
    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                skip_element(reader, part)?;
                items.push(xml[before..reader.buffer_position() as usize].to_string());
            }
            Ok(Event::Empty(_)) => {
                items.push(xml[before..reader.buffer_position() as usize].to_string());
            }
            Ok(Event::End(_)) => {
                return Ok(Collection {
                    name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                    attrs: raw_attributes(start, part)?,
                    span: start_offset..reader.buffer_position() as usize,
                    items,
                    added: Vec::new(),
                });
            }
            Ok(Event::Eof) => return Err(ReportError::xml(part, "unterminated style list")),
            Err(e) => return Err(ReportError::xml(part, e)),
            _ => {}
        }
    }
}
