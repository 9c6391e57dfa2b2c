use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ReportError, Result};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const STYLES_REL_TYPE: &str = "/styles";

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
}

/// The parts of an xlsx archive, in archive order.
#[derive(Debug, Clone)]
pub struct Package {
    entries: Vec<Entry>,
}

impl Package {
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(Entry {
                name: file.name().to_string(),
                data,
            });
        }

        Ok(Self { entries })
    }

    pub fn part(&self, name: &str) -> Result<&str> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ReportError::TemplateMismatch(format!("package part {name} is missing")))?;
        std::str::from_utf8(&entry.data).map_err(|e| ReportError::xml(name, e))
    }

    /// Path of the worksheet part behind the sheet called `sheet`
    pub fn worksheet_part(&self, sheet: &str) -> Result<String> {
        let rel_id = self.sheet_relationship(sheet)?.ok_or_else(|| {
            ReportError::TemplateMismatch(format!("workbook has no sheet named '{sheet}'"))
        })?;
        let target = self
            .relationships()?
            .into_iter()
            .find(|rel| rel.id == rel_id)
            .map(|rel| rel.target)
            .ok_or_else(|| {
                ReportError::TemplateMismatch(format!("sheet '{sheet}' has no relationship {rel_id}"))
            })?;
        Ok(resolve_target(&target))
    }

    /// Path of the stylesheet part
    pub fn styles_part(&self) -> Result<String> {
        let target = self
            .relationships()?
            .into_iter()
            .find(|rel| rel.kind.ends_with(STYLES_REL_TYPE))
            .map(|rel| rel.target)
            .ok_or_else(|| ReportError::TemplateMismatch("workbook has no stylesheet".to_string()))?;
        Ok(resolve_target(&target))
    }

    fn sheet_relationship(&self, sheet: &str) -> Result<Option<String>> {
        let xml = self.part(WORKBOOK_PART)?;
        let mut reader = Reader::from_str(xml);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                    let mut name = None;
                    let mut id = None;
                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map_err(|err| ReportError::xml(WORKBOOK_PART, err))?;
                        match attr.key.local_name().as_ref() {
                            b"name" => name = Some(value.into_owned()),
                            b"id" => id = Some(value.into_owned()),
                            _ => {}
                        }
                    }
                    if name.as_deref() == Some(sheet) {
                        return Ok(id);
                    }
                }
                Ok(Event::Eof) => return Ok(None),
                Err(e) => return Err(ReportError::xml(WORKBOOK_PART, e)),
                _ => {}
            }
        }
    }

    fn relationships(&self) -> Result<Vec<Relationship>> {
        let xml = self.part(WORKBOOK_RELS_PART)?;
        let mut reader = Reader::from_str(xml);
        let mut rels = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e))
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut rel = Relationship::default();
                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map_err(|err| ReportError::xml(WORKBOOK_RELS_PART, err))?
                            .into_owned();
                        match attr.key.local_name().as_ref() {
                            b"Id" => rel.id = value,
                            b"Target" => rel.target = value,
                            b"Type" => rel.kind = value,
                            _ => {}
                        }
                    }
                    rels.push(rel);
                }
                Ok(Event::Eof) => return Ok(rels),
                Err(e) => return Err(ReportError::xml(WORKBOOK_RELS_PART, e)),
                _ => {}
            }
        }
    }

    /// Write the archive, replacing the parts named in `overrides`.
    /// Entry timestamps are fixed so equal content gives equal bytes.
    pub fn write<W: Write + Seek>(&self, writer: W, overrides: &[(&str, &[u8])]) -> Result<()> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut zip = ZipWriter::new(writer);
        for entry in &self.entries {
            let data = overrides
                .iter()
                .find(|(name, _)| *name == entry.name)
                .map(|(_, data)| *data)
                .unwrap_or(entry.data.as_slice());
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(data)?;
        }
        zip.finish()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Relationship {
    id: String,
    target: String,
    kind: String,
}

/// Workbook relationship targets are relative to `xl/` unless absolute
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_targets() {
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("./styles.xml"), "xl/styles.xml");
    }
}
