//! Small helpers for editing OOXML parts in place.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ReportError, Result};

/// Attributes of a start tag as raw (still escaped) key/value pairs
pub fn raw_attributes(e: &BytesStart<'_>, part: &str) -> Result<Vec<(String, String)>> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| ReportError::xml(part, err))?;
            Ok((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            ))
        })
        .collect()
}

/// Render a start (or empty) tag from a name and raw attributes
pub fn render_tag(name: &str, attrs: &[(String, String)], empty: bool) -> String {
    let mut out = String::with_capacity(name.len() + attrs.len() * 16 + 3);
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&value.replace('"', "&quot;"));
        out.push('"');
    }
    out.push_str(if empty { "/>" } else { ">" });
    out
}

/// Set (or add) attributes on a raw attribute list
pub fn set_attributes(attrs: &mut Vec<(String, String)>, updates: &[(&str, String)]) {
    for (key, value) in updates {
        match attrs.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.clone(),
            None => attrs.push((key.to_string(), value.clone())),
        }
    }
}

/// Rewrite the opening tag of a raw element, keeping its children
pub fn with_attributes(element: &str, updates: &[(&str, String)], part: &str) -> Result<String> {
    let mut reader = Reader::from_str(element);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let rest = &element[reader.buffer_position() as usize..];
                return Ok(rewrite(&e, updates, false, part)? + rest);
            }
            Ok(Event::Empty(e)) => {
                let rest = &element[reader.buffer_position() as usize..];
                return Ok(rewrite(&e, updates, true, part)? + rest);
            }
            Ok(Event::Eof) => {
                return Err(ReportError::xml(part, format!("no element in '{element}'")));
            }
            Err(e) => return Err(ReportError::xml(part, e)),
            _ => {}
        }
    }
}

fn rewrite(e: &BytesStart<'_>, updates: &[(&str, String)], empty: bool, part: &str) -> Result<String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = raw_attributes(e, part)?;
    set_attributes(&mut attrs, updates);
    Ok(render_tag(&name, &attrs, empty))
}

/// Value of a raw attribute
pub fn attribute<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Consume events up to the end of the element whose start tag was just
/// read. Returns the offset where its closing tag begins.
pub fn skip_element(reader: &mut Reader<&[u8]>, part: &str) -> Result<usize> {
    let mut depth = 1usize;
    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(before);
                }
            }
            Ok(Event::Eof) => return Err(ReportError::xml(part, "unexpected end of document")),
            Err(e) => return Err(ReportError::xml(part, e)),
            _ => {}
        }
    }
}
