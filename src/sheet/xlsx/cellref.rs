//! A1-style cell references.

/// 1 -> "A", 27 -> "AA"
pub fn column_name(mut col: u32) -> String {
    let mut name = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        name.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

pub fn cell_name(row: u32, col: u32) -> String {
    format!("{}{}", column_name(col), row)
}

/// Split "B12" into (column 2, row 12)
pub fn parse_cell(reference: &str) -> Option<(u32, u32)> {
    let parts = split(reference)?;
    Some((column_number(parts.column)?, parts.row?.parse().ok()?))
}

/// Move row numbers `>= at` down by `count` in a reference list such as
/// "A5", "A5:I9", "$B$7" or "A1:B2 D4".
pub fn shift_references(value: &str, at: u32, count: u32) -> String {
    value
        .split(' ')
        .map(|range| {
            range
                .split(':')
                .map(|part| shift_part(part, at, count))
                .collect::<Vec<_>>()
                .join(":")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

struct Parts<'a> {
    col_abs: bool,
    column: &'a str,
    row_abs: bool,
    row: Option<&'a str>,
}

fn split(reference: &str) -> Option<Parts<'_>> {
    let (col_abs, rest) = match reference.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, reference),
    };
    let letters = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
    let (column, rest) = rest.split_at(letters);
    let (row_abs, row) = match rest.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    if !row.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(Parts {
        col_abs,
        column,
        row_abs,
        row: (!row.is_empty()).then_some(row),
    })
}

fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0u32, |acc, b| {
        let digit = (b.to_ascii_uppercase() as u32).checked_sub(b'A' as u32)? + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

fn shift_part(part: &str, at: u32, count: u32) -> String {
    let Some(parts) = split(part) else {
        return part.to_string();
    };
    let Some(row) = parts.row.and_then(|r| r.parse::<u32>().ok()) else {
        return part.to_string();
    };
    let row = if row >= at { row + count } else { row };
    format!(
        "{}{}{}{}",
        if parts.col_abs { "$" } else { "" },
        parts.column,
        if parts.row_abs { "$" } else { "" },
        row
    )
}
