#![allow(dead_code)]

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, FormatBorder, Workbook};
use std::path::Path;

use salesreport::ReportLine;

pub const SHEET: &str = "Товары WB на реализации";

/// Report template shaped like the production one: a title row, column
/// headings, the paired section at row 5, document lists at rows 8 and 10
/// and a closing row at 12. Anchor rows carry thin borders.
pub fn build_template(path: &Path, sheet: &str) {
    write_template(path, sheet, true);
}

/// Same template without the return document anchor (row 10)
pub fn build_template_without_return_labels(path: &Path) {
    write_template(path, SHEET, false);
}

fn write_template(path: &Path, sheet: &str, return_labels: bool) {
    let mut workbook = Workbook::new();
    let border = Format::new().set_border(FormatBorder::Thin);
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet).unwrap();

    worksheet.write_string(0, 0, "Проект").unwrap();
    worksheet.write_string(0, 2, "Период").unwrap();
    for (col, heading) in ["Артикул", "Товар", "Кол-во", "Цена"].iter().enumerate() {
        worksheet.write_string(2, col as u16, *heading).unwrap();
        worksheet.write_string(2, col as u16 + 4, *heading).unwrap();
    }

    for col in 0..9 {
        worksheet.write_blank(4, col, &border).unwrap();
    }
    worksheet.write_string(6, 0, "Отгрузки:").unwrap();
    let label_rows: &[u32] = if return_labels { &[7, 9] } else { &[7] };
    for &row in label_rows {
        for col in 0..3 {
            worksheet.write_blank(row, col, &border).unwrap();
        }
    }
    worksheet.write_string(11, 0, "Итого").unwrap();

    workbook.save(path).unwrap();
}

pub fn line(article: &str, name: &str, quantity: i64, price: i64, flagged: bool) -> ReportLine {
    ReportLine {
        article: article.to_string(),
        name: name.to_string(),
        quantity: Decimal::from(quantity),
        price: Decimal::from(price),
        flagged,
    }
}

pub fn read_sheet(path: &Path) -> Range<Data> {
    let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
    workbook.worksheet_range(SHEET).unwrap()
}

/// Cell at a 1-based position
pub fn cell(range: &Range<Data>, row: u32, col: u32) -> Data {
    range
        .get_value((row - 1, col - 1))
        .cloned()
        .unwrap_or(Data::Empty)
}

pub fn text(range: &Range<Data>, row: u32, col: u32) -> String {
    match cell(range, row, col) {
        Data::String(s) => s,
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

pub fn number(range: &Range<Data>, row: u32, col: u32) -> f64 {
    match cell(range, row, col) {
        Data::Float(f) => f,
        Data::Int(i) => i as f64,
        other => panic!("({row}, {col}) is not a number: {other:?}"),
    }
}
