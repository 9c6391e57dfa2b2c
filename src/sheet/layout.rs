use tracing::debug;

use super::{CellValue, TemplateSheet};
use crate::error::{ReportError, Result};
use crate::report::{DocumentLabel, FetchedReport, ReportLine};

/// Text written next to flagged return rows
pub const FLAG_MARK: &str = "НСП";

// Fixed column ranges of the report template
const SHIPMENT_FIRST_COL: u32 = 1;
const SHIPMENT_LAST_COL: u32 = 4;
const RETURN_FIRST_COL: u32 = 5;
const RETURN_LAST_COL: u32 = 9;
const FLAG_COL: u32 = 9;
const LABEL_COL: u32 = 2;
/// Formatting copied for label rows covers columns 1..=3
const LABEL_STYLE_LAST_COL: u32 = 3;

const HEADER_ROW: u32 = 1;
const HEADER_PROJECT_COL: u32 = 1;
const HEADER_PERIOD_COL: u32 = 3;

/// Where the sections sit in the unexpanded template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLayout {
    pub sheet: String,
    /// Shared anchor of the shipments (A) and returns (B) sections
    pub paired_row: u32,
    /// Anchor of the shipment document list (C)
    pub shipment_labels_row: u32,
    /// Anchor of the commission report and customer return document list (D)
    pub return_labels_row: u32,
}

impl TemplateLayout {
    /// Anchors must be non-zero and strictly increasing so the phases never
    /// write into each other's rows
    pub fn validate(&self) -> Result<()> {
        let anchors = [
            ("shipments and returns", self.paired_row),
            ("shipment documents", self.shipment_labels_row),
            ("return documents", self.return_labels_row),
        ];

        if let Some((section, _)) = anchors.iter().find(|(_, row)| *row == 0) {
            return Err(ReportError::TemplateMismatch(format!(
                "anchor row for {section} must be 1 or greater"
            )));
        }
        for pair in anchors.windows(2) {
            let ((first, first_row), (second, second_row)) = (pair[0], pair[1]);
            if first_row >= second_row {
                return Err(ReportError::TemplateMismatch(format!(
                    "anchor row {second_row} for {second} must be below row {first_row} for {first}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            sheet: "Товары WB на реализации".to_string(),
            paired_row: 5,
            shipment_labels_row: 8,
            return_labels_row: 10,
        }
    }
}

/// Data of the four template sections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSections {
    /// Section A, columns 1-4
    pub shipments: Vec<ReportLine>,
    /// Section B, columns 5-9
    pub returns: Vec<ReportLine>,
    /// Section C, column 2
    pub shipment_labels: Vec<DocumentLabel>,
    /// Section D, column 2
    pub return_labels: Vec<DocumentLabel>,
}

impl From<FetchedReport> for ReportSections {
    fn from(report: FetchedReport) -> Self {
        let mut returns = report.commission_sold;
        returns.extend(report.commission_returned);
        returns.extend(report.customer_returns);

        let mut return_labels = report.commission_labels;
        return_labels.extend(report.customer_return_labels);

        Self {
            shipments: report.shipments,
            returns,
            shipment_labels: report.shipment_labels,
            return_labels,
        }
    }
}

/// Title cells of the first template row
#[derive(Debug, Clone)]
pub struct ReportHeader {
    pub project: String,
    pub period: String,
}

/// Rows inserted by each phase and the resulting section positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutSummary {
    pub paired_inserted: u32,
    pub shipment_labels_inserted: u32,
    pub return_labels_inserted: u32,
    /// Effective anchor of section C after the paired expansion
    pub shipment_labels_row: u32,
    /// Effective anchor of section D after the earlier expansions
    pub return_labels_row: u32,
}

impl LayoutSummary {
    pub fn total_inserted(&self) -> u32 {
        self.paired_inserted + self.shipment_labels_inserted + self.return_labels_inserted
    }
}

/// Expand the template sections to fit `sections` and write the data.
///
/// Phases run in order A/B, C, D. Each phase inserts `len - 1` rows below
/// its anchor and every later anchor moves down by the rows inserted so far.
pub fn fill_report<S: TemplateSheet>(
    sheet: &mut S,
    layout: &TemplateLayout,
    header: &ReportHeader,
    sections: &ReportSections,
) -> Result<LayoutSummary> {
    layout.validate()?;

    sheet.write(HEADER_ROW, HEADER_PROJECT_COL, CellValue::Text(&header.project))?;
    sheet.write(HEADER_ROW, HEADER_PERIOD_COL, CellValue::Text(&header.period))?;

    let mut summary = LayoutSummary::default();
    let mut shift = 0;

    summary.paired_inserted = fill_paired(sheet, layout.paired_row, sections)?;
    shift += summary.paired_inserted;

    summary.shipment_labels_row = offset_row(layout.shipment_labels_row, shift)?;
    summary.shipment_labels_inserted = fill_labels(
        sheet,
        summary.shipment_labels_row,
        &sections.shipment_labels,
        "shipment documents",
    )?;
    shift += summary.shipment_labels_inserted;

    summary.return_labels_row = offset_row(layout.return_labels_row, shift)?;
    summary.return_labels_inserted = fill_labels(
        sheet,
        summary.return_labels_row,
        &sections.return_labels,
        "return documents",
    )?;

    debug!(?summary, "template sections filled");
    Ok(summary)
}

fn fill_paired<S: TemplateSheet>(
    sheet: &mut S,
    anchor: u32,
    sections: &ReportSections,
) -> Result<u32> {
    require_row(sheet, anchor, "shipments and returns")?;

    let shipments = &sections.shipments;
    let returns = &sections.returns;
    let rows = shipments.len().max(returns.len());
    let inserted = expand(sheet, anchor, rows, RETURN_LAST_COL)?;

    for i in 0..rows {
        let row = offset_row(anchor, i as u32)?;

        match shipments.get(i) {
            Some(line) => write_line(sheet, row, SHIPMENT_FIRST_COL, line)?,
            None => sheet.clear_borders(row, SHIPMENT_FIRST_COL, SHIPMENT_LAST_COL)?,
        }

        match returns.get(i) {
            Some(line) => {
                write_line(sheet, row, RETURN_FIRST_COL, line)?;
                if line.flagged {
                    sheet.write(row, FLAG_COL, CellValue::Text(FLAG_MARK))?;
                    sheet.highlight(row, FLAG_COL)?;
                }
            }
            None => sheet.clear_borders(row, RETURN_FIRST_COL, RETURN_LAST_COL)?,
        }
    }

    Ok(inserted)
}

fn fill_labels<S: TemplateSheet>(
    sheet: &mut S,
    anchor: u32,
    labels: &[DocumentLabel],
    section: &str,
) -> Result<u32> {
    require_row(sheet, anchor, section)?;

    let inserted = expand(sheet, anchor, labels.len(), LABEL_STYLE_LAST_COL)?;
    for (i, label) in labels.iter().enumerate() {
        sheet.write(offset_row(anchor, i as u32)?, LABEL_COL, CellValue::Text(label))?;
    }

    Ok(inserted)
}

/// Insert the rows a section of `len` entries needs below its anchor.
/// The anchor row itself always holds the first entry.
fn expand<S: TemplateSheet>(sheet: &mut S, anchor: u32, len: usize, last_col: u32) -> Result<u32> {
    if len <= 1 {
        return Ok(0);
    }

    let count = u32::try_from(len - 1)
        .map_err(|_| ReportError::TemplateMismatch(format!("{len} rows do not fit a sheet")))?;
    // last inserted row must be addressable
    offset_row(anchor, count)?;

    sheet.insert_rows(anchor + 1, count);
    for offset in 1..=count {
        sheet.copy_row_style(anchor, anchor + offset, last_col)?;
    }

    Ok(count)
}

fn write_line<S: TemplateSheet>(sheet: &mut S, row: u32, first_col: u32, line: &ReportLine) -> Result<()> {
    sheet.write(row, first_col, CellValue::Text(&line.article))?;
    sheet.write(row, first_col + 1, CellValue::Text(&line.name))?;
    sheet.write(row, first_col + 2, CellValue::Number(line.quantity))?;
    sheet.write(row, first_col + 3, CellValue::Number(line.price))?;
    Ok(())
}

fn offset_row(row: u32, by: u32) -> Result<u32> {
    row.checked_add(by).ok_or_else(|| {
        ReportError::TemplateMismatch(format!("row {row} moved by {by} is past the end of the sheet"))
    })
}

fn require_row<S: TemplateSheet>(sheet: &S, row: u32, section: &str) -> Result<()> {
    if sheet.has_row(row) {
        Ok(())
    } else {
        Err(ReportError::TemplateMismatch(format!(
            "row {row} for {section} is missing"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::super::memory::{MemorySheet, Style};
    use super::*;
    use rust_decimal::Decimal;

    fn line(n: u32, flagged: bool) -> ReportLine {
        ReportLine {
            article: format!("ART-{n}"),
            name: format!("Item {n}"),
            quantity: Decimal::from(n),
            price: Decimal::from(n * 10),
            flagged,
        }
    }

    fn lines(count: u32, flagged: bool) -> Vec<ReportLine> {
        (1..=count).map(|n| line(n, flagged)).collect()
    }

    fn labels(prefix: &str, count: u32) -> Vec<String> {
        (1..=count).map(|n| format!("{prefix} {n}")).collect()
    }

    fn header() -> ReportHeader {
        ReportHeader {
            project: "OZON".to_string(),
            period: "2024-01-01 00:00:00 - 2024-01-31 23:59:59".to_string(),
        }
    }

    /// Rows 1..=12 with a distinct style per anchor row
    fn template() -> MemorySheet {
        let mut sheet = MemorySheet::with_rows(12, 9);
        sheet.set_row_style(5, Style::bordered("paired"));
        sheet.set_row_style(8, Style::bordered("shipment-labels"));
        sheet.set_row_style(10, Style::bordered("return-labels"));
        sheet
    }

    #[test]
    fn paired_sections_expand_to_the_longer_side() {
        for (a, b) in [(0, 0), (1, 0), (0, 1), (1, 1), (3, 1), (1, 4), (6, 6), (2, 7)] {
            let mut sheet = template();
            let sections = ReportSections {
                shipments: lines(a, false),
                returns: lines(b, false),
                ..Default::default()
            };
            let summary = fill_report(&mut sheet, &TemplateLayout::default(), &header(), &sections).unwrap();
            let expected = a.max(b).max(1) - 1;
            assert_eq!(summary.paired_inserted, expected, "a={a} b={b}");
            assert_eq!(sheet.row_count(), 12 + expected as usize);
        }
    }

    #[test]
    fn later_anchors_include_every_earlier_insertion() {
        let mut sheet = template();
        let sections = ReportSections {
            shipments: lines(3, false),
            returns: lines(1, false),
            shipment_labels: labels("Отгрузка №", 4),
            return_labels: labels("Возврат покупателя №", 2),
        };
        let summary = fill_report(&mut sheet, &TemplateLayout::default(), &header(), &sections).unwrap();

        assert_eq!(summary.paired_inserted, 2);
        assert_eq!(summary.shipment_labels_row, 8 + 2);
        assert_eq!(summary.shipment_labels_inserted, 3);
        assert_eq!(summary.return_labels_row, 10 + 2 + 3);
        assert_eq!(summary.return_labels_inserted, 1);
        assert_eq!(summary.total_inserted(), 6);

        for i in 0..4 {
            assert_eq!(
                sheet.text(10 + i, 2).as_deref(),
                Some(format!("Отгрузка № {}", i + 1).as_str())
            );
            assert_eq!(sheet.style(10 + i, 1).name, "shipment-labels");
        }
        assert_eq!(sheet.text(15, 2).as_deref(), Some("Возврат покупателя № 1"));
        assert_eq!(sheet.text(16, 2).as_deref(), Some("Возврат покупателя № 2"));
        assert_eq!(sheet.style(16, 3).name, "return-labels");
    }

    #[test]
    fn shorter_side_has_borders_cleared() {
        let mut sheet = template();
        let sections = ReportSections {
            shipments: lines(5, false),
            returns: lines(2, false),
            ..Default::default()
        };
        let summary = fill_report(&mut sheet, &TemplateLayout::default(), &header(), &sections).unwrap();
        assert_eq!(summary.paired_inserted, 4);

        for row in 5..=9 {
            for col in 1..=4 {
                assert!(sheet.style(row, col).border, "row {row} col {col}");
            }
        }
        for row in 7..=9 {
            for col in 5..=9 {
                assert!(!sheet.style(row, col).border, "row {row} col {col}");
                assert_eq!(sheet.text(row, col), None);
            }
        }
        assert_eq!(sheet.text(9, 1).as_deref(), Some("ART-5"));
        assert_eq!(sheet.number(9, 3), Some(Decimal::from(5)));
        assert_eq!(sheet.number(9, 4), Some(Decimal::from(50)));
        assert_eq!(sheet.text(6, 6).as_deref(), Some("Item 2"));
        // template row below the block moved by the insertion
        assert_eq!(sheet.style(12, 1).name, "shipment-labels");
    }

    #[test]
    fn flagged_returns_are_marked_and_highlighted() {
        let mut sheet = template();
        let mut returns = lines(1, false);
        returns.extend(lines(2, true));
        let sections = ReportSections {
            returns,
            ..Default::default()
        };
        fill_report(&mut sheet, &TemplateLayout::default(), &header(), &sections).unwrap();

        assert_eq!(sheet.text(5, 9), None);
        assert!(!sheet.style(5, 9).highlighted);
        for row in 6..=7 {
            assert_eq!(sheet.text(row, 9).as_deref(), Some(FLAG_MARK));
            assert!(sheet.style(row, 9).highlighted);
        }
        // no shipments: column A..D borders cleared on every used row
        for row in 5..=7 {
            assert!(!sheet.style(row, 1).border);
        }
    }

    #[test]
    fn empty_sections_leave_the_template_untouched() {
        let mut sheet = template();
        let before = sheet.clone();
        let summary = fill_report(
            &mut sheet,
            &TemplateLayout::default(),
            &header(),
            &ReportSections::default(),
        )
        .unwrap();

        assert_eq!(summary.total_inserted(), 0);
        assert_eq!(sheet.row_count(), before.row_count());
        for row in 2..=12 {
            for col in 1..=9 {
                assert_eq!(sheet.style(row, col), before.style(row, col));
            }
        }
        assert_eq!(sheet.text(1, 1).as_deref(), Some("OZON"));
    }

    #[test]
    fn sections_concatenate_fetched_lists_in_order() {
        let fetched = FetchedReport {
            shipments: vec![line(1, false)],
            shipment_labels: labels("Отгрузка №", 1),
            commission_sold: vec![line(2, false)],
            commission_returned: vec![line(3, false)],
            commission_labels: labels("Отчёт комиссионера №", 2),
            customer_returns: vec![line(4, true)],
            customer_return_labels: labels("Возврат покупателя №", 1),
        };
        let sections = ReportSections::from(fetched);

        assert_eq!(sections.shipments, vec![line(1, false)]);
        assert_eq!(sections.returns, vec![line(2, false), line(3, false), line(4, true)]);
        assert_eq!(sections.shipment_labels, vec!["Отгрузка № 1"]);
        assert_eq!(
            sections.return_labels,
            vec!["Отчёт комиссионера № 1", "Отчёт комиссионера № 2", "Возврат покупателя № 1"]
        );
    }

    #[test]
    fn misordered_anchors_are_rejected_before_writing() {
        let mut sheet = template();
        let before = sheet.clone();
        let layout = TemplateLayout {
            shipment_labels_row: 4,
            ..TemplateLayout::default()
        };
        let sections = ReportSections {
            shipments: lines(3, false),
            shipment_labels: labels("L", 1),
            ..Default::default()
        };

        let err = fill_report(&mut sheet, &layout, &header(), &sections).unwrap_err();
        assert!(matches!(err, ReportError::TemplateMismatch(_)), "{err}");
        assert_eq!(sheet, before);

        let layout = TemplateLayout {
            return_labels_row: 8,
            ..TemplateLayout::default()
        };
        assert!(matches!(layout.validate(), Err(ReportError::TemplateMismatch(_))));
    }

    #[test]
    fn zero_anchor_is_rejected() {
        let layout = TemplateLayout {
            paired_row: 0,
            ..TemplateLayout::default()
        };
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("1 or greater"), "{err}");
        assert!(TemplateLayout::default().validate().is_ok());
    }

    #[test]
    fn anchor_overflow_is_a_template_mismatch() {
        let mut sheet = template();
        let layout = TemplateLayout {
            shipment_labels_row: u32::MAX - 1,
            return_labels_row: u32::MAX,
            ..TemplateLayout::default()
        };
        let sections = ReportSections {
            shipments: lines(3, false),
            ..Default::default()
        };

        let err = fill_report(&mut sheet, &layout, &header(), &sections).unwrap_err();
        assert!(matches!(err, ReportError::TemplateMismatch(_)), "{err}");
        assert!(err.to_string().contains("past the end"), "{err}");
    }

    #[test]
    fn missing_anchor_is_a_template_mismatch() {
        let mut sheet = MemorySheet::with_rows(9, 9);
        let sections = ReportSections {
            return_labels: labels("Отчёт комиссионера №", 1),
            ..Default::default()
        };
        let err = fill_report(&mut sheet, &TemplateLayout::default(), &header(), &sections).unwrap_err();
        assert!(matches!(err, ReportError::TemplateMismatch(_)));
        assert!(err.to_string().contains("row 10"));
    }
}
