//! Workload-plan worksheet parsing for Excel (.xlsx/.xlsm/.xls/.xlsb).
//!
//! Each worksheet whose name starts with the configured prefix is scanned for
//! the "№ п.п." header row, then its data rows are classified one by one:
//! blank rows are skipped, "Итого за …" rows open a pending total whose
//! "Поручено"/"Выполнено" lines become summary rows, and every other row is a
//! discipline row whose number and name are forward-filled across vertically
//! merged cells. Unrecognized sheets and rows are skipped, never fatal.

use crate::cell::{cell_int, cell_text, parse_int};
use crate::labels::{self, HEADER_MARKER, SEMESTER_MARKER};
use crate::schema::{
    Hours, Measure, PlanRow, PlanTable, Quantities, TotalKind, TotalPeriod, HOUR_COLUMNS,
};
use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsb, Xlsx};
use std::io::{Cursor, Read, Seek};
use tracing::{debug, info, warn};

// Fixed 26-column layout (A..Z), zero-based.
const COL_NUMBER: u32 = 0;
const COL_NAME: u32 = 1;
const COL_GROUP: u32 = 2;
const COL_FIRST_QUANTITY: u32 = 3;
const COL_FIRST_HOUR: u32 = 7;
const COL_TOTAL: u32 = 24;
const COL_NOTE: u32 = 25;
const COLUMN_COUNT: u32 = 26;

/// Rows scanned when looking for the header marker.
const HEADER_SCAN_ROWS: u32 = 40;
/// Rows scanned when looking for the semester title.
const SEMESTER_SCAN_ROWS: u32 = 80;

/// Dispatch workbook parsing by extension.
pub fn parse_file(filename: &str, data: &[u8], sheet_prefix: &str) -> Result<Vec<PlanTable>> {
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();

    let cursor = Cursor::new(data);
    let tables = match ext.as_str() {
        "xlsx" | "xlsm" => {
            let mut workbook: Xlsx<_> =
                open_workbook_from_rs(cursor).context("Failed to open Excel workbook")?;
            parse_workbook(&mut workbook, sheet_prefix)
        }
        "xls" => {
            let mut workbook: Xls<_> =
                open_workbook_from_rs(cursor).context("Failed to open Excel workbook")?;
            parse_workbook(&mut workbook, sheet_prefix)
        }
        "xlsb" => {
            let mut workbook: Xlsb<_> =
                open_workbook_from_rs(cursor).context("Failed to open Excel workbook")?;
            parse_workbook(&mut workbook, sheet_prefix)
        }
        _ => anyhow::bail!(
            "Unsupported file type: .{}. Supported: .xlsx, .xlsm, .xls, .xlsb",
            ext
        ),
    };

    info!("Parsed {} plan table(s) from {}", tables.len(), filename);
    Ok(tables)
}

/// Parse every prefixed worksheet of an opened workbook.
fn parse_workbook<RS, R>(workbook: &mut R, sheet_prefix: &str) -> Vec<PlanTable>
where
    RS: Read + Seek,
    R: Reader<RS>,
{
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut tables = Vec::new();

    for name in &sheet_names {
        if !labels::starts_with_ignore_case(name, sheet_prefix) {
            debug!("Skipping sheet '{}': name lacks prefix '{}'", name, sheet_prefix);
            continue;
        }

        let range = match workbook.worksheet_range(name) {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping sheet '{}': {:?}", name, e);
                continue;
            }
        };

        if let Some(table) = parse_sheet(name, &range) {
            tables.push(table);
        }
    }

    tables
}

/// Where the data block of a worksheet begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SheetLayout {
    header_row: u32,
    semester_row: Option<u32>,
    first_data_row: u32,
}

/// Locate the header and semester-title rows of a worksheet.
fn classify_sheet(range: &Range<Data>, last_row: u32) -> Option<SheetLayout> {
    let header_row = (0..=last_row.min(HEADER_SCAN_ROWS - 1)).find(|&r| {
        labels::eq_ignore_case(&cell_text(range.get_value((r, COL_NUMBER))), HEADER_MARKER)
    })?;

    let semester_row = (0..=last_row.min(SEMESTER_SCAN_ROWS - 1)).find(|&r| {
        labels::contains_ignore_case(&cell_text(range.get_value((r, COL_NAME))), SEMESTER_MARKER)
    });

    let first_data_row = match semester_row {
        Some(r) => r + 1,
        // No semester title: the header block is two rows high.
        None => header_row + 2,
    };

    Some(SheetLayout {
        header_row,
        semester_row,
        first_data_row,
    })
}

/// Parse one worksheet into a table. Returns `None` when the sheet is not a
/// recognizable plan table or yields neither rows nor totals.
pub fn parse_sheet(name: &str, range: &Range<Data>) -> Option<PlanTable> {
    let last_row = range.end()?.0;
    if last_row < 2 {
        debug!("Skipping sheet '{}': too few rows", name);
        return None;
    }

    let Some(layout) = classify_sheet(range, last_row) else {
        warn!("Skipping sheet '{}': header marker '{}' not found", name, HEADER_MARKER);
        return None;
    };
    debug!(
        "Sheet '{}': header row {}, semester row {:?}, data from row {}",
        name, layout.header_row, layout.semester_row, layout.first_data_row
    );

    let semester_title = layout
        .semester_row
        .map(|r| cell_text(range.get_value((r, COL_NAME))));
    let mut table = PlanTable::new(name, semester_title);

    let mut state = FillState::default();
    for r in layout.first_data_row..=last_row {
        if let Some(row) = state.parse_row(range, r) {
            if let Some((kind, total)) = row.total_kind.zip(row.total) {
                table.totals.set(kind, Some(total));
            }
            table.rows.push(row);
        }
    }

    if table.rows.is_empty() && !table.totals.any_set() {
        debug!("Skipping sheet '{}': no rows or totals", name);
        return None;
    }

    info!(
        "Sheet '{}': {} row(s), {} total row(s)",
        name,
        table.rows.len(),
        table.summary_rows().count()
    );
    Some(table)
}

/// Per-sheet scan state: forward-fill values and the pending total header.
#[derive(Debug, Default)]
struct FillState {
    row_order: u32,
    last_number: Option<i32>,
    last_discipline: String,
    pending_total: Option<(String, TotalPeriod)>,
}

impl FillState {
    fn parse_row(&mut self, range: &Range<Data>, r: u32) -> Option<PlanRow> {
        if is_row_empty(range, r) {
            return None;
        }

        let number_text = cell_text(range.get_value((r, COL_NUMBER)));
        let name = cell_text(range.get_value((r, COL_NAME)));
        let group = cell_text(range.get_value((r, COL_GROUP)));

        // "Итого за …" header, optionally with its kind on the same line
        if let Some(period) = TotalPeriod::from_header(&name) {
            self.pending_total = Some((name.clone(), period));
            // Without a kind cell this is only a header; the kinds follow below.
            return self.summary_row(range, r, &name, period, &group);
        }

        if name.is_empty() && labels::is_plan_or_fact(&group) {
            // Plan/fact continuation of the header above
            let Some((header, period)) = self.pending_total.clone() else {
                debug!("Row {}: '{}' without a total header, skipped", r + 1, group);
                return None;
            };
            return self.summary_row(range, r, &header, period, &group);
        }

        let number = parse_int(&number_text).or(self.last_number);
        if !name.is_empty() {
            self.last_discipline = name;
        }
        if number.is_none() && self.last_discipline.is_empty() {
            debug!("Row {}: no number or discipline to fill from, dropped", r + 1);
            return None;
        }
        self.last_number = number;

        let mut row = read_values(range, r, self.next_order());
        row.number = number;
        row.discipline_name = self.last_discipline.clone();
        row.faculty_group = group;
        Some(row)
    }

    fn summary_row(
        &mut self,
        range: &Range<Data>,
        r: u32,
        header: &str,
        period: TotalPeriod,
        kind_text: &str,
    ) -> Option<PlanRow> {
        let measure = Measure::from_label(kind_text)?;
        let mut row = read_values(range, r, self.next_order());
        row.is_summary = true;
        row.discipline_name = header.to_string();
        row.faculty_group = kind_text.to_string();
        row.total_kind = Some(TotalKind::new(period, measure));
        Some(row)
    }

    fn next_order(&mut self) -> u32 {
        let order = self.row_order;
        self.row_order += 1;
        order
    }
}

/// Read the quantity, hour, total and note columns of a row.
fn read_values(range: &Range<Data>, r: u32, row_order: u32) -> PlanRow {
    let int_at = |c: u32| cell_int(range.get_value((r, c)));

    let mut hours = [None; HOUR_COLUMNS];
    for (c, slot) in (COL_FIRST_HOUR..).zip(hours.iter_mut()) {
        *slot = int_at(c);
    }

    let note = cell_text(range.get_value((r, COL_NOTE)));

    PlanRow {
        row_order,
        quantities: Quantities {
            course: int_at(COL_FIRST_QUANTITY),
            streams: int_at(COL_FIRST_QUANTITY + 1),
            groups: int_at(COL_FIRST_QUANTITY + 2),
            students: int_at(COL_FIRST_QUANTITY + 3),
        },
        hours: Hours::from_columns(hours),
        total: int_at(COL_TOTAL),
        note: (!note.is_empty()).then_some(note),
        ..Default::default()
    }
}

/// True when every cell of the 26-column window is empty or blank.
fn is_row_empty(range: &Range<Data>, r: u32) -> bool {
    (0..COLUMN_COUNT).all(|c| cell_text(range.get_value((r, c))).is_empty())
}
