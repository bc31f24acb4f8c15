// Workbook import (xlsx, xlsm, xls, xlsb, ods) and report export (xlsx)

use std::borrow::Cow;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use tally_recon::{Cell, Dataset, ReportFile};

/// Excel limit on worksheet name length.
const MAX_SHEET_NAME: usize = 31;

/// Excel limit on characters in one cell.
const MAX_CELL_CHARS: usize = 32_767;

/// Appended to cell text cut at [`MAX_CELL_CHARS`].
const TRUNCATION_MARKER: &str = "...[truncated]";

/// Read one worksheet into a dataset. The first row is the header.
///
/// `sheet` selects a worksheet by name; the first sheet is used otherwise.
pub fn read_dataset(bytes: Vec<u8>, sheet: Option<&str>) -> Result<Dataset, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| format!("Failed to open workbook: {}", e))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| format!("Sheet '{}' not found (have: {})", wanted, sheet_names.join(", ")))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| "Workbook contains no sheets".to_string())?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", name, e))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Dataset::default());
    };

    // Blank header cells get a positional name so every column stays addressable
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, data)| match to_cell(data) {
            Cell::Empty => format!("Unnamed: {}", i),
            cell => cell.as_text().into_owned(),
        })
        .collect();

    let mut ds = Dataset::new(columns);
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(to_cell).collect();
        if cells.iter().all(Cell::is_blank) {
            continue;
        }
        ds.push_row(cells);
    }
    Ok(ds)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Text(n.to_string()),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        // Date serials stay numeric; identifiers and flags are never dates
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Render every table of a report file as one worksheet, header row in bold.
pub fn write_workbook(file: &ReportFile) -> Result<Vec<u8>, String> {
    let mut workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    for table in &file.tables {
        let sheet_name = sanitize_sheet_name(&table.name);
        let worksheet = workbook
            .add_worksheet()
            .set_name(&sheet_name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", sheet_name, e))?;

        for (col, header) in table.columns.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, fit_cell(header), &header_format)
                .map_err(|e| e.to_string())?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                worksheet
                    .write_string(r as u32 + 1, col as u16, fit_cell(value))
                    .map_err(|e| e.to_string())?;
            }
        }
        worksheet.autofit();
    }

    workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to write workbook: {}", e))
}

/// Cut text to the cell limit on a char boundary, marking the cut.
fn fit_cell(value: &str) -> Cow<'_, str> {
    if value.chars().count() <= MAX_CELL_CHARS {
        return Cow::Borrowed(value);
    }
    let keep = MAX_CELL_CHARS - TRUNCATION_MARKER.chars().count();
    let mut cut: String = value.chars().take(keep).collect();
    cut.push_str(TRUNCATION_MARKER);
    Cow::Owned(cut)
}

/// Excel rejects `[]:*?/\` in sheet names and caps them at 31 characters.
fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned.to_string()
    }
}
