// Excel import (xlsx, xls, xlsb, ods via calamine) and XLSX export

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate, Timelike};
use concilia_recon::Table;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::FileError;
use crate::ingest::rows_to_table;

/// Read the first worksheet. `skip_rows` counts physical rows from row 1.
pub fn parse_spreadsheet(bytes: &[u8], skip_rows: usize) -> Result<Table, FileError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| FileError::Spreadsheet(format!("failed to open workbook: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| FileError::Spreadsheet("workbook contains no sheets".into()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| FileError::Spreadsheet(format!("failed to read sheet '{sheet_name}': {e}")))?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let skip = skip_rows.saturating_sub(start_row as usize);

    let rows = range
        .rows()
        .skip(skip)
        .map(|row| {
            let mut cells: Vec<String> = vec![String::new(); start_col as usize];
            cells.extend(row.iter().map(cell_text));
            cells
        })
        .collect();

    rows_to_table(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => serial_to_iso(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Excel 1900-system serial to `YYYY-MM-DD[ HH:MM:SS]`.
fn serial_to_iso(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return serial.to_string();
    };
    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    let Some(datetime) = epoch
        .and_hms_opt(0, 0, 0)
        .and_then(|base| Duration::try_days(days as i64).and_then(|d| base.checked_add_signed(d)))
        .and_then(|d| Duration::try_seconds(seconds).and_then(|s| d.checked_add_signed(s)))
    else {
        return serial.to_string();
    };

    if datetime.num_seconds_from_midnight() == 0 {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Write the table to a single-sheet workbook. Cells in `numeric` columns that
/// parse as numbers are written as numbers; everything else as text.
pub fn export_xlsx(table: &Table, numeric: &[bool], path: &Path) -> Result<(), FileError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Reconciliation")?;

    let header_format = Format::new().set_bold();
    let money_format = Format::new().set_num_format("#,##0.00");

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let xrow = row_idx as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let is_numeric = numeric.get(col).copied().unwrap_or(false);
            match value.parse::<f64>() {
                Ok(n) if is_numeric && value.contains('.') => {
                    worksheet.write_number_with_format(xrow, col as u16, n, &money_format)?;
                }
                Ok(n) if is_numeric => {
                    worksheet.write_number(xrow, col as u16, n)?;
                }
                _ => {
                    worksheet.write_string(xrow, col as u16, value)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    workbook.save(path)?;
    Ok(())
}
