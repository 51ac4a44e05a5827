use std::path::Path;

use concilia_recon::{ReconError, Table};
use tracing::debug;

use crate::error::FileError;

/// Reader selected for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Delimited,
    Spreadsheet,
    /// Unknown extension: sniff the bytes, then try text before spreadsheet.
    Unknown,
}

impl FileFormat {
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv" | "tsv" | "txt") => Self::Delimited,
            Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => Self::Spreadsheet,
            _ => Self::Unknown,
        }
    }

    /// ZIP (xlsx/ods) or OLE (xls) container magic.
    pub fn sniff(bytes: &[u8]) -> Self {
        const ZIP: &[u8] = b"PK\x03\x04";
        const OLE: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";
        if bytes.starts_with(ZIP) || bytes.starts_with(OLE) {
            Self::Spreadsheet
        } else {
            Self::Unknown
        }
    }
}

/// Parse one upload into a table whose headers come from the first row after
/// `skip_rows`.
pub fn read_table(name: &str, bytes: &[u8], skip_rows: usize) -> Result<Table, ReconError> {
    // Container magic wins over the extension: a workbook saved as `.csv`
    // is still a workbook.
    let format = match (FileFormat::from_name(name), FileFormat::sniff(bytes)) {
        (_, FileFormat::Spreadsheet) => FileFormat::Spreadsheet,
        (FileFormat::Unknown, sniffed) => sniffed,
        (named, _) => named,
    };
    debug!(file = name, ?format, skip_rows, "reading upload");

    let parsed = match format {
        FileFormat::Delimited if looks_binary(bytes) => {
            Err(FileError::UnknownFormat("binary content in a text file".into()))
        }
        FileFormat::Delimited => crate::csv::parse_delimited(bytes, skip_rows),
        FileFormat::Spreadsheet => crate::xlsx::parse_spreadsheet(bytes, skip_rows),
        FileFormat::Unknown => parse_with_fallback(bytes, skip_rows),
    };
    parsed.map_err(|e| e.into_parse_error(name))
}

fn parse_with_fallback(bytes: &[u8], skip_rows: usize) -> Result<Table, FileError> {
    let text_err = if looks_binary(bytes) {
        FileError::UnknownFormat("binary content".into())
    } else {
        match crate::csv::parse_delimited(bytes, skip_rows) {
            Ok(table) => return Ok(table),
            Err(e) => e,
        }
    };
    debug!(error = %text_err, "delimited parse failed, trying spreadsheet reader");
    crate::xlsx::parse_spreadsheet(bytes, skip_rows)
        .map_err(|e| FileError::UnknownFormat(format!("text: {text_err}; spreadsheet: {e}")))
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(8192).any(|&b| b == 0)
}

/// First row becomes the (trimmed) header; fully blank rows are dropped.
pub(crate) fn rows_to_table(rows: Vec<Vec<String>>) -> Result<Table, FileError> {
    let mut rows = rows
        .into_iter()
        .filter(|r| r.iter().any(|c| !c.trim().is_empty()));

    let headers = rows
        .next()
        .ok_or(FileError::NoHeader)?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::new(headers);
    table.rows = rows.collect();
    Ok(table)
}
