// CSV/TSV import/export

use std::io::Write;
use std::path::Path;

use concilia_recon::Table;

use crate::error::FileError;
use crate::ingest::rows_to_table;

/// Parse delimited text into a table. The first `skip_rows` lines are
/// preamble; the next line is the header.
pub fn parse_delimited(bytes: &[u8], skip_rows: usize) -> Result<Table, FileError> {
    let content = decode_utf8(bytes);
    let body = skip_lines(&content, skip_rows);
    let delimiter = sniff_delimiter(body);
    import_from_string(body, delimiter)
}

fn skip_lines(content: &str, n: usize) -> &str {
    let mut rest = content;
    for _ in 0..n {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the header line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (lines with the header's field count) * field_count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Convert bytes to UTF-8, falling back to Windows-1252 (Excel-exported CSVs).
pub fn decode_utf8(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Table, FileError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    rows_to_table(rows)
}

pub fn write_csv<W: Write>(table: &Table, out: W) -> Result<(), FileError> {
    write_with_delimiter(table, out, b',')
}

pub fn export_csv(table: &Table, path: &Path) -> Result<(), FileError> {
    let file = std::fs::File::create(path)?;
    write_with_delimiter(table, std::io::BufWriter::new(file), b',')
}

pub fn export_tsv(table: &Table, path: &Path) -> Result<(), FileError> {
    let file = std::fs::File::create(path)?;
    write_with_delimiter(table, std::io::BufWriter::new(file), b'\t')
}

fn write_with_delimiter<W: Write>(table: &Table, out: W, delimiter: u8) -> Result<(), FileError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(out);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
