// Delimited text import/export

use std::io::{Read, Write};
use std::path::Path;

use valida_recon::{CellValue, Table};

use crate::{table_from_grid, IoError, LoadOptions};

pub fn import(path: &Path, options: &LoadOptions) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| sniff_delimiter(&content, options.header_row.saturating_sub(1)));
    tracing::debug!(path = %path.display(), delimiter = %(delimiter as char), "parsing delimited text");
    import_from_string(path, &content, delimiter, options.header_row)
}

/// Detect the most likely field delimiter by checking consistency across a
/// sample of lines starting at the header row.
///
/// Title lines above the header usually have a single field, so they are left
/// out of the sample. For each candidate (tab, semicolon, comma, pipe), count
/// fields per line; the delimiter with the most consistent count (>1 field) wins.
pub fn sniff_delimiter(content: &str, skip_lines: usize) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .skip(skip_lines)
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

        // The header line must split
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

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

/// Read a file as UTF-8, falling back to Windows-1252 for legacy exports.
/// A leading byte-order mark is dropped.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::file(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::file(path, e))?;

    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            tracing::debug!(path = %path.display(), "not UTF-8; decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(match content.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => content,
    })
}

fn import_from_string(path: &Path, content: &str, delimiter: u8, header_row: usize) -> Result<Table, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid: Vec<Vec<CellValue>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IoError::parse(path, e))?;
        grid.push(record.iter().map(CellValue::from).collect());
    }

    table_from_grid(path, grid, header_row)
}

/// Write `table` as comma-delimited UTF-8 with a header line.
pub fn export(table: &Table, path: &Path) -> Result<(), IoError> {
    let file = std::fs::File::create(path).map_err(|e| IoError::write(path, e))?;
    write_table(table, file).map_err(|e| IoError::write(path, e))
}

/// Write `table` to any writer (used for stdout output).
pub fn write_table<W: Write>(table: &Table, writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new().delimiter(b',').from_writer(writer);

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(table.columns.iter().map(|c| row.text(c)))?;
    }

    writer.flush()?;
    Ok(())
}
