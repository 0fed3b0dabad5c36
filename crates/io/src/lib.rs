// File I/O for the enrollment bases and the inconsistency report

pub mod bases;
pub mod csv;
pub mod error;
pub mod html;
pub mod json;
pub mod xlsx;

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use valida_recon::{CellValue, Table};

pub use bases::{identify_bases, identify_bases_with, role_for, BaseFiles};
pub use error::IoError;

/// Default 1-indexed header row. Platform exports carry a title line above
/// the real headers.
pub const DEFAULT_HEADER_ROW: usize = 2;

/// How an input file is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Excel,
    Html,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// 1-indexed row holding the column headers; rows above it are skipped.
    pub header_row: usize,
    /// Field delimiter for delimited text; sniffed when `None`.
    pub delimiter: Option<u8>,
    /// Worksheet name for workbooks; first sheet when `None`.
    pub sheet: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            delimiter: None,
            sheet: None,
        }
    }
}

/// Work out how to parse `path`: content signature first, then extension.
pub fn detect_format(path: &Path) -> Result<FileFormat, IoError> {
    let mut head = [0u8; 512];
    let read = {
        let mut file = std::fs::File::open(path).map_err(|e| IoError::file(path, e))?;
        file.read(&mut head).map_err(|e| IoError::file(path, e))?
    };
    if let Some(format) = sniff_format(&head[..read]) {
        return Ok(format);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "txt" | "tsv" => Ok(FileFormat::Csv),
        "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Ok(FileFormat::Excel),
        "htm" | "html" => Ok(FileFormat::Html),
        _ => Err(IoError::UnsupportedFormat { path: path.to_path_buf() }),
    }
}

fn sniff_format(head: &[u8]) -> Option<FileFormat> {
    // ZIP container (xlsx, ods) or OLE compound document (legacy xls)
    if head.starts_with(b"PK\x03\x04") || head.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        return Some(FileFormat::Excel);
    }
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<!doctype html") || text.starts_with("<html") || text.contains("<table") {
        return Some(FileFormat::Html);
    }
    None
}

/// Load one base into a [`Table`] with normalized column names.
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<Table, IoError> {
    let format = detect_format(path)?;
    tracing::debug!(path = %path.display(), ?format, header_row = options.header_row, "loading table");

    let table = match format {
        FileFormat::Csv => csv::import(path, options)?,
        FileFormat::Excel => xlsx::import(path, options)?,
        FileFormat::Html => html::import(path, options)?,
    };

    tracing::info!(
        path = %path.display(),
        columns = table.columns.len(),
        rows = table.len(),
        "loaded table"
    );
    Ok(table)
}

/// Build a table from a raw cell grid: headers from `header_row`
/// (1-indexed), data from every non-blank row below it.
pub(crate) fn table_from_grid(
    path: &Path,
    grid: Vec<Vec<CellValue>>,
    header_row: usize,
) -> Result<Table, IoError> {
    let missing = || IoError::HeaderRowMissing { path: path.to_path_buf(), header_row };

    let header_idx = header_row.checked_sub(1).ok_or_else(missing)?;
    let mut rows = grid.into_iter().skip(header_idx);
    let headers: Vec<String> = rows.next().ok_or_else(missing)?.iter().map(CellValue::as_text).collect();

    // Trailing blank header cells are layout padding, not columns.
    let width = headers.iter().rposition(|h| !h.trim().is_empty()).map(|i| i + 1).ok_or_else(missing)?;

    let mut table = Table::from_raw_headers(&headers[..width]);
    for row in rows {
        if row.iter().all(|c| c.as_text().trim().is_empty()) {
            continue;
        }
        table.push_row(row);
    }
    Ok(table)
}
