// HTML table import
//
// Some platforms "export to Excel" by serving an HTML page with a .xls
// extension. Only the first <table> is read; nested tables are not supported.

use std::path::Path;

use regex::Regex;
use valida_recon::{CellValue, Table};

use crate::csv::read_file_as_utf8;
use crate::{table_from_grid, IoError, LoadOptions};

pub fn import(path: &Path, options: &LoadOptions) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    let grid = parse_first_table(&content).map_err(|e| IoError::parse(path, e))?;
    if grid.is_empty() {
        return Err(IoError::parse(path, "no <table> with rows found"));
    }
    table_from_grid(path, grid, options.header_row)
}

struct Patterns {
    table: Regex,
    row: Regex,
    cell: Regex,
    line_break: Regex,
    tag: Regex,
    whitespace: Regex,
}

impl Patterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            table: Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>")?,
            row: Regex::new(r"(?is)<tr\b[^>]*>(.*?)(?:</tr\s*>|$)")?,
            cell: Regex::new(r"(?is)<t([hd])\b[^>]*>(.*?)</t[hd]\s*>")?,
            line_break: Regex::new(r"(?i)<br\s*/?>")?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }
}

/// Cell grid of the first `<table>` in `html`, one inner vec per `<tr>`.
pub fn parse_first_table(html: &str) -> Result<Vec<Vec<CellValue>>, regex::Error> {
    let patterns = Patterns::new()?;

    let Some(table) = patterns.table.captures(html).and_then(|c| c.get(1)) else {
        return Ok(Vec::new());
    };

    let mut grid = Vec::new();
    for row in patterns.row.captures_iter(table.as_str()) {
        let Some(body) = row.get(1) else { continue };
        let cells: Vec<CellValue> = patterns
            .cell
            .captures_iter(body.as_str())
            .map(|cell| {
                let inner = cell.get(2).map(|m| m.as_str()).unwrap_or_default();
                CellValue::from(cell_text(&patterns, inner))
            })
            .collect();
        grid.push(cells);
    }
    Ok(grid)
}

fn cell_text(patterns: &Patterns, inner: &str) -> String {
    let text = patterns.line_break.replace_all(inner, " ");
    let text = patterns.tag.replace_all(&text, "");
    let text = decode_entities(&text);
    patterns.whitespace.replace_all(text.trim(), " ").into_owned()
}

/// Decode the handful of entities spreadsheet exports emit, plus numeric
/// character references.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => numeric_reference(entity),
            };
            ch.map(|c| (c, end + 1))
        });

        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn numeric_reference(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
