// Excel import (xlsx, xls, xlsb, ods) and report export (xlsx only)

use std::path::Path;

use calamine::{open_workbook_auto, Data, ExcelDateTime, Reader};
use chrono::Timelike;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use valida_recon::{CellValue, Table};

use crate::{table_from_grid, IoError, LoadOptions};

/// Worksheet name of the exported report.
pub const REPORT_SHEET: &str = "VERIFICAR";

/// Import one worksheet (the named one, or the first) as a table.
pub fn import(path: &Path, options: &LoadOptions) -> Result<Table, IoError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IoError::parse(path, format!("failed to open Excel file: {}", e)))?;

    let sheet_name = match &options.sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IoError::parse(path, "Excel file contains no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::parse(path, format!("failed to read sheet '{}': {}", sheet_name, e)))?;

    // Ranges start at the first used cell; pad back to sheet coordinates so the
    // header row counts from row 1 of the sheet.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(cell_value));
        grid.push(cells);
    }

    tracing::debug!(path = %path.display(), sheet = %sheet_name, rows = grid.len(), "read worksheet");
    table_from_grid(path, grid, options.header_row)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        // Error cells carry no usable value
        Data::Error(_) => CellValue::Empty,
        Data::DateTime(dt) => date_value(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}

/// Dates become ISO text (`2024-01-15`, or `2024-01-15 08:30:00` with a time
/// part). Durations keep their serial value.
fn date_value(dt: &ExcelDateTime) -> CellValue {
    if dt.is_duration() {
        return CellValue::Number(dt.as_f64());
    }
    match dt.as_datetime() {
        Some(d) if d.time().num_seconds_from_midnight() == 0 => CellValue::Text(d.format("%Y-%m-%d").to_string()),
        Some(d) => CellValue::Text(d.format("%Y-%m-%d %H:%M:%S").to_string()),
        None => CellValue::Number(dt.as_f64()),
    }
}

/// Write `table` to a single-sheet workbook with a bold, frozen header row.
pub fn export(table: &Table, path: &Path) -> Result<(), IoError> {
    let mut workbook = XlsxWorkbook::new();
    let header = Format::new().set_bold();

    {
        let worksheet = workbook
            .add_worksheet()
            .set_name(REPORT_SHEET)
            .map_err(|e| IoError::write(path, e))?;

        for (col, name) in table.columns.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, name, &header)
                .map_err(|e| IoError::write(path, e))?;
        }

        for (r, row) in table.rows.iter().enumerate() {
            let excel_row = (r + 1) as u32;
            for (c, column) in table.columns.iter().enumerate() {
                match row.get(column) {
                    Some(CellValue::Number(n)) => {
                        worksheet
                            .write_number(excel_row, c as u16, *n)
                            .map_err(|e| IoError::write(path, e))?;
                    }
                    Some(CellValue::Text(s)) => {
                        worksheet
                            .write_string(excel_row, c as u16, s)
                            .map_err(|e| IoError::write(path, e))?;
                    }
                    Some(CellValue::Empty) | None => {}
                }
            }
        }

        worksheet.set_freeze_panes(1, 0).map_err(|e| IoError::write(path, e))?;
        worksheet.autofit();
    }

    workbook.save(path).map_err(|e| IoError::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_fixture(path: &Path) {
        let mut workbook = XlsxWorkbook::new();
        let ws = workbook.add_worksheet().set_name("Alunos").unwrap();
        ws.write_string(0, 0, "Relatório Comercial").unwrap();
        ws.write_string(1, 0, "CPF").unwrap();
        ws.write_string(1, 1, "Nome").unwrap();
        ws.write_string(1, 2, "Estado").unwrap();
        ws.write_number(2, 0, 12345678901.0).unwrap();
        ws.write_string(2, 1, "Ana").unwrap();
        ws.write_string(2, 2, "SP").unwrap();
        ws.write_string(3, 0, "00011122233").unwrap();
        ws.write_string(3, 1, "Bob").unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn import_first_sheet_with_title_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("comercial.xlsx");
        write_fixture(&path);

        let t = import(&path, &LoadOptions::default()).unwrap();
        assert_eq!(t.columns, vec!["cpf", "nome", "estado"]);
        assert_eq!(t.len(), 2);
        // Integral floats read back without decimals
        assert_eq!(t.rows[0].text("cpf"), "12345678901");
        assert_eq!(t.rows[1].text("cpf"), "00011122233");
        assert_eq!(t.rows[1].text("estado"), "");
    }

    #[test]
    fn date_cells_import_as_iso_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("painel.xlsx");

        let mut workbook = XlsxWorkbook::new();
        let date = Format::new().set_num_format("dd/mm/yyyy");
        let stamp = Format::new().set_num_format("dd/mm/yyyy hh:mm");
        let ws = workbook.add_worksheet();
        ws.write_string(0, 0, "CPF").unwrap();
        ws.write_string(0, 1, "Data Matrícula").unwrap();
        ws.write_string(0, 2, "Último Acesso").unwrap();
        ws.write_string(1, 0, "111").unwrap();
        ws.write_number_with_format(1, 1, 45306.0, &date).unwrap();
        ws.write_number_with_format(1, 2, 45306.5, &stamp).unwrap();
        workbook.save(&path).unwrap();

        let options = LoadOptions { header_row: 1, ..Default::default() };
        let t = import(&path, &options).unwrap();
        assert_eq!(t.rows[0].text("data matrícula"), "2024-01-15");
        assert_eq!(t.rows[0].text("último acesso"), "2024-01-15 12:00:00");
    }

    #[test]
    fn import_unknown_sheet_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("comercial.xlsx");
        write_fixture(&path);

        let options = LoadOptions { sheet: Some("Nope".into()), ..Default::default() };
        assert!(matches!(import(&path, &options), Err(IoError::Parse { .. })));
    }

    #[test]
    fn corrupt_workbook_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("painel.xlsx");
        std::fs::write(&path, b"PK\x03\x04not really a zip").unwrap();
        assert!(matches!(import(&path, &LoadOptions::default()), Err(IoError::Parse { .. })));
    }

    #[test]
    fn export_report_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("verificar.xlsx");

        let mut table = Table::new(vec!["cpf".into(), "nome".into(), "Status".into()]);
        table.push_row([CellValue::Number(111.0), CellValue::from("Ana"), CellValue::from("Name mismatch")]);
        export(&table, &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec![REPORT_SHEET.to_string()]);
        let range = workbook.worksheet_range(REPORT_SHEET).unwrap();
        assert_eq!(range.get((0, 2)), Some(&Data::String("Status".into())));
        assert_eq!(range.get((1, 0)), Some(&Data::Float(111.0)));
        assert_eq!(range.get((1, 2)), Some(&Data::String("Name mismatch".into())));
    }
}
