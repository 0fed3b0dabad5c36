use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::resolve::{ResolutionWarning, ResolvedColumns};

/// Name of the synthesized column carrying the joined rule labels.
pub const STATUS_COLUMN: &str = "Status";

// ---------------------------------------------------------------------------
// Cells + rows
// ---------------------------------------------------------------------------

/// A single cell as handed over by the parsing side.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Display text. Integral numbers render without decimals so that a CPF
    /// stored as a float in a spreadsheet compares as its digits.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// One row: normalized column name -> value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Row {
    cells: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Cell text, or an empty string when the column or value is missing.
    pub fn text(&self, column: &str) -> String {
        self.cells.get(column).map(CellValue::as_text).unwrap_or_default()
    }

    /// Same as [`Row::text`] for an optionally resolved column.
    pub fn text_opt(&self, column: Option<&str>) -> String {
        column.map(|c| self.text(c)).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An ordered sequence of rows sharing one column list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Table with columns taken verbatim.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Table whose raw header cells are normalized with [`normalize_headers`].
    pub fn from_raw_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        Self::new(normalize_headers(headers))
    }

    /// Append a row positionally. Values beyond the column list are dropped;
    /// missing trailing values stay absent (read back as empty).
    pub fn push_row<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut row = Row::new();
        for (column, value) in self.columns.iter().zip(values) {
            let value = value.into();
            if !matches!(value, CellValue::Empty) {
                row.insert(column.clone(), value);
            }
        }
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Trim + lower-case a header cell.
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize a header row. Blank headers become `column_N` (1-indexed
/// position); repeated names get a `_2`, `_3`... suffix so every column stays
/// addressable.
pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut out = Vec::with_capacity(raw.len());

    for (i, h) in raw.iter().enumerate() {
        let mut name = normalize_column_name(h.as_ref());
        if name.is_empty() {
            name = format!("column_{}", i + 1);
        }
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            name = format!("{name}_{count}");
        }
        out.push(name);
    }

    out
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A flagged reference row plus the labels of every rule that fired for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InconsistencyRecord {
    pub identifier: String,
    pub status: String,
    pub labels: BTreeSet<String>,
    pub fields: Row,
}

impl InconsistencyRecord {
    pub fn new(identifier: String, fields: Row, labels: BTreeSet<String>) -> Self {
        let status = join_labels(&labels);
        Self { identifier, status, labels, fields }
    }

    /// Replace the label set, keeping `status` in sync.
    pub fn set_labels(&mut self, labels: BTreeSet<String>) {
        self.status = join_labels(&labels);
        self.labels = labels;
    }

    pub fn add_labels(&mut self, labels: BTreeSet<String>) {
        self.labels.extend(labels);
        self.status = join_labels(&self.labels);
    }
}

/// Sorted, deduplicated, comma-joined. The set already guarantees both.
pub fn join_labels(labels: &BTreeSet<String>) -> String {
    labels.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReconSummary {
    pub reference_rows: usize,
    /// Reference rows with a blank identifier. They are still checked.
    pub blank_identifiers: usize,
    pub flagged: usize,
    pub label_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Reference columns followed by [`STATUS_COLUMN`].
    pub columns: Vec<String>,
    pub records: Vec<InconsistencyRecord>,
    pub summary: ReconSummary,
    pub resolution: ResolvedColumns,
    pub warnings: Vec<ResolutionWarning>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flatten into a plain table for the export side.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(self.columns.clone());
        for record in &self.records {
            let mut row = record.fields.clone();
            row.insert(STATUS_COLUMN, record.status.clone());
            table.rows.push(row);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::TableColumns;

    #[test]
    fn integral_numbers_render_as_digits() {
        assert_eq!(CellValue::Number(12345678901.0).as_text(), "12345678901");
        assert_eq!(CellValue::Number(2.5).as_text(), "2.5");
        assert_eq!(CellValue::Empty.as_text(), "");
    }

    #[test]
    fn headers_are_trimmed_and_lowercased() {
        let cols = normalize_headers(&["  Estado ", "CPF Aluno", "Nome Completo"]);
        assert_eq!(cols, vec!["estado", "cpf aluno", "nome completo"]);
    }

    #[test]
    fn blank_and_duplicate_headers_get_unique_names() {
        let cols = normalize_headers(&["Nome", "", "nome", "NOME"]);
        assert_eq!(cols, vec!["nome", "column_2", "nome_2", "nome_3"]);
    }

    #[test]
    fn push_row_reads_missing_cells_as_empty() {
        let mut table = Table::from_raw_headers(&["CPF", "Nome", "UF"]);
        table.push_row(["111", "Ana"]);
        let row = &table.rows[0];
        assert_eq!(row.text("cpf"), "111");
        assert_eq!(row.text("uf"), "");
        assert_eq!(row.text("does not exist"), "");
        assert_eq!(row.text_opt(None), "");
    }

    #[test]
    fn labels_join_sorted() {
        let labels: BTreeSet<String> =
            ["Name mismatch", "Identifier not found", "Name mismatch"].iter().map(|s| s.to_string()).collect();
        assert_eq!(join_labels(&labels), "Identifier not found, Name mismatch");
    }

    #[test]
    fn report_table_appends_status() {
        let mut fields = Row::new();
        fields.insert("cpf", "111");
        let record = InconsistencyRecord::new(
            "111".into(),
            fields,
            ["Identifier not found".to_string()].into_iter().collect(),
        );
        let columns = TableColumns {
            identifier: "cpf".into(),
            name: "nome".into(),
            state: None,
            order_status: None,
        };
        let report = Report {
            columns: vec!["cpf".into(), STATUS_COLUMN.into()],
            records: vec![record],
            summary: ReconSummary::default(),
            resolution: ResolvedColumns {
                reference: columns.clone(),
                source_a: columns.clone(),
                source_b: columns,
            },
            warnings: vec![],
        };
        let table = report.to_table();
        assert_eq!(table.columns, vec!["cpf", "Status"]);
        assert_eq!(table.rows[0].text("Status"), "Identifier not found");
    }

    #[test]
    fn cells_serialize_untagged() {
        let mut row = Row::new();
        row.insert("cpf", CellValue::Number(111.0));
        row.insert("nome", "Ana");
        row.insert("uf", CellValue::Empty);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!({"cpf": 111.0, "nome": "Ana", "uf": null}));
    }
}
