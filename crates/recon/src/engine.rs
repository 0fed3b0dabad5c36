use std::collections::{BTreeSet, HashMap};

use crate::config::{DuplicatePolicy, ReconConfig};
use crate::error::ReconError;
use crate::model::{InconsistencyRecord, Report, Row, Table, STATUS_COLUMN};
use crate::resolve::resolve_columns;
use crate::rules::{RowContext, RuleSet};
use crate::summary::compute_summary;

/// Cross-validate the reference table against both sources.
///
/// Pure function of its inputs: resolves the required columns, walks every
/// reference row in order, and returns at most one record per identifier.
/// Missing required columns abort the run before any row is looked at.
pub fn reconcile(
    reference: &Table,
    source_a: &Table,
    source_b: &Table,
    config: &ReconConfig,
) -> Result<Report, ReconError> {
    let (columns, warnings) = resolve_columns(reference, source_a, source_b, config)?;

    if reference.is_empty() {
        tracing::debug!("reference table is empty; nothing to check");
        return Ok(Report {
            columns: output_columns(reference),
            records: Vec::new(),
            summary: compute_summary(0, 0, &[]),
            resolution: columns,
            warnings,
        });
    }

    let rules = RuleSet::from_config(config);

    tracing::debug!(
        reference_rows = reference.len(),
        source_a_rows = source_a.len(),
        source_b_rows = source_b.len(),
        rules = rules.rules().len(),
        "starting reconciliation"
    );

    let mut records: Vec<InconsistencyRecord> = Vec::new();
    let mut by_identifier: HashMap<String, usize> = HashMap::new();
    let mut blank_identifiers = 0;

    for (idx, row) in reference.rows.iter().enumerate() {
        // A blank identifier is still an empty-string key; it only matches blank source rows.
        let identifier = row.text(&columns.reference.identifier).trim().to_string();
        if identifier.is_empty() {
            tracing::warn!(row = idx + 1, "reference row has no identifier");
            blank_identifiers += 1;
        }
        let name = row.text(&columns.reference.name).trim().to_string();

        let matches_a = find_matches(source_a, &columns.source_a.identifier, &identifier);
        let matches_b = find_matches(source_b, &columns.source_b.identifier, &identifier);

        let ctx = RowContext {
            reference: row,
            name: &name,
            source_a: &matches_a,
            source_b: &matches_b,
            columns: &columns,
        };

        let fired = rules.evaluate(&ctx);
        if fired.is_empty() {
            continue;
        }

        upsert(
            &mut records,
            &mut by_identifier,
            identifier,
            row,
            fired,
            config.duplicate_policy,
        );
    }

    let summary = compute_summary(reference.len(), blank_identifiers, &records);

    tracing::debug!(flagged = summary.flagged, blank_identifiers, "reconciliation finished");

    Ok(Report {
        columns: output_columns(reference),
        records,
        summary,
        resolution: columns,
        warnings,
    })
}

/// Every row of `table` whose identifier column, trimmed, equals `identifier`.
/// Linear scan; tables are a few thousand rows at most.
pub fn find_matches<'t>(table: &'t Table, identifier_column: &str, identifier: &str) -> Vec<&'t Row> {
    table
        .rows
        .iter()
        .filter(|r| r.text(identifier_column).trim() == identifier)
        .collect()
}

fn upsert(
    records: &mut Vec<InconsistencyRecord>,
    by_identifier: &mut HashMap<String, usize>,
    identifier: String,
    row: &Row,
    fired: BTreeSet<String>,
    policy: DuplicatePolicy,
) {
    if let Some(&pos) = by_identifier.get(&identifier) {
        tracing::debug!(%identifier, ?policy, "identifier repeated in reference table");
        let existing = &mut records[pos];
        existing.fields = row.clone();
        match policy {
            DuplicatePolicy::Merge => existing.add_labels(fired),
            DuplicatePolicy::LastWriteWins => existing.set_labels(fired),
        }
        return;
    }

    by_identifier.insert(identifier.clone(), records.len());
    records.push(InconsistencyRecord::new(identifier, row.clone(), fired));
}

fn output_columns(reference: &Table) -> Vec<String> {
    let mut columns = reference.columns.clone();
    if !columns.iter().any(|c| c == STATUS_COLUMN) {
        columns.push(STATUS_COLUMN.to_string());
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::from_raw_headers(headers);
        for r in rows {
            t.push_row(r.iter().copied());
        }
        t
    }

    #[test]
    fn find_matches_trims_both_sides() {
        let t = table(&["CPF", "Nome"], &[&[" 111 ", "Ana"], &["222", "Bob"], &["111", "Ana B"]]);
        let hits = find_matches(&t, "cpf", "111");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text("nome"), "Ana");
    }

    #[test]
    fn blank_identifier_row_is_still_checked() {
        let reference = table(&["CPF", "Nome"], &[&["", "Sem CPF"], &["333", "Cara"]]);
        let source = table(&["CPF", "Nome", "UF"], &[&["999", "Outro", "SP"]]);
        let report = reconcile(&reference, &source, &source, &ReconConfig::default()).unwrap();

        assert_eq!(report.summary.blank_identifiers, 1);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].identifier, "");
        assert_eq!(report.records[0].status, "Identifier not found");
        assert_eq!(report.records[0].fields.text("nome"), "Sem CPF");
        assert_eq!(report.records[1].identifier, "333");
    }

    #[test]
    fn blank_identifier_matches_blank_source_rows() {
        let reference = table(&["CPF", "Nome"], &[&["", "Sem CPF"]]);
        let source_a = table(&["CPF", "Nome", "UF"], &[&[" ", "Sem CPF", "MG"]]);
        let source_b = table(&["CPF", "Nome", "UF"], &[]);
        let report = reconcile(&reference, &source_a, &source_b, &ReconConfig::default()).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.summary.blank_identifiers, 1);
    }

    #[test]
    fn empty_reference_still_requires_columns() {
        let reference = table(&["id", "aluno"], &[]);
        let source = table(&["email"], &[]);
        let err = reconcile(&reference, &source, &source, &ReconConfig::default()).unwrap_err();
        match err {
            ReconError::MissingColumns(missing) => assert_eq!(missing.len(), 8),
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn status_column_not_duplicated() {
        let reference = Table::new(vec!["cpf".into(), "nome".into(), "Status".into()]);
        assert_eq!(output_columns(&reference), vec!["cpf", "nome", "Status"]);
    }

    #[test]
    fn merge_policy_unions_labels() {
        let reference = table(&["CPF", "Nome"], &[&["111", "Ana"], &["111", "Ana Maria"]]);
        let source_a = table(&["CPF", "Nome", "UF"], &[&["111", "Ana", "SP"]]);
        let source_b = table(&["CPF", "Nome", "UF"], &[]);

        let report = reconcile(&reference, &source_a, &source_b, &ReconConfig::default()).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].status, "Name mismatch, Wrong platform (source A)");
        assert_eq!(report.records[0].fields.text("nome"), "Ana Maria");
    }

    #[test]
    fn last_write_wins_policy_replaces_labels() {
        let reference = table(&["CPF", "Nome"], &[&["111", "Ana"], &["111", "Ana Maria"]]);
        let source_a = table(&["CPF", "Nome", "UF"], &[&["111", "Ana", "MG"]]);
        let source_b = table(&["CPF", "Nome", "UF"], &[]);

        let mut config = ReconConfig::default();
        config.duplicate_policy = DuplicatePolicy::LastWriteWins;
        let report = reconcile(&reference, &source_a, &source_b, &config).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].status, "Name mismatch");
    }

    #[test]
    fn quiet_duplicate_does_not_erase_record() {
        let reference = table(&["CPF", "Nome"], &[&["111", "Ana X"], &["111", "Ana"]]);
        let source_a = table(&["CPF", "Nome", "UF"], &[&["111", "Ana", "MG"]]);
        let source_b = table(&["CPF", "Nome", "UF"], &[]);

        let mut config = ReconConfig::default();
        config.duplicate_policy = DuplicatePolicy::LastWriteWins;
        let report = reconcile(&reference, &source_a, &source_b, &config).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].fields.text("nome"), "Ana X");
    }
}
