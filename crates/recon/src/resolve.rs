//! Column resolution: map semantic fields onto loosely named spreadsheet headers.
//!
//! A column matches a synonym when its normalized name contains the synonym
//! as a substring ("cpf" matches "número de cpf"). Synonyms are tried in
//! priority order; within one synonym the first column in table order wins.
//! Extra candidates for the winning synonym are reported as warnings, never
//! as errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::model::{normalize_column_name, Table};

// ---------------------------------------------------------------------------
// Fields + tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Identifier,
    Name,
    State,
    OrderStatus,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier => write!(f, "identifier"),
            Self::Name => write!(f, "name"),
            Self::State => write!(f, "state"),
            Self::OrderStatus => write!(f, "order_status"),
        }
    }
}

/// Which of the three inputs a table plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    /// The panel export; drives the loop.
    Reference,
    /// Learning platform export (educapi).
    SourceA,
    /// Commercial export.
    SourceB,
}

impl TableRole {
    pub const ALL: [TableRole; 3] = [Self::Reference, Self::SourceA, Self::SourceB];

    /// The base name staff use for this table.
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Reference => "painel",
            Self::SourceA => "educapi",
            Self::SourceB => "comercial",
        }
    }
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

// ---------------------------------------------------------------------------
// Single-column resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub column: String,
    /// The synonym that matched, normalized.
    pub synonym: String,
    /// Other columns that also contain `synonym`, in table order.
    pub others: Vec<String>,
}

/// Resolve one semantic field in `table`. `None` when no column matches.
pub fn resolve(table: &Table, synonyms: &[String]) -> Option<String> {
    resolve_in(&table.columns, synonyms).map(|r| r.column)
}

/// Resolve against a bare column list, keeping ambiguity details.
pub fn resolve_in(columns: &[String], synonyms: &[String]) -> Option<Resolution> {
    for synonym in synonyms {
        let token = normalize_column_name(synonym);
        if token.is_empty() {
            continue;
        }

        let mut hits: Vec<String> = columns
            .iter()
            .filter(|c| normalize_column_name(c).contains(&token))
            .cloned()
            .collect();

        if !hits.is_empty() {
            let column = hits.remove(0);
            return Some(Resolution { column, synonym: token, others: hits });
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Whole-run resolution
// ---------------------------------------------------------------------------

/// Resolved column names for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumns {
    pub identifier: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<String>,
}

impl TableColumns {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Identifier => Some(&self.identifier),
            Field::Name => Some(&self.name),
            Field::State => self.state.as_deref(),
            Field::OrderStatus => self.order_status.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumns {
    pub reference: TableColumns,
    pub source_a: TableColumns,
    pub source_b: TableColumns,
}

impl ResolvedColumns {
    pub fn table(&self, role: TableRole) -> &TableColumns {
        match role {
            TableRole::Reference => &self.reference,
            TableRole::SourceA => &self.source_a,
            TableRole::SourceB => &self.source_b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingColumn {
    pub table: TableRole,
    pub field: Field,
    pub synonyms: Vec<String>,
}

impl fmt::Display for MissingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has no {} column (tried: {})", self.table, self.field, self.synonyms.join(", "))
    }
}

/// More than one column matched the winning synonym.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionWarning {
    pub table: TableRole,
    pub field: Field,
    pub chosen: String,
    pub candidates: Vec<String>,
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} resolved to '{}' but '{}' also matched",
            self.table,
            self.field,
            self.chosen,
            self.candidates.join("', '"),
        )
    }
}

/// Fields a table must provide for the configured rules to run.
pub fn required_fields(role: TableRole, config: &ReconConfig) -> Vec<Field> {
    let mut fields = vec![Field::Identifier, Field::Name];
    if role != TableRole::Reference {
        fields.push(Field::State);
    }
    for rule in config.effective_rules() {
        if let Some((table, field)) = rule.kind.required_field() {
            if table == role && !fields.contains(&field) {
                fields.push(field);
            }
        }
    }
    fields
}

/// Resolve every required field in all three tables. Any unresolved field
/// fails the whole run with one error listing all of them.
pub fn resolve_columns(
    reference: &Table,
    source_a: &Table,
    source_b: &Table,
    config: &ReconConfig,
) -> Result<(ResolvedColumns, Vec<ResolutionWarning>), ReconError> {
    let mut missing = Vec::new();
    let mut warnings = Vec::new();

    let reference_cols = resolve_table(TableRole::Reference, reference, config, &mut missing, &mut warnings);
    let source_a_cols = resolve_table(TableRole::SourceA, source_a, config, &mut missing, &mut warnings);
    let source_b_cols = resolve_table(TableRole::SourceB, source_b, config, &mut missing, &mut warnings);

    match (reference_cols, source_a_cols, source_b_cols) {
        (Some(reference), Some(source_a), Some(source_b)) if missing.is_empty() => {
            for w in &warnings {
                tracing::warn!(table = %w.table, field = %w.field, "{w}");
            }
            Ok((ResolvedColumns { reference, source_a, source_b }, warnings))
        }
        _ => Err(ReconError::MissingColumns(missing)),
    }
}

fn resolve_table(
    role: TableRole,
    table: &Table,
    config: &ReconConfig,
    missing: &mut Vec<MissingColumn>,
    warnings: &mut Vec<ResolutionWarning>,
) -> Option<TableColumns> {
    let required = required_fields(role, config);

    let mut lookup = |field: Field| -> Option<String> {
        let synonyms = config.columns.synonyms(field);
        match resolve_in(&table.columns, synonyms) {
            Some(r) => {
                tracing::debug!(table = %role, %field, column = %r.column, "resolved column");
                if !r.others.is_empty() {
                    warnings.push(ResolutionWarning {
                        table: role,
                        field,
                        chosen: r.column.clone(),
                        candidates: r.others,
                    });
                }
                Some(r.column)
            }
            None => {
                missing.push(MissingColumn {
                    table: role,
                    field,
                    synonyms: synonyms.to_vec(),
                });
                None
            }
        }
    };

    let mut identifier = None;
    let mut name = None;
    let mut state = None;
    let mut order_status = None;

    for field in required {
        let column = lookup(field);
        match field {
            Field::Identifier => identifier = column,
            Field::Name => name = column,
            Field::State => state = column,
            Field::OrderStatus => order_status = column,
        }
    }

    Some(TableColumns {
        identifier: identifier?,
        name: name?,
        state,
        order_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReconConfig, RulePreset};

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn syn(names: &[&str]) -> Vec<String> {
        cols(names)
    }

    #[test]
    fn substring_match_on_normalized_headers() {
        let table = Table::from_raw_headers(&["Estado", "CPF Aluno", "Nome Completo"]);
        assert_eq!(resolve(&table, &syn(&["cpf"])).as_deref(), Some("cpf aluno"));
        assert_eq!(resolve(&table, &syn(&["nome"])).as_deref(), Some("nome completo"));
        assert_eq!(resolve(&table, &syn(&["estado", "uf"])).as_deref(), Some("estado"));
    }

    #[test]
    fn synonyms_tried_in_priority_order() {
        let columns = cols(&["uf", "estado de origem"]);
        let r = resolve_in(&columns, &syn(&["estado", "uf"])).unwrap();
        assert_eq!(r.column, "estado de origem");
        assert_eq!(r.synonym, "estado");

        let r = resolve_in(&cols(&["uf"]), &syn(&["estado", "uf"])).unwrap();
        assert_eq!(r.column, "uf");
    }

    #[test]
    fn not_found_is_none() {
        assert!(resolve_in(&cols(&["email", "telefone"]), &syn(&["cpf"])).is_none());
        assert!(resolve_in(&cols(&["cpf"]), &syn(&["", "   "])).is_none());
    }

    #[test]
    fn ambiguity_keeps_first_and_lists_others() {
        let columns = cols(&["nome do aluno", "nome da mãe", "cpf"]);
        let r = resolve_in(&columns, &syn(&["nome"])).unwrap();
        assert_eq!(r.column, "nome do aluno");
        assert_eq!(r.others, vec!["nome da mãe"]);
    }

    #[test]
    fn resolve_columns_reports_every_missing_field() {
        let reference = Table::from_raw_headers(&["CPF"]);
        let source_a = Table::from_raw_headers(&["CPF", "Nome"]);
        let source_b = Table::from_raw_headers(&["Nome", "UF"]);
        let err = resolve_columns(&reference, &source_a, &source_b, &ReconConfig::default()).unwrap_err();

        match err {
            ReconError::MissingColumns(missing) => {
                let pairs: Vec<(TableRole, Field)> = missing.iter().map(|m| (m.table, m.field)).collect();
                assert_eq!(
                    pairs,
                    vec![
                        (TableRole::Reference, Field::Name),
                        (TableRole::SourceA, Field::State),
                        (TableRole::SourceB, Field::Identifier),
                    ]
                );
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn order_status_required_only_when_rule_enabled() {
        let reference = Table::from_raw_headers(&["CPF", "Nome"]);
        let source = Table::from_raw_headers(&["CPF", "Nome", "UF"]);

        let canonical = ReconConfig::default();
        assert!(resolve_columns(&reference, &source, &source, &canonical).is_ok());

        let mut order = ReconConfig::default();
        order.preset = RulePreset::OrderStatus;
        let err = resolve_columns(&reference, &source, &source, &order).unwrap_err();
        assert!(err.to_string().contains("order_status"), "got: {err}");
    }

    #[test]
    fn warnings_surface_ambiguous_columns() {
        let reference = Table::from_raw_headers(&["CPF", "Nome do Aluno", "Nome Social"]);
        let source = Table::from_raw_headers(&["CPF", "Nome", "UF"]);
        let (resolved, warnings) =
            resolve_columns(&reference, &source, &source, &ReconConfig::default()).unwrap();

        assert_eq!(resolved.reference.name, "nome do aluno");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].table, TableRole::Reference);
        assert_eq!(warnings[0].candidates, vec!["nome social"]);
    }
}
