//! Inconsistency rules.
//!
//! Each rule is a `(kind, label)` pair evaluated independently against one
//! reference row and the rows that share its identifier in each source.
//! Attribute checks read the first match only.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{LabelPreset, ReconConfig};
use crate::model::Row;
use crate::resolve::{Field, ResolvedColumns, TableRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    PresentInBoth,
    NameMismatch,
    WrongPlatformA,
    WrongPlatformB,
    NotFound,
    StatusMismatchA,
    StatusMismatchB,
}

impl RuleKind {
    pub const CANONICAL: [RuleKind; 5] = [
        Self::PresentInBoth,
        Self::NameMismatch,
        Self::WrongPlatformA,
        Self::WrongPlatformB,
        Self::NotFound,
    ];

    pub const ALL: [RuleKind; 7] = [
        Self::PresentInBoth,
        Self::NameMismatch,
        Self::WrongPlatformA,
        Self::WrongPlatformB,
        Self::NotFound,
        Self::StatusMismatchA,
        Self::StatusMismatchB,
    ];

    pub fn default_label(&self, preset: LabelPreset) -> &'static str {
        match preset {
            LabelPreset::English => match self {
                Self::PresentInBoth => "Present in both sources",
                Self::NameMismatch => "Name mismatch",
                Self::WrongPlatformA => "Wrong platform (source A)",
                Self::WrongPlatformB => "Wrong platform (source B)",
                Self::NotFound => "Identifier not found",
                Self::StatusMismatchA => "Status incorrect (source A)",
                Self::StatusMismatchB => "Status incorrect (source B)",
            },
            // Staff-facing wording; both platform rules share one label.
            LabelPreset::Portuguese => match self {
                Self::PresentInBoth => "CPF presente em ambas as bases",
                Self::NameMismatch => "Nome cadastrado não bate no Painel",
                Self::WrongPlatformA | Self::WrongPlatformB => "Cadastro em plataforma errada",
                Self::NotFound => "CPF não encontrado",
                Self::StatusMismatchA => "Status do pedido incorreto (Educapi)",
                Self::StatusMismatchB => "Status do pedido incorreto (Comercial)",
            },
        }
    }

    /// A column this rule needs beyond the baseline identifier/name/state.
    pub fn required_field(&self) -> Option<(TableRole, Field)> {
        match self {
            Self::StatusMismatchA => Some((TableRole::SourceA, Field::OrderStatus)),
            Self::StatusMismatchB => Some((TableRole::SourceB, Field::OrderStatus)),
            _ => None,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PresentInBoth => write!(f, "present_in_both"),
            Self::NameMismatch => write!(f, "name_mismatch"),
            Self::WrongPlatformA => write!(f, "wrong_platform_a"),
            Self::WrongPlatformB => write!(f, "wrong_platform_b"),
            Self::NotFound => write!(f, "not_found"),
            Self::StatusMismatchA => write!(f, "status_mismatch_a"),
            Self::StatusMismatchB => write!(f, "status_mismatch_b"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub kind: RuleKind,
    pub label: String,
}

impl Rule {
    pub fn new(kind: RuleKind, label: impl Into<String>) -> Self {
        Self { kind, label: label.into() }
    }
}

/// Everything a rule may look at for one reference row.
pub struct RowContext<'a> {
    pub reference: &'a Row,
    /// Trimmed reference name.
    pub name: &'a str,
    pub source_a: &'a [&'a Row],
    pub source_b: &'a [&'a Row],
    pub columns: &'a ResolvedColumns,
}

/// Rules plus the parameters they compare against, normalized once per run.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    /// Upper-cased.
    excluded_region: String,
    /// Lower-cased, trimmed.
    expected_status_a: Vec<String>,
    expected_status_b: Vec<String>,
}

impl RuleSet {
    pub fn from_config(config: &ReconConfig) -> Self {
        let lower = |values: &[String]| -> Vec<String> {
            values
                .iter()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect()
        };

        Self {
            rules: config.effective_rules(),
            excluded_region: config.excluded_region.trim().to_uppercase(),
            expected_status_a: lower(&config.expected_status.source_a),
            expected_status_b: lower(&config.expected_status.source_b),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Labels of every rule that fires for this row.
    pub fn evaluate(&self, ctx: &RowContext<'_>) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|rule| self.fires(rule.kind, ctx))
            .map(|rule| rule.label.clone())
            .collect()
    }

    pub fn fires(&self, kind: RuleKind, ctx: &RowContext<'_>) -> bool {
        let first_a = ctx.source_a.first().copied();
        let first_b = ctx.source_b.first().copied();

        match kind {
            RuleKind::PresentInBoth => first_a.is_some() && first_b.is_some(),
            RuleKind::NameMismatch => {
                let a = first_a.is_some_and(|row| name_differs(row, &ctx.columns.source_a.name, ctx.name));
                let b = first_b.is_some_and(|row| name_differs(row, &ctx.columns.source_b.name, ctx.name));
                a || b
            }
            RuleKind::WrongPlatformA => first_a.is_some_and(|row| {
                self.in_excluded_region(row, ctx.columns.source_a.state.as_deref())
            }),
            RuleKind::WrongPlatformB => first_b.is_some_and(|row| {
                !self.in_excluded_region(row, ctx.columns.source_b.state.as_deref())
            }),
            RuleKind::NotFound => first_a.is_none() && first_b.is_none(),
            RuleKind::StatusMismatchA => first_a.is_some_and(|row| {
                status_unexpected(row, ctx.columns.source_a.order_status.as_deref(), &self.expected_status_a)
            }),
            RuleKind::StatusMismatchB => first_b.is_some_and(|row| {
                status_unexpected(row, ctx.columns.source_b.order_status.as_deref(), &self.expected_status_b)
            }),
        }
    }

    fn in_excluded_region(&self, row: &Row, state_column: Option<&str>) -> bool {
        row.text_opt(state_column)
            .trim()
            .to_uppercase()
            .contains(&self.excluded_region)
    }
}

fn name_differs(row: &Row, name_column: &str, reference_name: &str) -> bool {
    row.text(name_column).trim().to_lowercase() != reference_name.to_lowercase()
}

fn status_unexpected(row: &Row, status_column: Option<&str>, expected: &[String]) -> bool {
    let status = row.text_opt(status_column).trim().to_lowercase();
    !expected.iter().any(|e| *e == status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulePreset;
    use crate::resolve::TableColumns;

    fn columns() -> ResolvedColumns {
        let source = || TableColumns {
            identifier: "cpf".into(),
            name: "nome".into(),
            state: Some("uf".into()),
            order_status: Some("status".into()),
        };
        ResolvedColumns {
            reference: TableColumns {
                identifier: "cpf".into(),
                name: "nome".into(),
                state: None,
                order_status: None,
            },
            source_a: source(),
            source_b: source(),
        }
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        let mut r = Row::new();
        for (k, v) in pairs {
            r.insert(*k, *v);
        }
        r
    }

    fn fired(config: &ReconConfig, name: &str, a: &[&Row], b: &[&Row]) -> Vec<String> {
        let rules = RuleSet::from_config(config);
        let cols = columns();
        let reference = row(&[("cpf", "1"), ("nome", name)]);
        let ctx = RowContext {
            reference: &reference,
            name,
            source_a: a,
            source_b: b,
            columns: &cols,
        };
        rules.evaluate(&ctx).into_iter().collect()
    }

    #[test]
    fn not_found_is_exclusive() {
        let labels = fired(&ReconConfig::default(), "Cara", &[], &[]);
        assert_eq!(labels, vec!["Identifier not found"]);
    }

    #[test]
    fn name_compare_ignores_case_and_padding() {
        let a = row(&[("cpf", "1"), ("nome", "  ANA SILVA "), ("uf", "MG")]);
        let labels = fired(&ReconConfig::default(), "ana silva", &[&a], &[]);
        assert!(labels.is_empty(), "got {labels:?}");
    }

    #[test]
    fn name_mismatch_in_either_source_yields_one_label() {
        let a = row(&[("nome", "Roberto"), ("uf", "MG")]);
        let b = row(&[("nome", "Robert"), ("uf", "SP")]);
        let labels = fired(&ReconConfig::default(), "Bob", &[&a], &[&b]);
        assert_eq!(labels, vec!["Name mismatch", "Present in both sources"]);
    }

    #[test]
    fn platform_rules_use_marker_substring() {
        let a = row(&[("nome", "Ana"), ("uf", "sp - capital")]);
        assert_eq!(
            fired(&ReconConfig::default(), "Ana", &[&a], &[]),
            vec!["Wrong platform (source A)"]
        );

        let b = row(&[("nome", "Ana"), ("uf", "RJ")]);
        assert_eq!(
            fired(&ReconConfig::default(), "Ana", &[], &[&b]),
            vec!["Wrong platform (source B)"]
        );

        let b_sp = row(&[("nome", "Ana"), ("uf", "SP")]);
        assert!(fired(&ReconConfig::default(), "Ana", &[], &[&b_sp]).is_empty());
    }

    #[test]
    fn missing_state_counts_as_outside_marker() {
        let b = row(&[("nome", "Ana")]);
        assert_eq!(
            fired(&ReconConfig::default(), "Ana", &[], &[&b]),
            vec!["Wrong platform (source B)"]
        );
    }

    #[test]
    fn only_first_match_is_inspected() {
        let first = row(&[("nome", "Ana"), ("uf", "MG")]);
        let second = row(&[("nome", "Someone Else"), ("uf", "SP")]);
        assert!(fired(&ReconConfig::default(), "Ana", &[&first, &second], &[]).is_empty());
    }

    #[test]
    fn order_status_rules() {
        let mut config = ReconConfig::default();
        config.preset = RulePreset::OrderStatus;

        let a = row(&[("nome", "Ana"), ("uf", "MG"), ("status", " Ativo ")]);
        let b = row(&[("nome", "Ana"), ("uf", "SP"), ("status", "Cancelado")]);
        let labels = fired(&config, "Ana", &[&a], &[&b]);
        assert_eq!(
            labels,
            vec!["Present in both sources", "Status incorrect (source B)"]
        );
    }

    #[test]
    fn portuguese_platform_labels_collapse() {
        let mut config = ReconConfig::default();
        config.labels = LabelPreset::Portuguese;
        let a = row(&[("nome", "Ana"), ("uf", "SP")]);
        let b = row(&[("nome", "Ana"), ("uf", "RJ")]);
        let labels = fired(&config, "Ana", &[&a], &[&b]);
        assert_eq!(
            labels,
            vec!["CPF presente em ambas as bases", "Cadastro em plataforma errada"]
        );
    }
}
