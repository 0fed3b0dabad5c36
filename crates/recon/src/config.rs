use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::resolve::Field;
use crate::rules::{Rule, RuleKind};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Rule set used when `rules` is empty.
    #[serde(default)]
    pub preset: RulePreset,
    /// Default label language for rules without an explicit label.
    #[serde(default)]
    pub labels: LabelPreset,
    /// State code marking a student as belonging to source B's platform.
    #[serde(default = "default_excluded_region")]
    pub excluded_region: String,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default)]
    pub columns: ColumnSynonyms,
    #[serde(default)]
    pub expected_status: ExpectedStatus,
    /// Explicit rule list. Overrides `preset` when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
}

fn default_name() -> String {
    "valida-matricula".into()
}

fn default_excluded_region() -> String {
    "SP".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            preset: RulePreset::default(),
            labels: LabelPreset::default(),
            excluded_region: default_excluded_region(),
            duplicate_policy: DuplicatePolicy::default(),
            columns: ColumnSynonyms::default(),
            expected_status: ExpectedStatus::default(),
            rules: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Presets + policies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePreset {
    /// Present in both, name mismatch, wrong platform A/B, not found.
    #[default]
    Canonical,
    /// Canonical plus the per-source order status checks.
    OrderStatus,
}

impl RulePreset {
    pub fn kinds(&self) -> &'static [RuleKind] {
        match self {
            Self::Canonical => &RuleKind::CANONICAL,
            Self::OrderStatus => &RuleKind::ALL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelPreset {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "pt-BR")]
    Portuguese,
}

/// What happens when the reference table repeats an identifier and more
/// than one of its rows fires rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Union the labels; fields come from the latest firing row.
    #[default]
    Merge,
    /// The latest firing row replaces the record, labels included.
    LastWriteWins,
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Prioritized synonym tokens per semantic field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnSynonyms {
    pub identifier: Vec<String>,
    pub name: Vec<String>,
    pub state: Vec<String>,
    pub order_status: Vec<String>,
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        let v = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            identifier: v(&["cpf"]),
            name: v(&["nome"]),
            state: v(&["estado", "uf"]),
            order_status: v(&["status", "situação", "situacao"]),
        }
    }
}

impl ColumnSynonyms {
    pub fn synonyms(&self, field: Field) -> &[String] {
        match field {
            Field::Identifier => &self.identifier,
            Field::Name => &self.name,
            Field::State => &self.state,
            Field::OrderStatus => &self.order_status,
        }
    }
}

// ---------------------------------------------------------------------------
// Order status
// ---------------------------------------------------------------------------

/// Accepted order status values per source, compared trimmed and case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpectedStatus {
    pub source_a: Vec<String>,
    pub source_b: Vec<String>,
}

impl Default for ExpectedStatus {
    fn default() -> Self {
        Self {
            source_a: vec!["ativo".into()],
            source_b: vec!["aprovado".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    /// The rules this config evaluates, labels filled in from the preset.
    pub fn effective_rules(&self) -> Vec<Rule> {
        if self.rules.is_empty() {
            return self
                .preset
                .kinds()
                .iter()
                .map(|&kind| Rule::new(kind, kind.default_label(self.labels)))
                .collect();
        }

        self.rules
            .iter()
            .map(|r| {
                let label = r
                    .label
                    .clone()
                    .unwrap_or_else(|| r.kind.default_label(self.labels).to_string());
                Rule::new(r.kind, label)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.excluded_region.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "excluded_region must not be empty".into(),
            ));
        }

        for field in [Field::Identifier, Field::Name, Field::State, Field::OrderStatus] {
            let synonyms = self.columns.synonyms(field);
            if synonyms.iter().all(|s| s.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "columns.{field} needs at least one non-empty synonym"
                )));
            }
        }

        let mut seen = Vec::new();
        for rule in &self.rules {
            if seen.contains(&rule.kind) {
                return Err(ReconError::ConfigValidation(format!(
                    "rule '{}' listed more than once",
                    rule.kind
                )));
            }
            seen.push(rule.kind);

            if let Some(ref label) = rule.label {
                if label.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "rule '{}' has an empty label",
                        rule.kind
                    )));
                }
            }
        }

        for rule in self.effective_rules() {
            let expected = match rule.kind {
                RuleKind::StatusMismatchA => Some(("source_a", &self.expected_status.source_a)),
                RuleKind::StatusMismatchB => Some(("source_b", &self.expected_status.source_b)),
                _ => None,
            };
            if let Some((source, values)) = expected {
                if values.iter().all(|v| v.trim().is_empty()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "rule '{}' needs expected_status.{source}",
                        rule.kind
                    )));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
