//! `valida rules` - inspect and check rules configs.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

use valida_recon::config::{DuplicatePolicy, LabelPreset, RulePreset};
use valida_recon::{Field, ReconConfig, Rule};

use crate::exit_codes::EXIT_ERROR;
use crate::CliError;

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Parse and validate a rules config without running
    #[command(after_help = "\
Examples:
  valida rules validate order.rules.toml")]
    Validate {
        /// Path to the .rules.toml file
        config: PathBuf,
    },

    /// Print the effective rules and parameters (built-in defaults when no file is given)
    #[command(after_help = "\
Examples:
  valida rules show
  valida rules show order.rules.toml --json
  valida rules show --toml > my.rules.toml")]
    Show {
        /// Path to the .rules.toml file
        config: Option<PathBuf>,

        /// Output JSON to stdout instead of a human summary
        #[arg(long, conflicts_with = "toml")]
        json: bool,

        /// Output the full config as TOML (a starting point for a new file)
        #[arg(long)]
        toml: bool,
    },
}

pub fn cmd_rules(cmd: RulesCommands) -> Result<(), CliError> {
    match cmd {
        RulesCommands::Validate { config } => cmd_rules_validate(&config),
        RulesCommands::Show { config, json, toml } => cmd_rules_show(config.as_deref(), json, toml),
    }
}

/// Read and validate a rules config. `None` means built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };

    let config_str = std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read rules config {}: {e}", path.display())))?;
    let config = ReconConfig::from_toml(&config_str).map_err(|e| {
        let mut err = CliError::from(e);
        err.message = format!("{}: {}", path.display(), err.message);
        err
    })?;

    tracing::info!(path = %path.display(), name = %config.name, "loaded rules config");
    Ok(config)
}

fn cmd_rules_validate(path: &Path) -> Result<(), CliError> {
    let config = load_config(Some(path))?;
    eprintln!(
        "valid: '{}' with {} rule(s), {} preset, {} labels",
        config.name,
        config.effective_rules().len(),
        preset_name(config.preset),
        labels_name(config.labels),
    );
    Ok(())
}

#[derive(Serialize)]
struct RulesOutput<'a> {
    name: &'a str,
    rules: Vec<Rule>,
    config: &'a ReconConfig,
}

fn cmd_rules_show(path: Option<&Path>, json: bool, as_toml: bool) -> Result<(), CliError> {
    let config = load_config(path)?;

    if as_toml {
        let body = config.to_toml()?;
        print!("{body}");
        return Ok(());
    }

    if json {
        let out = RulesOutput { name: &config.name, rules: config.effective_rules(), config: &config };
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    let source = path.map(|p| p.display().to_string()).unwrap_or_else(|| "built-in defaults".into());
    println!("rules config '{}' ({})", config.name, source);
    println!("  excluded_region:  {}", config.excluded_region);
    println!("  duplicate_policy: {}", policy_name(config.duplicate_policy));
    println!();
    println!("rules:");
    for rule in config.effective_rules() {
        println!("  {:<20} {}", rule.kind.to_string(), rule.label);
    }
    println!();
    println!("column synonyms:");
    for field in [Field::Identifier, Field::Name, Field::State, Field::OrderStatus] {
        println!("  {:<20} {}", field.to_string(), config.columns.synonyms(field).join(", "));
    }
    println!();
    println!("expected status:");
    println!("  {:<20} {}", "educapi", config.expected_status.source_a.join(", "));
    println!("  {:<20} {}", "comercial", config.expected_status.source_b.join(", "));
    Ok(())
}

fn preset_name(preset: RulePreset) -> &'static str {
    match preset {
        RulePreset::Canonical => "canonical",
        RulePreset::OrderStatus => "order_status",
    }
}

fn labels_name(labels: LabelPreset) -> &'static str {
    match labels {
        LabelPreset::English => "en",
        LabelPreset::Portuguese => "pt-BR",
    }
}

fn policy_name(policy: DuplicatePolicy) -> &'static str {
    match policy {
        DuplicatePolicy::Merge => "merge",
        DuplicatePolicy::LastWriteWins => "last_write_wins",
    }
}
