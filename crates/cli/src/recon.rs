//! `valida run` and `valida columns`.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::Serialize;

use valida_config::{parse_delimiter, Settings};
use valida_io::{identify_bases_with, load_table, role_for, BaseFiles, ExportFormat, IoError, LoadOptions};
use valida_recon::error::ReconError;
use valida_recon::resolve::{required_fields, resolve_in, MissingColumn};
use valida_recon::{reconcile, Field, Table, TableRole};

use crate::exit_codes::{EXIT_ERROR, EXIT_INCONSISTENCIES};
use crate::report::{print_summary, write_report, OutFormat, ReportEnvelope};
use crate::rules::load_config;
use crate::CliError;

/// Parsing options shared by commands that read input files.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// 1-indexed header row; rows above it are skipped [default: 2]
    #[arg(long, value_name = "N")]
    header_row: Option<usize>,

    /// CSV field delimiter: ';' ',' '|' or 'tab' [default: sniffed]
    #[arg(long, value_name = "CHAR")]
    delimiter: Option<String>,

    /// Worksheet to read from Excel inputs [default: first sheet]
    #[arg(long)]
    sheet: Option<String>,
}

impl InputArgs {
    /// Flags over settings over built-in defaults.
    fn load_options(&self, settings: &Settings) -> Result<LoadOptions, CliError> {
        let header_row = self.header_row.unwrap_or(settings.input.header_row);
        if header_row == 0 {
            return Err(CliError::usage("--header-row is 1-indexed"));
        }

        let delimiter = match &self.delimiter {
            Some(d) => Some(
                parse_delimiter(d)
                    .ok_or_else(|| CliError::usage(format!("invalid --delimiter {d:?}")))?,
            ),
            None => settings.input.delimiter_byte(),
        };

        Ok(LoadOptions {
            header_row,
            delimiter,
            sheet: self.sheet.clone().or_else(|| settings.input.sheet.clone()),
        })
    }
}

// ============================================================================
// run
// ============================================================================

#[derive(Args)]
pub struct RunArgs {
    /// Input files; roles come from names containing painel, educapi, comercial
    files: Vec<PathBuf>,

    /// Reference (panel) export
    #[arg(long, value_name = "FILE")]
    painel: Option<PathBuf>,

    /// Learning platform export
    #[arg(long, value_name = "FILE")]
    educapi: Option<PathBuf>,

    /// Sales platform export
    #[arg(long, value_name = "FILE")]
    comercial: Option<PathBuf>,

    /// Rules config (.rules.toml) [default: settings rules_file, else built-in]
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    input: InputArgs,

    /// Report format [default: settings output.format, else csv]
    #[arg(long, value_enum)]
    out: Option<OutFormat>,

    /// Report path [default: verificar.<ext>]
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also print the JSON report to stdout
    #[arg(long)]
    json: bool,

    /// Write the report file even when nothing was flagged
    #[arg(long)]
    write_empty: bool,

    /// Exit 0 even when inconsistencies are found
    #[arg(long)]
    no_fail: bool,
}

pub fn cmd_run(args: RunArgs, settings: &Settings) -> Result<(), CliError> {
    let config_path = args.config.clone().or_else(|| settings.rules_file.clone());
    let config = load_config(config_path.as_deref())?;
    let options = args.input.load_options(settings)?;

    let bases = identify_bases_with(
        &args.files,
        [args.painel.clone(), args.educapi.clone(), args.comercial.clone()],
    )?;

    let (reference, source_a, source_b) = load_bases(&bases, &options)?;

    let report = reconcile(&reference, &source_a, &source_b, &config)?;
    let envelope = ReportEnvelope::new(&report, &config.name, &bases);

    print_summary(&report);

    let format: ExportFormat = args.out.map(Into::into).unwrap_or(settings.output.format);
    let write_empty = args.write_empty || settings.output.write_empty;

    if report.is_empty() && !write_empty {
        eprintln!("no inconsistencies found");
    } else {
        let path = args.output.clone().unwrap_or_else(|| settings.output.report_path(format));
        write_report(&report, &envelope, format, &path)?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        let json_str = serde_json::to_string_pretty(&envelope)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    if !report.is_empty() && !args.no_fail {
        return Err(CliError::new(
            EXIT_INCONSISTENCIES,
            format!("{} inconsistenc{} found", report.records.len(), if report.records.len() == 1 { "y" } else { "ies" }),
        ));
    }

    Ok(())
}

/// Load all three bases before failing, so every broken file is reported in
/// one run. The first failing base decides the exit code and hint.
fn load_bases(bases: &BaseFiles, options: &LoadOptions) -> Result<(Table, Table, Table), CliError> {
    let [reference, source_a, source_b] =
        [&bases.painel, &bases.educapi, &bases.comercial].map(|path| load_table(path, options));

    match (reference, source_a, source_b) {
        (Ok(reference), Ok(source_a), Ok(source_b)) => Ok((reference, source_a, source_b)),
        (reference, source_a, source_b) => {
            let mut errors: Vec<IoError> =
                [reference.err(), source_a.err(), source_b.err()].into_iter().flatten().collect();
            if errors.len() > 1 {
                for err in &errors {
                    eprintln!("error: {err}");
                }
            }
            let count = errors.len();
            let mut first = CliError::from(errors.remove(0));
            if count > 1 {
                first.message = format!("{count} base files could not be loaded");
            }
            Err(first)
        }
    }
}

// ============================================================================
// columns
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Painel,
    Educapi,
    Comercial,
}

impl From<RoleArg> for TableRole {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Painel => TableRole::Reference,
            RoleArg::Educapi => TableRole::SourceA,
            RoleArg::Comercial => TableRole::SourceB,
        }
    }
}

#[derive(Args)]
pub struct ColumnsArgs {
    /// Input file to inspect
    file: PathBuf,

    /// Which base the file is [default: guessed from the file name]
    #[arg(long, value_enum)]
    role: Option<RoleArg>,

    /// Rules config whose synonyms to resolve with
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    input: InputArgs,

    /// Output JSON to stdout instead of a human summary
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ColumnsOutput {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<TableRole>,
    rows: usize,
    columns: Vec<String>,
    fields: Vec<FieldOutput>,
}

#[derive(Serialize)]
struct FieldOutput {
    field: Field,
    required: bool,
    column: Option<String>,
    synonym: Option<String>,
    also_matched: Vec<String>,
}

pub fn cmd_columns(args: ColumnsArgs, settings: &Settings) -> Result<(), CliError> {
    let config_path = args.config.clone().or_else(|| settings.rules_file.clone());
    let config = load_config(config_path.as_deref())?;
    let options = args.input.load_options(settings)?;

    let table = load_table(&args.file, &options)?;
    let role: Option<TableRole> = args.role.map(Into::into).or_else(|| role_for(&args.file));
    let required = role.map(|r| required_fields(r, &config)).unwrap_or_default();

    let fields: Vec<FieldOutput> = [Field::Identifier, Field::Name, Field::State, Field::OrderStatus]
        .into_iter()
        .map(|field| {
            let resolution = resolve_in(&table.columns, config.columns.synonyms(field));
            FieldOutput {
                field,
                required: required.contains(&field),
                column: resolution.as_ref().map(|r| r.column.clone()),
                synonym: resolution.as_ref().map(|r| r.synonym.clone()),
                also_matched: resolution.map(|r| r.others).unwrap_or_default(),
            }
        })
        .collect();

    if args.json {
        let out = ColumnsOutput {
            file: args.file.display().to_string(),
            role,
            rows: table.len(),
            columns: table.columns.clone(),
            fields,
        };
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return missing_required(&out.fields, role, &config);
    }

    let role_label = role.map(|r| format!(" ({r})")).unwrap_or_default();
    println!(
        "{}{}: {} column(s), {} row(s)",
        args.file.display(),
        role_label,
        table.columns.len(),
        table.len()
    );
    for column in &table.columns {
        println!("  {column}");
    }
    println!();
    println!("fields:");
    for f in &fields {
        let marker = if f.required { "*" } else { " " };
        match &f.column {
            Some(column) if f.also_matched.is_empty() => {
                println!("{marker} {:<14} -> {column}", f.field.to_string())
            }
            Some(column) => println!(
                "{marker} {:<14} -> {column} (also matched: {})",
                f.field.to_string(),
                f.also_matched.join(", ")
            ),
            None => println!(
                "{marker} {:<14} -> not found (tried: {})",
                f.field.to_string(),
                config.columns.synonyms(f.field).join(", ")
            ),
        }
    }
    if role.is_none() {
        eprintln!("note: role unknown; pass --role to check required fields");
    }

    missing_required(&fields, role, &config)
}

/// Fail with the missing-columns exit code when a required field is unresolved.
fn missing_required(
    fields: &[FieldOutput],
    role: Option<TableRole>,
    config: &valida_recon::ReconConfig,
) -> Result<(), CliError> {
    let Some(role) = role else { return Ok(()) };

    let missing: Vec<MissingColumn> = fields
        .iter()
        .filter(|f| f.required && f.column.is_none())
        .map(|f| MissingColumn {
            table: role,
            field: f.field,
            synonyms: config.columns.synonyms(f.field).to_vec(),
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconError::MissingColumns(missing).into())
    }
}
