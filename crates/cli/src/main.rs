// valida - cross-check enrollment exports by CPF

mod exit_codes;
mod recon;
mod report;
mod rules;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use valida_config::{Settings, SettingsError};
use valida_io::IoError;
use valida_recon::ReconError;

use exit_codes::{io_exit_code, recon_exit_code, settings_exit_code, EXIT_SUCCESS, EXIT_USAGE};

/// Env var holding a tracing filter directive (e.g. `valida_recon=debug`).
const LOG_ENV: &str = "VALIDA_LOG";

#[derive(Parser)]
#[command(name = "valida")]
#[command(about = "Cross-check the panel export against the educapi and comercial bases by CPF")]
#[command(version)]
struct Cli {
    /// More diagnostics on stderr (-v info, -vv debug). VALIDA_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file to use instead of the per-user settings.toml
    #[arg(long = "settings", global = true, env = "VALIDA_SETTINGS", value_name = "FILE")]
    settings_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cross-check the three bases and write the inconsistency report
    #[command(after_help = "\
Examples:
  valida run painel.csv educapi.xlsx comercial.xls
  valida run ./exports/*                       # roles taken from file names
  valida run --painel p.csv --educapi e.csv --comercial c.csv --out xlsx
  valida run *.csv --config order.rules.toml --json > report.json
  valida run *.csv --header-row 1 --delimiter ';' --no-fail

Exit codes:
  0  nothing flagged    3  inconsistencies found   4  missing columns
  2  usage error        5  invalid config          6  unreadable input")]
    Run(recon::RunArgs),

    /// Show the normalized columns of one input and how each field resolves
    #[command(after_help = "\
Examples:
  valida columns educapi.csv
  valida columns export.xlsx --role comercial --header-row 1
  valida columns painel.csv --json")]
    Columns(recon::ColumnsArgs),

    /// Inspect or check a rules config (*.rules.toml)
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },

    /// Per-user settings (input defaults, output format, default rules file)
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print the settings file path
    Path,

    /// Print the effective settings as TOML
    Show,

    /// Write a settings file with the built-in defaults
    #[command(after_help = "\
Examples:
  valida settings init
  valida settings init --force
  valida --settings ./team.settings.toml settings init")]
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings_path = cli.settings_file.as_deref();
    let result = match cli.command {
        Commands::Run(args) => {
            load_settings(settings_path).and_then(|settings| recon::cmd_run(args, &settings))
        }
        Commands::Columns(args) => {
            load_settings(settings_path).and_then(|settings| recon::cmd_columns(args, &settings))
        }
        Commands::Rules { command } => rules::cmd_rules(command),
        Commands::Settings { command } => cmd_settings(command, settings_path),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose > 1),
        )
        .init();
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let hint = match &err {
            IoError::MissingBases(_) => Some(
                "file names must contain painel, educapi and comercial, or pass --painel/--educapi/--comercial"
                    .to_string(),
            ),
            IoError::AmbiguousBase { .. } => Some("pass the intended file with --painel/--educapi/--comercial".to_string()),
            IoError::HeaderRowMissing { .. } => Some("set the header row with --header-row N".to_string()),
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = err.is_missing_columns().then(|| {
            "inspect headers with `valida columns <file>`; add synonyms under [columns] in a rules config".to_string()
        });
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self { code: settings_exit_code(&err), message: err.to_string(), hint: None }
    }
}

// ============================================================================
// settings
// ============================================================================

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let settings = match path {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    Ok(settings)
}

fn settings_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(Settings::config_path)
}

fn cmd_settings(cmd: SettingsCommands, path: Option<&Path>) -> Result<(), CliError> {
    match cmd {
        SettingsCommands::Path => {
            println!("{}", settings_file(path).display());
            Ok(())
        }
        SettingsCommands::Show => {
            let settings = load_settings(path)?;
            let body = toml::to_string_pretty(&settings)
                .map_err(|e| CliError::new(exit_codes::EXIT_ERROR, format!("cannot render settings: {e}")))?;
            print!("{body}");
            Ok(())
        }
        SettingsCommands::Init { force } => {
            let target = settings_file(path);
            if target.exists() && !force {
                return Err(CliError::usage(format!("{} already exists", target.display()))
                    .with_hint("pass --force to overwrite"));
            }
            Settings::default().save_to(&target)?;
            eprintln!("wrote {}", target.display());
            Ok(())
        }
    }
}
