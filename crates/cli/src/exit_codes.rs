//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scheduled jobs branch on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success, nothing flagged (or `--no-fail`)                |
//! | 1    | General error (unspecified)                              |
//! | 2    | Usage error (bad args, missing or ambiguous base file)   |
//! | 3    | Inconsistencies found                                    |
//! | 4    | Required columns missing from an input table             |
//! | 5    | Invalid rules config or settings file                    |
//! | 6    | Input file could not be parsed                           |
//! | 7    | Report could not be written                              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use valida_config::SettingsError;
use valida_io::IoError;
use valida_recon::ReconError;

/// Success - command completed and nothing was flagged.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable input path, missing base.
pub const EXIT_USAGE: u8 = 2;

/// The run completed and flagged at least one reference row.
pub const EXIT_INCONSISTENCIES: u8 = 3;

/// A required column could not be resolved in one of the tables.
pub const EXIT_MISSING_COLUMNS: u8 = 4;

/// Rules config or settings file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 5;

/// An input file was readable but its content could not be parsed.
pub const EXIT_INPUT_PARSE: u8 = 6;

/// Writing the report failed.
pub const EXIT_OUTPUT_WRITE: u8 = 7;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::MissingColumns(_) => EXIT_MISSING_COLUMNS,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
    }
}

/// Map a file I/O error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::File { .. } | IoError::UnsupportedFormat { .. } => EXIT_USAGE,
        IoError::MissingBases(_) | IoError::AmbiguousBase { .. } => EXIT_USAGE,
        IoError::Parse { .. } | IoError::HeaderRowMissing { .. } => EXIT_INPUT_PARSE,
        IoError::Write { .. } => EXIT_OUTPUT_WRITE,
    }
}

/// Map a settings error to its exit code.
pub fn settings_exit_code(err: &SettingsError) -> u8 {
    match err {
        SettingsError::Read { .. } => EXIT_USAGE,
        SettingsError::Parse { .. } | SettingsError::Invalid(_) => EXIT_INVALID_CONFIG,
        SettingsError::Write { .. } => EXIT_OUTPUT_WRITE,
    }
}
