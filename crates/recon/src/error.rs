use std::fmt;

use crate::resolve::MissingColumn;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty rule list, blank label, etc.).
    ConfigValidation(String),
    /// One or more required columns could not be resolved. Fatal for the run.
    MissingColumns(Vec<MissingColumn>),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "rules config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "rules config validation error: {msg}"),
            Self::MissingColumns(missing) => {
                let parts: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
                write!(f, "missing required columns: {}", parts.join(", "))
            }
        }
    }
}

impl std::error::Error for ReconError {}

impl ReconError {
    /// True for failures caused by the shape of the input tables rather than the config.
    pub fn is_missing_columns(&self) -> bool {
        matches!(self, Self::MissingColumns(_))
    }
}
