use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use valida_io::{ExportFormat, DEFAULT_HEADER_ROW};

const APP_DIR: &str = "valida-matricula";
const FILE_NAME: &str = "settings.toml";

#[derive(Debug)]
pub enum SettingsError {
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    Invalid(String),
    Write { path: PathBuf, message: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {}", path.display(), message),
            Self::Parse { path, message } => write!(f, "invalid settings in {}: {}", path.display(), message),
            Self::Invalid(msg) => write!(f, "invalid settings: {}", msg),
            Self::Write { path, message } => write!(f, "cannot write {}: {}", path.display(), message),
        }
    }
}

impl std::error::Error for SettingsError {}

/// How input bases are parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputSettings {
    /// 1-indexed header row.
    pub header_row: usize,
    /// Single-character field delimiter; sniffed when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    /// Worksheet to read from workbooks; first sheet when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            delimiter: None,
            sheet: None,
        }
    }
}

impl InputSettings {
    /// The delimiter as a byte. Call after [`Settings::validate`].
    pub fn delimiter_byte(&self) -> Option<u8> {
        self.delimiter.as_deref().and_then(parse_delimiter)
    }
}

/// Where and how the report is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub format: ExportFormat,
    /// File name without extension.
    pub file_stem: String,
    /// Output directory; the working directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Write the report file even when nothing was flagged.
    pub write_empty: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
            file_stem: "verificar".to_string(),
            dir: None,
            write_empty: false,
        }
    }
}

impl OutputSettings {
    /// Default report path for the given format.
    pub fn report_path(&self, format: ExportFormat) -> PathBuf {
        let name = format!("{}.{}", self.file_stem, format.extension());
        match &self.dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// User defaults. Command-line flags override these; these override the
/// built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Rules config (`*.rules.toml`) used when `--config` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,
    pub input: InputSettings,
    pub output: OutputSettings,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(FILE_NAME)
    }

    /// Load settings from the default location. A missing file means defaults.
    pub fn load() -> Result<Self, SettingsError> {
        let path = Self::config_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file; using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate settings from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml(&contents).map_err(|e| match e {
            SettingsError::Invalid(message) => SettingsError::Parse { path: path.to_path_buf(), message },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn from_toml(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(s).map_err(|e| SettingsError::Invalid(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.input.header_row == 0 {
            return Err(SettingsError::Invalid("input.header_row is 1-indexed and must be at least 1".into()));
        }
        if let Some(d) = &self.input.delimiter {
            if parse_delimiter(d).is_none() {
                return Err(SettingsError::Invalid(format!(
                    "input.delimiter must be a single ASCII character or \"tab\", got {:?}",
                    d
                )));
            }
        }
        if self.output.file_stem.trim().is_empty() {
            return Err(SettingsError::Invalid("output.file_stem must not be empty".into()));
        }
        Ok(())
    }

    /// Save current settings to the default location.
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |message: String| SettingsError::Write { path: path.to_path_buf(), message };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }

        let body = toml::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
        fs::write(path, body).map_err(|e| write_err(e.to_string()))
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

/// `";"`, `","`, `"|"`, `"\t"` or `"tab"` to a delimiter byte.
pub fn parse_delimiter(s: &str) -> Option<u8> {
    if s.eq_ignore_ascii_case("tab") || s == "\\t" {
        return Some(b'\t');
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Some(c as u8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.input.header_row, 2);
        assert_eq!(s.output.format, ExportFormat::Csv);
        assert_eq!(s.output.report_path(ExportFormat::Csv), PathBuf::from("verificar.csv"));
        assert!(s.rules_file.is_none());
    }

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(Settings::from_toml("").unwrap(), Settings::default());
    }

    #[test]
    fn parse_partial_settings() {
        let s = Settings::from_toml(
            r#"
rules_file = "/etc/valida/order.rules.toml"

[input]
delimiter = ";"

[output]
format = "xlsx"
dir = "/tmp/out"
"#,
        )
        .unwrap();
        assert_eq!(s.input.header_row, 2);
        assert_eq!(s.input.delimiter_byte(), Some(b';'));
        assert_eq!(s.output.format, ExportFormat::Xlsx);
        assert_eq!(
            s.output.report_path(s.output.format),
            PathBuf::from("/tmp/out/verificar.xlsx")
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Settings::from_toml("[input]\nheader_row = 0").is_err());
        assert!(Settings::from_toml("[input]\ndelimiter = \";;\"").is_err());
        assert!(Settings::from_toml("[output]\nfile_stem = \" \"").is_err());
        assert!(Settings::from_toml("[output]\nformat = \"pdf\"").is_err());
        assert!(Settings::from_toml("colour = \"blue\"").is_err());
    }

    #[test]
    fn delimiter_spellings() {
        assert_eq!(parse_delimiter("tab"), Some(b'\t'));
        assert_eq!(parse_delimiter("\\t"), Some(b'\t'));
        assert_eq!(parse_delimiter("|"), Some(b'|'));
        assert_eq!(parse_delimiter("é"), None);
        assert_eq!(parse_delimiter(""), None);
    }

    #[test]
    fn save_and_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut s = Settings::default();
        s.input.header_row = 1;
        s.output.write_empty = true;
        s.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, s);
    }

    #[test]
    fn load_from_reports_path_on_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[input\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        assert!(err.to_string().contains("settings.toml"));
    }

    #[test]
    fn config_path_under_app_dir() {
        let path = Settings::config_path();
        assert!(path.ends_with("valida-matricula/settings.toml"));
    }
}
