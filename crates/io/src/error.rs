use std::fmt;
use std::path::{Path, PathBuf};

/// Failure loading or writing one file.
#[derive(Debug)]
pub enum IoError {
    /// Filesystem error opening, reading or creating a file.
    File { path: PathBuf, message: String },
    /// Extension and content match no supported format.
    UnsupportedFormat { path: PathBuf },
    /// File was readable but its content could not be parsed.
    Parse { path: PathBuf, message: String },
    /// The configured header row is past the end of the data or blank.
    HeaderRowMissing { path: PathBuf, header_row: usize },
    /// One or more of the three bases could not be found among the inputs.
    MissingBases(Vec<String>),
    /// More than one input file claims the same base.
    AmbiguousBase { base: String, paths: Vec<PathBuf> },
    /// Writing an output file failed.
    Write { path: PathBuf, message: String },
}

impl IoError {
    pub(crate) fn file(path: &Path, err: impl fmt::Display) -> Self {
        Self::File { path: path.to_path_buf(), message: err.to_string() }
    }

    pub(crate) fn parse(path: &Path, err: impl fmt::Display) -> Self {
        Self::Parse { path: path.to_path_buf(), message: err.to_string() }
    }

    pub(crate) fn write(path: &Path, err: impl fmt::Display) -> Self {
        Self::Write { path: path.to_path_buf(), message: err.to_string() }
    }

    /// True for problems with the input arguments rather than file content.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::MissingBases(_) | Self::AmbiguousBase { .. })
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, message } => write!(f, "{}: {}", path.display(), message),
            Self::UnsupportedFormat { path } => write!(
                f,
                "{}: unsupported file type (expected .csv, .xls, .xlsx or an HTML table export)",
                path.display()
            ),
            Self::Parse { path, message } => write!(f, "{}: {}", path.display(), message),
            Self::HeaderRowMissing { path, header_row } => write!(
                f,
                "{}: header row {} is empty or past the end of the file",
                path.display(),
                header_row
            ),
            Self::MissingBases(bases) => write!(f, "missing base file(s): {}", bases.join(", ")),
            Self::AmbiguousBase { base, paths } => {
                let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "more than one file looks like the {} base: {}", base, names.join(", "))
            }
            Self::Write { path, message } => write!(f, "failed to write {}: {}", path.display(), message),
        }
    }
}

impl std::error::Error for IoError {}
