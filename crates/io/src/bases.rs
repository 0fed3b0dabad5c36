// Pick the painel / educapi / comercial files out of a list of inputs

use std::path::{Path, PathBuf};

use valida_recon::TableRole;

use crate::IoError;

/// The three input files, one per table role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseFiles {
    pub painel: PathBuf,
    pub educapi: PathBuf,
    pub comercial: PathBuf,
}

impl BaseFiles {
    pub fn get(&self, role: TableRole) -> &Path {
        match role {
            TableRole::Reference => &self.painel,
            TableRole::SourceA => &self.educapi,
            TableRole::SourceB => &self.comercial,
        }
    }
}

/// The role a file plays, judged by its lower-cased file name containing
/// `painel`, `educapi` or `comercial`.
pub fn role_for(path: &Path) -> Option<TableRole> {
    let name = path.file_name()?.to_string_lossy().to_lowercase();
    TableRole::ALL.into_iter().find(|role| name.contains(role.base_name()))
}

/// Assign every role exactly one file.
///
/// Files matching no base are ignored with a warning. Two files matching the
/// same base, or any base with no file, is an error.
pub fn identify_bases(paths: &[PathBuf]) -> Result<BaseFiles, IoError> {
    identify_bases_with(paths, Default::default())
}

/// Like [`identify_bases`], with some roles pinned to explicit paths
/// (`[painel, educapi, comercial]`). A pinned role ignores name matches.
pub fn identify_bases_with(paths: &[PathBuf], explicit: [Option<PathBuf>; 3]) -> Result<BaseFiles, IoError> {
    let mut found: [Vec<PathBuf>; 3] = explicit.map(|p| p.into_iter().collect());
    let pinned: [bool; 3] = [0, 1, 2].map(|i| !found[i].is_empty());

    for path in paths {
        match role_for(path) {
            Some(role) if pinned[slot(role)] => {
                tracing::warn!(path = %path.display(), base = role.base_name(), "base given explicitly; file ignored")
            }
            Some(role) => found[slot(role)].push(path.clone()),
            None => tracing::warn!(path = %path.display(), "file name matches no base; ignored"),
        }
    }

    let mut missing = Vec::new();
    for role in TableRole::ALL {
        let candidates = &found[slot(role)];
        match candidates.len() {
            0 => missing.push(role.base_name().to_string()),
            1 => {}
            _ => {
                return Err(IoError::AmbiguousBase {
                    base: role.base_name().to_string(),
                    paths: candidates.clone(),
                })
            }
        }
    }
    if !missing.is_empty() {
        return Err(IoError::MissingBases(missing));
    }

    let [painel, educapi, comercial] = found.map(|mut v| v.remove(0));
    Ok(BaseFiles { painel, educapi, comercial })
}

fn slot(role: TableRole) -> usize {
    match role {
        TableRole::Reference => 0,
        TableRole::SourceA => 1,
        TableRole::SourceB => 2,
    }
}
