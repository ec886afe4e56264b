//! Deciding which files are a project's root web.config.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

/// File name of the analyzed configuration, compared case-insensitively.
pub const TARGET_CONFIG_NAME: &str = "web.config";

/// Project file extensions that mark a project root.
pub const PROJECT_EXTENSIONS: &[&str] = &["csproj", "vbproj", "fsproj"];

/// A file introduced for analysis together with the project it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// The project file (e.g. `App.csproj`).
    pub project: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, project: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            project: project.into(),
        }
    }
}

/// Filesystem failures while deciding eligibility.
#[derive(Debug, Error)]
pub enum EligibilityError {
    #[error("cannot inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot resolve directory {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether `file` is the web.config sitting directly in the project's directory.
pub fn target_config(file: &Path, project_file: &Path) -> Result<bool, EligibilityError> {
    let metadata = fs::metadata(file).map_err(|source| EligibilityError::Inspect {
        path: file.to_path_buf(),
        source,
    })?;
    if !metadata.is_file() {
        return Ok(false);
    }

    let name_matches = file
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.eq_ignore_ascii_case(TARGET_CONFIG_NAME))
        .unwrap_or(false);
    if !name_matches {
        return Ok(false);
    }

    let file_dir = resolve_dir(&parent_dir(file))?;
    let project_dir = resolve_dir(&parent_dir(project_file))?;
    Ok(file_dir == project_dir)
}

/// Infallible form of [`target_config`]: failures count as not eligible.
pub fn is_target_config(file: &Path, project_file: &Path) -> bool {
    match target_config(file, project_file) {
        Ok(eligible) => eligible,
        Err(e) => {
            debug!("not a project config: {}", e);
            false
        }
    }
}

/// Whether `path` looks like a project file.
pub fn is_project_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            PROJECT_EXTENSIONS
                .iter()
                .any(|p| p.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn resolve_dir(dir: &Path) -> Result<PathBuf, EligibilityError> {
    dir.canonicalize()
        .map_err(|source| EligibilityError::Resolve {
            path: dir.to_path_buf(),
            source,
        })
}
