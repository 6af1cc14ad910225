//! Run files: the targets, alphabet and configuration for one search.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Alphabet, SearchConfig};

/// A search run as read from JSON.
///
/// Targets come from `targets`, from `targets_path`, or both, in that order.
/// A relative `targets_path` is resolved against the run file's directory by
/// [`RunFile::load`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunFile {
    /// Input symbols. Derived from the targets when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphabet: Option<String>,
    /// Inline target strings.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Text file with one target per line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets_path: Option<PathBuf>,
    /// Search configuration.
    #[serde(default)]
    pub search: SearchConfig,
}

impl RunFile {
    /// Read and parse a run file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunFileError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RunFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut run: RunFile = serde_json::from_str(&text)?;

        if let Some(targets_path) = &run.targets_path
            && targets_path.is_relative()
            && let Some(dir) = path.parent()
        {
            run.targets_path = Some(dir.join(targets_path));
        }

        Ok(run)
    }

    /// Inline targets followed by those read from `targets_path`.
    pub fn resolve_targets(&self) -> Result<Vec<String>, RunFileError> {
        let mut targets = self.targets.clone();
        if let Some(path) = &self.targets_path {
            targets.extend(load_targets(path)?);
        }
        if targets.is_empty() {
            return Err(RunFileError::NoTargets);
        }
        Ok(targets)
    }

    /// The configured alphabet, or every symbol appearing in `targets`.
    pub fn resolve_alphabet(&self, targets: &[String]) -> Alphabet {
        match &self.alphabet {
            Some(symbols) => Alphabet::from(symbols.as_str()),
            None => Alphabet::from_words(targets),
        }
    }

    /// An example run over a few Spanish verb forms.
    pub fn example() -> Self {
        Self {
            alphabet: Some("amos".to_owned()),
            targets: ["amo", "amas", "ama", "amamos"]
                .into_iter()
                .map(String::from)
                .collect(),
            targets_path: None,
            search: SearchConfig {
                random_seed: Some(42),
                ..Default::default()
            },
        }
    }
}

/// Read one target per line. Lines are trimmed and blank lines skipped.
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<String>, RunFileError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| RunFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Run file errors.
#[derive(Debug, thiserror::Error)]
pub enum RunFileError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse run file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Run file lists no targets")]
    NoTargets,
}
