//! Policy Corpus Loader
//!
//! Reads policy documents from a `{root}/weak` + `{root}/strong` layout. The
//! label of a policy is decided by the directory it sits in, never by its
//! content.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::models::{EvalError, Label, LabeledPolicy, Result};

/// Files found in the corpus, before any of them are read
#[derive(Debug, Clone, Default)]
pub struct PolicyCorpus {
    pub weak: Vec<PathBuf>,
    pub strong: Vec<PathBuf>,
}

impl PolicyCorpus {
    pub fn is_empty(&self) -> bool {
        self.weak.is_empty() && self.strong.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weak.len() + self.strong.len()
    }

    /// All paths with their label, weak policies first
    pub fn labeled_paths(&self) -> impl Iterator<Item = (&Path, Label)> {
        self.weak
            .iter()
            .map(|p| (p.as_path(), Label::Weak))
            .chain(self.strong.iter().map(|p| (p.as_path(), Label::Strong)))
    }
}

/// Enumerates and reads a labeled policy corpus
#[derive(Debug, Clone)]
pub struct PolicyLoader {
    root: PathBuf,
    pattern: String,
}

impl PolicyLoader {
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> Self {
        Self {
            root: root.into(),
            pattern: pattern.to_string(),
        }
    }

    pub fn dir_for(&self, label: Label) -> PathBuf {
        self.root.join(label.dir_name())
    }

    /// List the files matching the pattern under both label directories
    pub fn discover(&self) -> Result<PolicyCorpus> {
        Ok(PolicyCorpus {
            weak: self.matching_files(Label::Weak)?,
            strong: self.matching_files(Label::Strong)?,
        })
    }

    fn matching_files(&self, label: Label) -> Result<Vec<PathBuf>> {
        let dir = self.dir_for(label);
        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            self.pattern
        );

        let paths = glob::glob(&pattern).map_err(|e| {
            EvalError::InvalidConfiguration(format!("Invalid policy glob '{}': {}", self.pattern, e))
        })?;

        let mut files: Vec<PathBuf> = paths
            .filter_map(|p| p.ok())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Discover and read the corpus, skipping files that fail to load.
    ///
    /// Fails with `NoPolicies` when nothing usable is found.
    pub fn load(&self) -> Result<Vec<LabeledPolicy>> {
        let corpus = self.discover()?;
        if corpus.is_empty() {
            return Err(self.no_policies());
        }

        info!(
            "Found {} weak and {} strong policies",
            corpus.weak.len(),
            corpus.strong.len()
        );

        let mut policies = Vec::with_capacity(corpus.len());
        for (path, label) in corpus.labeled_paths() {
            match read_policy(path) {
                Ok(document) => policies.push(LabeledPolicy {
                    name: file_name(path),
                    path: path.to_path_buf(),
                    label,
                    document,
                }),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        if policies.is_empty() {
            return Err(self.no_policies());
        }
        Ok(policies)
    }

    fn no_policies(&self) -> EvalError {
        EvalError::NoPolicies {
            weak_dir: self.dir_for(Label::Weak).display().to_string(),
            strong_dir: self.dir_for(Label::Strong).display().to_string(),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read and parse one policy file
pub fn read_policy(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EvalError::PolicyNotFound(path.display().to_string()),
        _ => EvalError::io(path.display(), e),
    })?;

    if content.trim().is_empty() {
        return Err(EvalError::EmptyPolicy(path.display().to_string()));
    }

    serde_json::from_str(&content).map_err(|e| EvalError::InvalidPolicyJson {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read a text resource such as the system instruction
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EvalError::InvalidConfiguration(format!(
            "Prompt file not found: {}",
            path.display()
        )),
        _ => EvalError::io(path.display(), e),
    })
}
