//! Policy Data Models
//!
//! Policies are opaque JSON documents. The only thing this crate knows about
//! one is which corpus directory it came from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Ground-truth label of a policy, fixed by its corpus directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Weak,
    Strong,
}

impl Label {
    /// Name of the corpus subdirectory holding policies with this label
    pub fn dir_name(&self) -> &'static str {
        match self {
            Label::Weak => "weak",
            Label::Strong => "strong",
        }
    }

    /// The exact string a backend must answer for a match
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Weak => "Weak",
            Label::Strong => "Strong",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A policy document read from the corpus
#[derive(Debug, Clone, Serialize)]
pub struct LabeledPolicy {
    /// File name, used as the policy identifier in reports
    pub name: String,
    pub path: PathBuf,
    pub label: Label,
    pub document: serde_json::Value,
}
