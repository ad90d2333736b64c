use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification string recorded when a backend cannot be reached
pub const CONNECTION_FAILED: &str = "ConnectionFailed";

/// Classification string recorded when a backend call fails for any other reason
pub const ERROR: &str = "Error";

#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum EvalError {
    #[error("Policy file not found: {0}")]
    PolicyNotFound(String),

    #[error("Policy file is empty: {0}")]
    EmptyPolicy(String),

    #[error("Policy file is not valid JSON: {path}: {message}")]
    InvalidPolicyJson { path: String, message: String },

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Connection failed to {0}: {1}")]
    ConnectionFailed(String, String),

    #[error("Could not parse classification: {0}")]
    ClassificationParse(String),

    #[error("Backend error from {backend}: {message}")]
    BackendRuntime { backend: String, message: String },

    #[error("Request to {0} timed out after {1}s")]
    Timeout(String, u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No policies found in '{weak_dir}' or '{strong_dir}'")]
    NoPolicies { weak_dir: String, strong_dir: String },
}

/// Errors crossing the classifier boundary use the same taxonomy
pub type ClassifierError = EvalError;

impl EvalError {
    /// Sentinel classification recorded by the harness for this error, if any.
    ///
    /// Parse failures have no sentinel: they are treated as "no result".
    pub fn sentinel(&self) -> Option<&'static str> {
        match self {
            EvalError::ConnectionFailed(_, _) => Some(CONNECTION_FAILED),
            EvalError::ClassificationParse(_) => None,
            _ => Some(ERROR),
        }
    }

    /// Get a suggestion for recovering from this error
    pub fn recovery_suggestion(&self) -> &str {
        match self {
            EvalError::PolicyNotFound(_) => "Check the policy file path",
            EvalError::EmptyPolicy(_) => "Remove the empty file from the corpus",
            EvalError::InvalidPolicyJson { .. } => "Fix the JSON syntax of the policy file",
            EvalError::Io { .. } => "Check file permissions",
            EvalError::ConnectionFailed(_, _) => "Check network connectivity and credentials",
            EvalError::ClassificationParse(_) => {
                "Tighten the system prompt so the model answers with a JSON object"
            }
            EvalError::BackendRuntime { .. } => "Inspect the backend error and try again",
            EvalError::Timeout(_, _) => "Raise CLASSIFIER_TIMEOUT_SECS or try again later",
            EvalError::InvalidConfiguration(_) => "Review your environment or .env file",
            EvalError::NoPolicies { .. } => "Add policy files under the weak/ and strong/ directories",
        }
    }

    pub(crate) fn io(path: impl std::fmt::Display, err: std::io::Error) -> Self {
        EvalError::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
