//! Single-policy classification for manual spot checks

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::ai::PolicyClassifier;

/// What the model said about the policy
#[derive(Debug, Clone, Serialize)]
pub struct AiOutput {
    pub policy: Value,
    pub classification: Option<String>,
    pub reason: Option<String>,
}

/// JSON object printed by `classify`
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SingleShotOutput {
    Success {
        model: String,
        input_file: String,
        ai_output: AiOutput,
    },
    Failure {
        model: String,
        input_file: String,
        error: String,
    },
}

impl SingleShotOutput {
    pub fn failure(model: &str, path: &Path, error: impl Into<String>) -> Self {
        SingleShotOutput::Failure {
            model: model.to_string(),
            input_file: path.display().to_string(),
            error: error.into(),
        }
    }

    /// Output for a policy file that could not be read or parsed
    pub fn unreadable(model: &str, path: &Path) -> Self {
        Self::failure(model, path, "Failed to read or parse the policy file.")
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SingleShotOutput::Success { .. })
    }
}

/// Classifies one policy file with one classifier
pub struct SingleShotRunner<'a> {
    classifier: &'a dyn PolicyClassifier,
    test_connection: bool,
}

impl<'a> SingleShotRunner<'a> {
    pub fn new(classifier: &'a dyn PolicyClassifier, test_connection: bool) -> Self {
        Self {
            classifier,
            test_connection,
        }
    }

    /// Classify a policy already read from `path`.
    ///
    /// Callers read the policy before building the classifier so an
    /// unreadable file never reaches a backend.
    pub async fn run(&self, path: &Path, policy: Value) -> SingleShotOutput {
        let model = self.classifier.name();

        if self.test_connection && !self.classifier.test_connection().await {
            return SingleShotOutput::failure(model, path, format!("{} connection failed.", model));
        }

        match self.classifier.classify_policy(&policy).await {
            Ok(result) => SingleShotOutput::Success {
                model: model.to_string(),
                input_file: path.display().to_string(),
                ai_output: AiOutput {
                    policy,
                    classification: result.classification,
                    reason: result.reason,
                },
            },
            Err(e) => {
                warn!("Classification failed: {}", e);
                SingleShotOutput::failure(model, path, "Classification failed or returned no result.")
            }
        }
    }
}
