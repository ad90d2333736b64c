//! LLM Classifier Module
//!
//! Backend adapters that grade IAM policies as Weak or Strong.
//! Supports Bedrock, OpenAI, Ollama and local Hugging Face models.

mod bedrock;
mod huggingface;
mod ollama;
mod openai;
mod provider;
mod registry;
mod settings;
pub mod sigv4;

// Classifier implementations
pub use bedrock::BedrockClassifier;
pub use huggingface::{HuggingFaceClassifier, ServedModel};
pub use ollama::OllamaClassifier;
pub use openai::OpenAiClassifier;

// Common classifier types
pub use provider::{build_user_prompt, extract_classification, PolicyClassifier, PING_PROMPT};
pub use registry::{load_system_instruction, ClassifierRegistry};

// Settings
pub use settings::{
    AwsCredentials, BackendKind, BedrockAuth, BedrockSettings, HuggingFaceSettings,
    OllamaSettings, OpenAiSettings,
};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::{EvalError, Result};

/// Create a classifier for a backend from the configuration
pub async fn create_classifier(
    kind: BackendKind,
    config: &AppConfig,
    system_instruction: &str,
) -> Result<Arc<dyn PolicyClassifier>> {
    let missing = || {
        EvalError::InvalidConfiguration(format!(
            "{} is not configured: set {}",
            kind.model_name(),
            AppConfig::missing_setting(kind)
        ))
    };

    let classifier: Arc<dyn PolicyClassifier> = match kind {
        BackendKind::OpenAi => {
            let settings = config.openai.as_ref().ok_or_else(missing)?;
            Arc::new(OpenAiClassifier::new(settings, system_instruction, config.timeout))
        }
        BackendKind::Bedrock => {
            let settings = config.bedrock.as_ref().ok_or_else(missing)?;
            Arc::new(BedrockClassifier::new(settings, system_instruction, config.timeout))
        }
        BackendKind::Ollama => {
            let settings = config.ollama.as_ref().ok_or_else(missing)?;
            Arc::new(OllamaClassifier::new(settings, system_instruction, config.timeout))
        }
        BackendKind::HuggingFace => {
            let settings = config.huggingface.as_ref().ok_or_else(missing)?;
            Arc::new(
                HuggingFaceClassifier::connect(settings, system_instruction, config.timeout).await,
            )
        }
    };

    Ok(classifier)
}
