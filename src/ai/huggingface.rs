//! Local Hugging Face model classifier.
//!
//! Weights, tokenizer and chat template live in a local inference server
//! (text-generation-inference or any server exposing the OpenAI-compatible
//! `/v1/chat/completions` route). The server picks the accelerator and
//! returns only the newly generated tokens. The model is resolved once when
//! the classifier is built and reused for every call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::provider::{
    build_user_prompt, check_status, decode_error, extract_classification, send_error,
    PolicyClassifier, PING_PROMPT,
};
use super::settings::{BackendKind, HuggingFaceSettings};
use crate::models::{ClassificationResult, ClassifierError};

const NAME: &str = BackendKind::HuggingFace.classifier_name();
const PING_MAX_NEW_TOKENS: i32 = 20;

/// What the inference server reports about the loaded model
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServedModel {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub model_device_type: Option<String>,
}

pub struct HuggingFaceClassifier {
    client: Client,
    settings: HuggingFaceSettings,
    system_instruction: String,
    timeout: Duration,
    served: Option<ServedModel>,
}

impl HuggingFaceClassifier {
    /// Build the classifier and look up the model the local server has loaded.
    ///
    /// An unreachable server is not an error here; it shows up in
    /// `test_connection` and in classification results.
    pub async fn connect(settings: &HuggingFaceSettings, system_instruction: &str, timeout: Duration) -> Self {
        let mut classifier = Self {
            client: Client::new(),
            settings: settings.clone(),
            system_instruction: system_instruction.to_string(),
            timeout,
            served: None,
        };

        match classifier.fetch_served_model().await {
            Ok(served) => {
                let device = served.model_device_type.as_deref().unwrap_or("unknown");
                match served.model_id.as_deref() {
                    Some(id) if id != classifier.settings.model_id => warn!(
                        "Local server has {} loaded but HUGGINGFACE_MODEL_ID is {}",
                        id, classifier.settings.model_id
                    ),
                    _ => info!(
                        "Local model {} loaded on {}",
                        classifier.settings.model_id, device
                    ),
                }
                classifier.served = Some(served);
            }
            Err(e) => warn!("Could not query local model server: {}", e),
        }

        classifier
    }

    pub fn served_model(&self) -> Option<&ServedModel> {
        self.served.as_ref()
    }

    async fn fetch_served_model(&self) -> Result<ServedModel, ClassifierError> {
        let url = format!("{}/info", self.settings.endpoint);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| send_error(NAME, self.timeout, e))?;

        let response = check_status(NAME, response).await?;
        response.json().await.map_err(|e| decode_error(NAME, e))
    }

    async fn generate(&self, messages: Vec<ChatMessage>, max_tokens: i32) -> Result<String, ClassifierError> {
        let url = format!("{}/v1/chat/completions", self.settings.endpoint);
        let request = GenerateRequest {
            model: self.settings.model_id.clone(),
            messages,
            max_tokens,
            temperature: self.settings.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| send_error(NAME, self.timeout, e))?;

        let response = check_status(NAME, response).await?;

        let generated: GenerateResponse =
            response.json().await.map_err(|e| decode_error(NAME, e))?;

        generated
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifierError::BackendRuntime {
                backend: NAME.to_string(),
                message: "no generated text in response".to_string(),
            })
    }
}

// Inference server types

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    choices: Vec<GenerateChoice>,
}

#[derive(Debug, Deserialize)]
struct GenerateChoice {
    message: GeneratedMessage,
}

#[derive(Debug, Deserialize)]
struct GeneratedMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl PolicyClassifier for HuggingFaceClassifier {
    fn name(&self) -> &str {
        NAME
    }

    async fn test_connection(&self) -> bool {
        let messages = vec![ChatMessage {
            role: "user",
            content: PING_PROMPT.to_string(),
        }];

        match self.generate(messages, PING_MAX_NEW_TOKENS).await {
            Ok(reply) => {
                info!("Hugging Face local model connection successful, response: {}", reply.trim());
                true
            }
            Err(e) => {
                warn!("Hugging Face connection failed: {}", e);
                false
            }
        }
    }

    async fn classify_policy(&self, policy: &Value) -> Result<ClassificationResult, ClassifierError> {
        info!("Sending classification request to local model {}", self.settings.model_id);

        let messages = vec![
            ChatMessage {
                role: "system",
                content: self.system_instruction.clone(),
            },
            ChatMessage {
                role: "user",
                content: build_user_prompt(policy),
            },
        ];

        let reply = self.generate(messages, self.settings.max_new_tokens).await?;
        extract_classification(&reply)
    }
}
