use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::provider::{
    build_user_prompt, check_status, decode_error, extract_classification, send_error,
    PolicyClassifier, PING_PROMPT,
};
use super::settings::{BackendKind, OllamaSettings};
use crate::models::{ClassificationResult, ClassifierError};

const NAME: &str = BackendKind::Ollama.classifier_name();

/// Ollama chat classifier
pub struct OllamaClassifier {
    client: Client,
    base_url: String,
    model: String,
    system_instruction: String,
    timeout: Duration,
}

impl OllamaClassifier {
    pub fn new(settings: &OllamaSettings, system_instruction: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.host.trim_end_matches('/').to_string(),
            model: settings.model_id.clone(),
            system_instruction: system_instruction.to_string(),
            timeout,
        }
    }

    async fn chat(&self, messages: Vec<OllamaMessage>) -> Result<String, ClassifierError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages,
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

        let chat_response: OllamaChatResponse =
            response.json().await.map_err(|e| decode_error(NAME, e))?;

        if let Some(count) = chat_response.eval_count {
            debug!("Ollama generated {} tokens", count);
        }

        Ok(chat_response.message.content)
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    eval_count: Option<i32>,
}

#[async_trait]
impl PolicyClassifier for OllamaClassifier {
    fn name(&self) -> &str {
        NAME
    }

    async fn test_connection(&self) -> bool {
        let messages = vec![OllamaMessage {
            role: "user".to_string(),
            content: PING_PROMPT.to_string(),
        }];

        match self.chat(messages).await {
            Ok(reply) => {
                info!("Ollama connection successful, response: {}", reply.trim());
                true
            }
            Err(e) => {
                warn!("Ollama connection failed: {}", e);
                false
            }
        }
    }

    async fn classify_policy(&self, policy: &Value) -> Result<ClassificationResult, ClassifierError> {
        info!("Sending classification request to Ollama: {} ({})", self.base_url, self.model);

        let messages = vec![
            OllamaMessage {
                role: "system".to_string(),
                content: self.system_instruction.clone(),
            },
            OllamaMessage {
                role: "user".to_string(),
                content: build_user_prompt(policy),
            },
        ];

        let reply = self.chat(messages).await?;
        extract_classification(&reply)
    }
}
