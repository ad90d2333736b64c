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
use super::settings::{BackendKind, OpenAiSettings};
use crate::models::{ClassificationResult, ClassifierError};

const NAME: &str = BackendKind::OpenAi.classifier_name();
const PING_MAX_TOKENS: i32 = 10;

/// OpenAI chat completions classifier
pub struct OpenAiClassifier {
    client: Client,
    settings: OpenAiSettings,
    system_instruction: String,
    timeout: Duration,
}

impl OpenAiClassifier {
    pub fn new(settings: &OpenAiSettings, system_instruction: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            settings: settings.clone(),
            system_instruction: system_instruction.to_string(),
            timeout,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.settings.base_url)
    }

    async fn chat(&self, request: &OpenAiChatRequest) -> Result<String, ClassifierError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| send_error(NAME, self.timeout, e))?;

        let response = check_status(NAME, response).await?;

        let chat_response: OpenAiChatResponse =
            response.json().await.map_err(|e| decode_error(NAME, e))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifierError::BackendRuntime {
                backend: NAME.to_string(),
                message: "response contained no choices".to_string(),
            })
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: i32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiReply,
}

#[derive(Debug, Deserialize)]
struct OpenAiReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl PolicyClassifier for OpenAiClassifier {
    fn name(&self) -> &str {
        NAME
    }

    async fn test_connection(&self) -> bool {
        let request = OpenAiChatRequest {
            model: self.settings.model.clone(),
            messages: vec![OpenAiMessage {
                role: "user",
                content: PING_PROMPT.to_string(),
            }],
            temperature: None,
            max_tokens: PING_MAX_TOKENS,
        };

        match self.chat(&request).await {
            Ok(_) => {
                info!("OpenAI connection successful");
                true
            }
            Err(e) => {
                warn!("OpenAI connection failed: {}", e);
                false
            }
        }
    }

    async fn classify_policy(&self, policy: &Value) -> Result<ClassificationResult, ClassifierError> {
        info!("Sending classification request to OpenAI model {}", self.settings.model);

        let request = OpenAiChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: self.system_instruction.clone(),
                },
                OpenAiMessage {
                    role: "user",
                    content: build_user_prompt(policy),
                },
            ],
            temperature: Some(self.settings.temperature),
            max_tokens: self.settings.max_tokens,
        };

        let reply = self.chat(&request).await?;
        extract_classification(&reply)
    }
}
