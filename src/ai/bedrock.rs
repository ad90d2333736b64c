use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::provider::{
    build_user_prompt, check_status, decode_error, extract_classification, send_error,
    PolicyClassifier, PING_PROMPT,
};
use super::settings::{BackendKind, BedrockAuth, BedrockSettings};
use super::sigv4;
use crate::models::{ClassificationResult, ClassifierError};

const NAME: &str = BackendKind::Bedrock.classifier_name();
const SIGNING_SERVICE: &str = "bedrock";

/// AWS Bedrock Runtime classifier using the Converse API.
///
/// Requests go to `{endpoint}/model/{modelId}/converse`, authenticated
/// either with a Bedrock API key (bearer token) or with SigV4-signed
/// static credentials.
pub struct BedrockClassifier {
    client: Client,
    settings: BedrockSettings,
    system_instruction: String,
    timeout: Duration,
}

impl BedrockClassifier {
    pub fn new(settings: &BedrockSettings, system_instruction: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            settings: settings.clone(),
            system_instruction: system_instruction.to_string(),
            timeout,
        }
    }

    fn converse_url(&self) -> Result<Url, ClassifierError> {
        let raw = format!(
            "{}/model/{}/converse",
            self.settings.endpoint(),
            sigv4::uri_encode(&self.settings.model_id)
        );
        Url::parse(&raw).map_err(|e| {
            ClassifierError::InvalidConfiguration(format!("Invalid Bedrock endpoint '{}': {}", raw, e))
        })
    }

    async fn converse(&self, text: String) -> Result<String, ClassifierError> {
        let auth = self.settings.auth.as_ref().ok_or_else(|| {
            ClassifierError::ConnectionFailed(
                NAME.to_string(),
                "no AWS credentials: set AWS_BEARER_TOKEN or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY"
                    .to_string(),
            )
        })?;

        let url = self.converse_url()?;
        let request = ConverseRequest {
            messages: vec![ConverseMessage {
                role: "user".to_string(),
                content: vec![ContentBlock { text: Some(text) }],
            }],
        };
        let body = serde_json::to_vec(&request).map_err(|e| ClassifierError::BackendRuntime {
            backend: NAME.to_string(),
            message: format!("Failed to encode request: {}", e),
        })?;

        let mut builder = self
            .client
            .post(url.clone())
            .header("Content-Type", "application/json")
            .timeout(self.timeout);

        builder = match auth {
            BedrockAuth::Bearer(token) => builder.header("Authorization", format!("Bearer {}", token)),
            BedrockAuth::SigV4(credentials) => {
                let now = chrono::Utc::now();
                let amz_date = sigv4::amz_date(now);
                let host = match url.port() {
                    Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
                    None => url.host_str().unwrap_or_default().to_string(),
                };
                let canonical_uri = sigv4::canonical_uri(url.path());

                let mut headers = vec![
                    ("content-type", "application/json"),
                    ("host", host.as_str()),
                    ("x-amz-date", amz_date.as_str()),
                ];
                if let Some(token) = credentials.session_token.as_deref() {
                    headers.push(("x-amz-security-token", token));
                }

                let authorization = sigv4::authorization(
                    credentials,
                    &self.settings.region,
                    SIGNING_SERVICE,
                    now,
                    &sigv4::SignatureInput {
                        method: "POST",
                        canonical_uri: &canonical_uri,
                        canonical_query: "",
                        headers: &headers,
                        payload: &body,
                    },
                );

                let mut signed = builder
                    .header("X-Amz-Date", amz_date.as_str())
                    .header("Authorization", authorization);
                if let Some(token) = credentials.session_token.as_deref() {
                    signed = signed.header("X-Amz-Security-Token", token);
                }
                signed
            }
        };

        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| send_error(NAME, self.timeout, e))?;

        let response = check_status(NAME, response).await?;

        let converse: ConverseResponse = response.json().await.map_err(|e| decode_error(NAME, e))?;

        if let Some(usage) = &converse.usage {
            debug!(
                "Bedrock usage: {} input, {} output tokens",
                usage.input_tokens, usage.output_tokens
            );
        }

        converse
            .output
            .message
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ClassifierError::BackendRuntime {
                backend: NAME.to_string(),
                message: "response contained no text content".to_string(),
            })
    }
}

// Bedrock Converse API types

#[derive(Debug, Serialize)]
struct ConverseRequest {
    messages: Vec<ConverseMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConverseMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConverseResponse {
    output: ConverseOutput,
    #[serde(default)]
    usage: Option<ConverseUsage>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: ConverseMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseUsage {
    input_tokens: i64,
    output_tokens: i64,
}

#[async_trait]
impl PolicyClassifier for BedrockClassifier {
    fn name(&self) -> &str {
        NAME
    }

    async fn test_connection(&self) -> bool {
        match self.converse(PING_PROMPT.to_string()).await {
            Ok(_) => {
                info!("Bedrock connection successful");
                true
            }
            Err(e) => {
                warn!("Bedrock connection failed: {}", e);
                false
            }
        }
    }

    async fn classify_policy(&self, policy: &Value) -> Result<ClassificationResult, ClassifierError> {
        info!(
            "Sending classification request to Bedrock model {} in {}",
            self.settings.model_id, self.settings.region
        );

        // Converse gets the instruction and the policy as a single user turn
        let prompt = format!("{}\n{}", self.system_instruction, build_user_prompt(policy));
        let reply = self.converse(prompt).await?;
        extract_classification(&reply)
    }
}
