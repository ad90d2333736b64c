use serde::{Deserialize, Serialize};

/// LLM backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[value(name = "openai")]
    OpenAi,
    Bedrock,
    Ollama,
    #[value(name = "huggingface")]
    HuggingFace,
}

impl BackendKind {
    /// Every backend, in the order the comparison runs them
    pub const ALL: [BackendKind; 4] = [
        BackendKind::OpenAi,
        BackendKind::Bedrock,
        BackendKind::Ollama,
        BackendKind::HuggingFace,
    ];

    /// Model name used in evaluation records and summaries
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Bedrock => "Bedrock",
            Self::Ollama => "Ollama",
            Self::HuggingFace => "HuggingFace",
        }
    }

    /// Name of the classifier type serving this backend
    pub const fn classifier_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAiClassifier",
            Self::Bedrock => "BedrockClassifier",
            Self::Ollama => "OllamaClassifier",
            Self::HuggingFace => "HuggingFaceClassifier",
        }
    }

    /// Look a backend up by model name or CLI value, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| {
            kind.model_name().to_ascii_lowercase() == lower || kind.to_string() == lower
        })
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Bedrock => write!(f, "bedrock"),
            Self::Ollama => write!(f, "ollama"),
            Self::HuggingFace => write!(f, "huggingface"),
        }
    }
}

/// Static AWS credentials for SigV4 signing
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// How Bedrock requests are authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BedrockAuth {
    Bearer(String),
    SigV4(AwsCredentials),
}

#[derive(Debug, Clone)]
pub struct BedrockSettings {
    pub model_id: String,
    pub region: String,
    /// Overrides `https://bedrock-runtime.{region}.amazonaws.com`
    pub endpoint_url: Option<String>,
    pub auth: Option<BedrockAuth>,
}

impl BedrockSettings {
    pub fn endpoint(&self) -> String {
        match &self.endpoint_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: i32,
}

impl OpenAiSettings {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com".to_string(),
            temperature: 0.2,
            max_tokens: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub model_id: String,
    pub host: String,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceSettings {
    pub model_id: String,
    /// Local inference server holding the model weights
    pub endpoint: String,
    pub max_new_tokens: i32,
    pub temperature: f32,
}

impl HuggingFaceSettings {
    pub fn new(model_id: &str, endpoint: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            max_new_tokens: 500,
            temperature: 0.2,
        }
    }
}
