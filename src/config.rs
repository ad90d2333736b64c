//! Process configuration
//!
//! Built once at start-up from the environment (after `.env` has been
//! loaded) and handed by reference to whatever needs it.

use std::path::PathBuf;
use std::time::Duration;

use crate::ai::{
    AwsCredentials, BackendKind, BedrockAuth, BedrockSettings, HuggingFaceSettings,
    OllamaSettings, OpenAiSettings,
};
use crate::models::{EvalError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLICY_DIR: &str = "part2/policies";
pub const DEFAULT_POLICY_GLOB: &str = "*.json";
const DEFAULT_AWS_REGION: &str = "us-east-1";
const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
const DEFAULT_HUGGINGFACE_ENDPOINT: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// System instruction sent with every classification prompt
    pub prompt_path: Option<PathBuf>,
    /// Per-call backend timeout
    pub timeout: Duration,
    pub policy_dir: PathBuf,
    pub policy_glob: String,
    pub openai: Option<OpenAiSettings>,
    pub bedrock: Option<BedrockSettings>,
    pub ollama: Option<OllamaSettings>,
    pub huggingface: Option<HuggingFaceSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            prompt_path: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            policy_dir: PathBuf::from(DEFAULT_POLICY_DIR),
            policy_glob: DEFAULT_POLICY_GLOB.to_string(),
            openai: None,
            bedrock: None,
            ollama: None,
            huggingface: None,
        }
    }
}

impl AppConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match get("CLASSIFIER_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    EvalError::InvalidConfiguration(format!(
                        "CLASSIFIER_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?;
                if secs == 0 {
                    return Err(EvalError::InvalidConfiguration(
                        "CLASSIFIER_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let openai = get("OPENAI_API_KEY").map(|key| {
            let mut settings = OpenAiSettings::new(&key);
            if let Some(model) = get("OPENAI_MODEL") {
                settings.model = model;
            }
            if let Some(url) = get("OPENAI_BASE_URL") {
                settings.base_url = url.trim_end_matches('/').to_string();
            }
            settings
        });

        let bedrock = get("BEDROCK_MODEL_ID").map(|model_id| {
            let bearer = get("AWS_BEARER_TOKEN")
                .or_else(|| get("AWS_BEARER_TOKEN_BEDROCK"))
                .or_else(|| get("AWS_BEDROCK_BEARER_TOKEN"));

            let auth = match bearer {
                Some(token) => Some(BedrockAuth::Bearer(token)),
                None => match (get("AWS_ACCESS_KEY_ID"), get("AWS_SECRET_ACCESS_KEY")) {
                    (Some(access_key_id), Some(secret_access_key)) => {
                        Some(BedrockAuth::SigV4(AwsCredentials {
                            access_key_id,
                            secret_access_key,
                            session_token: get("AWS_SESSION_TOKEN"),
                        }))
                    }
                    _ => None,
                },
            };

            BedrockSettings {
                model_id,
                region: get("AWS_REGION")
                    .or_else(|| get("AWS_DEFAULT_REGION"))
                    .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
                endpoint_url: get("BEDROCK_ENDPOINT_URL"),
                auth,
            }
        });

        let ollama = get("OLLAMA_MODEL_ID").map(|model_id| OllamaSettings {
            model_id,
            host: get("OLLAMA_HOST")
                .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string())
                .trim_end_matches('/')
                .to_string(),
        });

        let huggingface = get("HUGGINGFACE_MODEL_ID").map(|model_id| {
            let endpoint = get("HUGGINGFACE_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_HUGGINGFACE_ENDPOINT.to_string());
            HuggingFaceSettings::new(&model_id, &endpoint)
        });

        Ok(Self {
            prompt_path: get("LLM_INITIAL_PROMPT_PATH").map(PathBuf::from),
            timeout,
            policy_dir: get("POLICY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_POLICY_DIR)),
            policy_glob: get("POLICY_GLOB").unwrap_or_else(|| DEFAULT_POLICY_GLOB.to_string()),
            openai,
            bedrock,
            ollama,
            huggingface,
        })
    }

    /// Backends with their required settings present, in comparison order
    pub fn configured_backends(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| self.is_configured(*kind))
            .collect()
    }

    pub fn is_configured(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::OpenAi => self.openai.is_some(),
            BackendKind::Bedrock => self.bedrock.is_some(),
            BackendKind::Ollama => self.ollama.is_some(),
            BackendKind::HuggingFace => self.huggingface.is_some(),
        }
    }

    /// Environment variable that enables a backend
    pub fn missing_setting(kind: BackendKind) -> &'static str {
        match kind {
            BackendKind::OpenAi => "OPENAI_API_KEY",
            BackendKind::Bedrock => "BEDROCK_MODEL_ID",
            BackendKind::Ollama => "OLLAMA_MODEL_ID",
            BackendKind::HuggingFace => "HUGGINGFACE_MODEL_ID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.policy_dir, PathBuf::from("part2/policies"));
        assert_eq!(cfg.policy_glob, "*.json");
        assert!(cfg.prompt_path.is_none());
        assert!(cfg.configured_backends().is_empty());
    }

    #[test]
    fn test_configured_backends_keep_comparison_order() {
        let cfg = config(&[
            ("HUGGINGFACE_MODEL_ID", "Qwen/Qwen2.5-0.5B-Instruct"),
            ("BEDROCK_MODEL_ID", "anthropic.claude-3-haiku-20240307-v1:0"),
            ("OPENAI_API_KEY", "sk-test"),
        ])
        .unwrap();
        assert_eq!(
            cfg.configured_backends(),
            vec![BackendKind::OpenAi, BackendKind::Bedrock, BackendKind::HuggingFace]
        );
        assert_eq!(cfg.huggingface.unwrap().endpoint, "http://localhost:8080");
    }

    #[test]
    fn test_openai_defaults_and_overrides() {
        let cfg = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        let openai = cfg.openai.unwrap();
        assert_eq!(openai.model, "gpt-3.5-turbo");
        assert_eq!(openai.base_url, "https://api.openai.com");
        assert_eq!(openai.max_tokens, 300);

        let cfg = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("OPENAI_BASE_URL", "http://localhost:1234/"),
        ])
        .unwrap();
        let openai = cfg.openai.unwrap();
        assert_eq!(openai.model, "gpt-4o-mini");
        assert_eq!(openai.base_url, "http://localhost:1234");
    }

    #[test]
    fn test_bedrock_bearer_overrides_sigv4() {
        let cfg = config(&[
            ("BEDROCK_MODEL_ID", "m"),
            ("AWS_REGION", "eu-central-1"),
            ("AWS_BEARER_TOKEN", "bearer"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ])
        .unwrap();
        let bedrock = cfg.bedrock.unwrap();
        assert_eq!(bedrock.region, "eu-central-1");
        assert_eq!(bedrock.auth, Some(BedrockAuth::Bearer("bearer".to_string())));
    }

    #[test]
    fn test_bedrock_legacy_bearer_names() {
        let cfg = config(&[("BEDROCK_MODEL_ID", "m"), ("AWS_BEDROCK_BEARER_TOKEN", "legacy")]).unwrap();
        assert_eq!(
            cfg.bedrock.unwrap().auth,
            Some(BedrockAuth::Bearer("legacy".to_string()))
        );
    }

    #[test]
    fn test_bedrock_sigv4_credentials() {
        let cfg = config(&[
            ("BEDROCK_MODEL_ID", "m"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ])
        .unwrap();
        let bedrock = cfg.bedrock.unwrap();
        assert_eq!(bedrock.region, "us-east-1");
        match bedrock.auth {
            Some(BedrockAuth::SigV4(creds)) => {
                assert_eq!(creds.access_key_id, "AKID");
                assert!(creds.session_token.is_none());
            }
            other => panic!("expected SigV4 auth, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let cfg = config(&[("OPENAI_API_KEY", "  "), ("OLLAMA_MODEL_ID", "")]).unwrap();
        assert!(cfg.configured_backends().is_empty());
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(matches!(
            config(&[("CLASSIFIER_TIMEOUT_SECS", "soon")]),
            Err(EvalError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            config(&[("CLASSIFIER_TIMEOUT_SECS", "0")]),
            Err(EvalError::InvalidConfiguration(_))
        ));
        let cfg = config(&[("CLASSIFIER_TIMEOUT_SECS", "5")]).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(5));
    }
}
