use std::sync::Arc;

use tracing::info;

use super::create_classifier;
use super::provider::PolicyClassifier;
use super::settings::BackendKind;
use crate::config::AppConfig;
use crate::loader::read_text;
use crate::models::{EvalError, Result};

/// Ordered mapping from model name to classifier
#[derive(Default, Clone)]
pub struct ClassifierRegistry {
    entries: Vec<(String, Arc<dyn PolicyClassifier>)>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one classifier per backend, in the order given
    pub async fn from_config(config: &AppConfig, kinds: &[BackendKind]) -> Result<Self> {
        let system_instruction = load_system_instruction(config)?;

        let mut registry = Self::new();
        for kind in kinds {
            let classifier = create_classifier(*kind, config, &system_instruction).await?;
            info!("Initialized model {} ({})", kind.model_name(), classifier.name());
            registry.register(kind.model_name(), classifier);
        }
        Ok(registry)
    }

    /// Add a classifier. Re-registering a name replaces the classifier but keeps its position.
    pub fn register(&mut self, name: &str, classifier: Arc<dyn PolicyClassifier>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = classifier,
            None => self.entries.push((name.to_string(), classifier)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn PolicyClassifier>)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read the system instruction named by `LLM_INITIAL_PROMPT_PATH`
pub fn load_system_instruction(config: &AppConfig) -> Result<String> {
    let path = config.prompt_path.as_ref().ok_or_else(|| {
        EvalError::InvalidConfiguration("LLM_INITIAL_PROMPT_PATH is not set".to_string())
    })?;
    read_text(path)
}
