use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::summary::summarize;
use crate::ai::{ClassifierRegistry, PolicyClassifier};
use crate::loader::PolicyLoader;
use crate::models::{
    ClassificationResult, ClassifierError, EvalError, EvaluationRecord, EvaluationReport, Label,
    LabeledPolicy, Result, CONNECTION_FAILED,
};

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Ping every model once before the run and skip the ones that don't answer
    pub test_connections: bool,
    /// Upper bound on a single classification call
    pub call_timeout: Option<Duration>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            test_connections: true,
            call_timeout: None,
        }
    }
}

/// Runs every registered classifier over a labeled corpus, one call at a time
pub struct EvaluationHarness<'a> {
    registry: &'a ClassifierRegistry,
    options: HarnessOptions,
}

impl<'a> EvaluationHarness<'a> {
    pub fn new(registry: &'a ClassifierRegistry, options: HarnessOptions) -> Self {
        Self { registry, options }
    }

    /// Load the corpus, evaluate it and aggregate the results.
    ///
    /// Nothing is sent to a backend when the corpus is empty.
    pub async fn run(&self, loader: &PolicyLoader) -> Result<EvaluationReport> {
        let policies = loader.load()?;
        self.run_policies(policies).await
    }

    /// Evaluate an already loaded corpus and aggregate the results
    pub async fn run_policies(&self, policies: Vec<LabeledPolicy>) -> Result<EvaluationReport> {
        let started_at = chrono::Utc::now();

        if self.registry.is_empty() {
            return Err(EvalError::InvalidConfiguration(
                "no models configured for comparison".to_string(),
            ));
        }

        let records = self.evaluate(&policies).await;
        let summaries = summarize(&self.registry.names(), &records);

        Ok(EvaluationReport {
            run_id: Uuid::new_v4(),
            started_at,
            weak_count: policies.iter().filter(|p| p.label == Label::Weak).count(),
            strong_count: policies.iter().filter(|p| p.label == Label::Strong).count(),
            records,
            summaries,
        })
    }

    /// One record per (policy, model) pair: policies outside, models inside, in registry order
    pub async fn evaluate(&self, policies: &[LabeledPolicy]) -> Vec<EvaluationRecord> {
        let unreachable = if self.options.test_connections && !policies.is_empty() {
            self.unreachable_models().await
        } else {
            HashSet::new()
        };

        let mut records = Vec::with_capacity(policies.len() * self.registry.len());

        for policy in policies {
            info!("Processing policy: {} (expected: {})", policy.name, policy.label);

            for (model, classifier) in self.registry.iter() {
                if unreachable.contains(model) {
                    records.push(EvaluationRecord::failed(
                        model,
                        &policy.name,
                        policy.label,
                        CONNECTION_FAILED,
                        format!("{} did not pass the connection test", classifier.name()),
                    ));
                    continue;
                }

                let outcome = self.classify(classifier, &policy.document).await;
                records.push(record_outcome(model, policy, outcome));
            }
        }

        records
    }

    async fn unreachable_models(&self) -> HashSet<String> {
        let mut unreachable = HashSet::new();
        for (model, classifier) in self.registry.iter() {
            if !classifier.test_connection().await {
                warn!("Model {} is unreachable, its policies will be marked {}", model, CONNECTION_FAILED);
                unreachable.insert(model.to_string());
            }
        }
        unreachable
    }

    /// Call a classifier in its own task so a panicking adapter becomes an error record
    async fn classify(
        &self,
        classifier: &Arc<dyn PolicyClassifier>,
        document: &serde_json::Value,
    ) -> std::result::Result<ClassificationResult, ClassifierError> {
        let name = classifier.name().to_string();
        let classifier = Arc::clone(classifier);
        let document = document.clone();
        let mut task = tokio::spawn(async move { classifier.classify_policy(&document).await });

        let joined = match self.options.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return Err(ClassifierError::Timeout(name, limit.as_secs()));
                }
            },
            None => task.await,
        };

        joined.unwrap_or_else(|e| {
            Err(ClassifierError::BackendRuntime {
                backend: name,
                message: format!("classifier task failed: {}", e),
            })
        })
    }
}

fn record_outcome(
    model: &str,
    policy: &LabeledPolicy,
    outcome: std::result::Result<ClassificationResult, ClassifierError>,
) -> EvaluationRecord {
    match outcome {
        Ok(result) => {
            match result.classification.as_deref() {
                Some(verdict) => info!(
                    "  {}: classified as {} | match: {}",
                    model,
                    verdict,
                    verdict == policy.label.as_str()
                ),
                None => warn!("  {}: result has no classification field", model),
            }
            EvaluationRecord::classified(model, &policy.name, policy.label, result)
        }
        Err(e) => match e.sentinel() {
            None => {
                warn!("  {}: model returned no result ({})", model, e);
                EvaluationRecord::empty(model, &policy.name, policy.label)
            }
            Some(sentinel) => {
                error!("  {}: error during classification: {}", model, e);
                EvaluationRecord::failed(model, &policy.name, policy.label, sentinel, e.to_string())
            }
        },
    }
}
