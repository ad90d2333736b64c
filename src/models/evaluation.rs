use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{CONNECTION_FAILED, ERROR};
use super::policy::Label;

/// Verdict extracted from a backend response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub classification: Option<String>,
    pub reason: Option<String>,
}

/// Outcome of one (model, policy) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub model: String,
    pub policy: String,
    pub expected: Label,
    pub classification: Option<String>,
    #[serde(rename = "match")]
    pub matched: Option<bool>,
    pub reason: Option<String>,
}

impl EvaluationRecord {
    /// Record for a backend that produced a result
    pub fn classified(model: &str, policy: &str, expected: Label, result: ClassificationResult) -> Self {
        let matched = result
            .classification
            .as_deref()
            .map(|c| c == expected.as_str());

        Self {
            model: model.to_string(),
            policy: policy.to_string(),
            expected,
            classification: result.classification,
            matched,
            reason: result.reason,
        }
    }

    /// Record for a call that returned nothing usable
    pub fn empty(model: &str, policy: &str, expected: Label) -> Self {
        Self {
            model: model.to_string(),
            policy: policy.to_string(),
            expected,
            classification: None,
            matched: None,
            reason: None,
        }
    }

    /// Record for a failed call, tagged with a sentinel classification
    pub fn failed(model: &str, policy: &str, expected: Label, sentinel: &str, reason: String) -> Self {
        Self {
            model: model.to_string(),
            policy: policy.to_string(),
            expected,
            classification: Some(sentinel.to_string()),
            matched: None,
            reason: Some(reason),
        }
    }

    /// True for `ConnectionFailed` and `Error` records, which never count toward accuracy
    pub fn is_failure(&self) -> bool {
        matches!(
            self.classification.as_deref(),
            Some(CONNECTION_FAILED) | Some(ERROR)
        )
    }
}

/// A failure reason and how often it was given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

/// Per-model accuracy aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub model: String,
    pub correct: usize,
    pub wrong: usize,
    /// Records excluded from accuracy because the call failed
    pub failed: usize,
    pub accuracy: f64,
    /// False when no record was scored, in which case `accuracy` is 0
    pub has_data: bool,
    pub top_reasons: Vec<ReasonCount>,
}

/// Everything a `compare` run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub weak_count: usize,
    pub strong_count: usize,
    pub records: Vec<EvaluationRecord>,
    pub summaries: Vec<AccuracySummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(classification: Option<&str>) -> ClassificationResult {
        ClassificationResult {
            classification: classification.map(str::to_string),
            reason: Some("because".to_string()),
        }
    }

    #[test]
    fn test_match_is_exact_string_equality() {
        let r = EvaluationRecord::classified("m", "p.json", Label::Weak, result(Some("Weak")));
        assert_eq!(r.matched, Some(true));

        let r = EvaluationRecord::classified("m", "p.json", Label::Weak, result(Some("weak")));
        assert_eq!(r.matched, Some(false));

        let r = EvaluationRecord::classified("m", "p.json", Label::Strong, result(Some("Weak")));
        assert_eq!(r.matched, Some(false));
    }

    #[test]
    fn test_missing_classification_has_no_match() {
        let r = EvaluationRecord::classified("m", "p.json", Label::Strong, result(None));
        assert_eq!(r.classification, None);
        assert_eq!(r.matched, None);
        assert_eq!(r.reason.as_deref(), Some("because"));
        assert!(!r.is_failure());
    }

    #[test]
    fn test_failed_records_are_failures() {
        let r = EvaluationRecord::failed("m", "p.json", Label::Weak, CONNECTION_FAILED, "down".to_string());
        assert!(r.is_failure());
        assert_eq!(r.matched, None);

        let r = EvaluationRecord::failed("m", "p.json", Label::Weak, ERROR, "boom".to_string());
        assert!(r.is_failure());
    }

    #[test]
    fn test_record_serializes_match_key() {
        let r = EvaluationRecord::classified("OpenAI", "p.json", Label::Weak, result(Some("Weak")));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["match"], true);
        assert_eq!(json["expected"], "Weak");
        assert!(json.get("matched").is_none());
    }
}
