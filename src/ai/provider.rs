use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use serde_json::Value;

use crate::models::{ClassificationResult, ClassifierError};

/// Prompt used for connection checks
pub const PING_PROMPT: &str = "Ping";

/// Trait for LLM policy classifiers
#[async_trait]
pub trait PolicyClassifier: Send + Sync {
    /// Display name of the classifier
    fn name(&self) -> &str;

    /// Send a trivial prompt and report whether the backend answered.
    ///
    /// Never fails: errors are logged and reported as `false`.
    async fn test_connection(&self) -> bool;

    /// Ask the backend to grade a policy as Weak or Strong
    async fn classify_policy(&self, policy: &Value) -> Result<ClassificationResult, ClassifierError>;
}

/// User turn of every classification prompt
pub fn build_user_prompt(policy: &Value) -> String {
    let pretty = serde_json::to_string_pretty(policy).unwrap_or_else(|_| policy.to_string());
    format!(
        "Here is the IAM policy:\n{}\nReturn only the JSON output.",
        pretty
    )
}

/// Pull the verdict out of a raw backend reply.
///
/// Everything before the first `{` is dropped and the rest must parse as a
/// single JSON object; trailing text is an error. A `{` inside the preamble
/// breaks the parse.
pub fn extract_classification(text: &str) -> Result<ClassificationResult, ClassifierError> {
    let start = text.find('{').ok_or_else(|| {
        ClassifierError::ClassificationParse(format!(
            "no JSON object in response: {}",
            preview(text)
        ))
    })?;

    let value: Value = serde_json::from_str(&text[start..]).map_err(|e| {
        ClassifierError::ClassificationParse(format!("{} in response: {}", e, preview(text)))
    })?;

    let object = value.as_object().ok_or_else(|| {
        ClassifierError::ClassificationParse("response JSON is not an object".to_string())
    })?;

    Ok(ClassificationResult {
        classification: field_as_string(object.get("classification")),
        reason: field_as_string(object.get("reason")),
    })
}

fn field_as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Map a transport error from reqwest onto the error taxonomy
pub(crate) fn send_error(backend: &str, timeout: Duration, err: reqwest::Error) -> ClassifierError {
    if err.is_timeout() {
        ClassifierError::Timeout(backend.to_string(), timeout.as_secs())
    } else if err.is_connect() {
        ClassifierError::ConnectionFailed(backend.to_string(), err.to_string())
    } else {
        ClassifierError::BackendRuntime {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }
}

/// Turn a non-success HTTP status into an error; auth rejections count as connection failures
pub(crate) async fn check_status(backend: &str, response: Response) -> Result<Response, ClassifierError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        Err(ClassifierError::ConnectionFailed(
            backend.to_string(),
            format!("authentication rejected ({}): {}", status, body),
        ))
    } else {
        Err(ClassifierError::BackendRuntime {
            backend: backend.to_string(),
            message: format!("returned error {}: {}", status, body),
        })
    }
}

/// Map a body decoding failure onto the error taxonomy
pub(crate) fn decode_error(backend: &str, err: reqwest::Error) -> ClassifierError {
    ClassifierError::BackendRuntime {
        backend: backend.to_string(),
        message: format!("Failed to parse response: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === extract_classification tests ===

    #[test]
    fn test_extract_discards_preamble() {
        let text = r#"Sure! Here is the result: {"classification": "Weak", "reason": "no wildcard"}"#;
        let result = extract_classification(text).unwrap();
        assert_eq!(result.classification.as_deref(), Some("Weak"));
        assert_eq!(result.reason.as_deref(), Some("no wildcard"));
    }

    #[test]
    fn test_extract_plain_json() {
        let result = extract_classification(r#"{"classification": "Strong"}"#).unwrap();
        assert_eq!(result.classification.as_deref(), Some("Strong"));
        assert_eq!(result.reason, None);
    }

    #[test]
    fn test_extract_allows_trailing_whitespace() {
        let result = extract_classification("{\"classification\": \"Weak\"}\n\n").unwrap();
        assert_eq!(result.classification.as_deref(), Some("Weak"));
    }

    #[test]
    fn test_extract_no_brace_is_parse_error() {
        let err = extract_classification("I cannot help with that.").unwrap_err();
        assert!(matches!(err, ClassifierError::ClassificationParse(_)));
    }

    #[test]
    fn test_extract_trailing_text_is_parse_error() {
        let text = r#"{"classification": "Weak"} Hope this helps!"#;
        assert!(matches!(
            extract_classification(text),
            Err(ClassifierError::ClassificationParse(_))
        ));
    }

    #[test]
    fn test_extract_brace_in_preamble_breaks_parse() {
        let text = r#"Using format {classification}: {"classification": "Weak"}"#;
        assert!(matches!(
            extract_classification(text),
            Err(ClassifierError::ClassificationParse(_))
        ));
    }

    #[test]
    fn test_extract_missing_classification() {
        let result = extract_classification(r#"{"reason": "unsure"}"#).unwrap();
        assert_eq!(result.classification, None);
        assert_eq!(result.reason.as_deref(), Some("unsure"));
    }

    #[test]
    fn test_extract_non_string_fields() {
        let result = extract_classification(r#"{"classification": null, "reason": ["a", "b"]}"#).unwrap();
        assert_eq!(result.classification, None);
        assert_eq!(result.reason.as_deref(), Some(r#"["a","b"]"#));
    }

    #[test]
    fn test_extract_markdown_fence_with_trailing_fence_fails() {
        let text = "```json\n{\"classification\": \"Weak\"}\n```";
        assert!(extract_classification(text).is_err());
    }

    // === build_user_prompt tests ===

    #[test]
    fn test_user_prompt_embeds_pretty_policy() {
        let policy = json!({"Version": "2012-10-17", "Statement": []});
        let prompt = build_user_prompt(&policy);
        assert!(prompt.starts_with("Here is the IAM policy:\n{\n  \""));
        assert!(prompt.contains("\"Version\": \"2012-10-17\""));
        assert!(prompt.ends_with("\nReturn only the JSON output."));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(500);
        let p = preview(&long);
        assert_eq!(p.len(), 123);
        assert!(p.ends_with("..."));
        assert_eq!(preview(" short "), "short");
    }
}
