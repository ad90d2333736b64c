use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::json;
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::any;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

const ENV_KEYS: &[&str] = &[
    "LLM_INITIAL_PROMPT_PATH",
    "OPENAI_API_KEY",
    "BEDROCK_MODEL_ID",
    "OLLAMA_MODEL_ID",
    "HUGGINGFACE_MODEL_ID",
    "AWS_BEARER_TOKEN",
    "AWS_BEARER_TOKEN_BEDROCK",
    "AWS_BEDROCK_BEARER_TOKEN",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_REGION",
    "BEDROCK_ENDPOINT_URL",
    "OPENAI_BASE_URL",
    "OLLAMA_HOST",
    "HUGGINGFACE_ENDPOINT",
    "CLASSIFIER_TIMEOUT_SECS",
    "POLICY_DIR",
    "POLICY_GLOB",
];

/// Command with a clean environment, run from an empty directory
fn cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("policy-judge").unwrap();
    cmd.current_dir(dir);
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

fn corpus(dir: &Path) {
    fs::create_dir_all(dir.join("policies/weak")).unwrap();
    fs::create_dir_all(dir.join("policies/strong")).unwrap();
    fs::write(
        dir.join("policies/weak/admin.json"),
        r#"{"Version": "2012-10-17", "Statement": [{"Effect": "Allow", "Action": "*", "Resource": "*"}]}"#,
    )
    .unwrap();
    fs::write(
        dir.join("policies/strong/scoped.json"),
        r#"{"Version": "2012-10-17", "Statement": [{"Effect": "Allow", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::reports/*"}]}"#,
    )
    .unwrap();
    fs::write(dir.join("prompt.txt"), "Answer with JSON.").unwrap();
}

/// Ollama server that grades every policy Weak
async fn ollama_always_weak() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": "{\"classification\": \"Weak\", \"reason\": \"wild\"}"},
            "done": true
        })))
        .mount(&server)
        .await;
    server
}

fn with_ollama(cmd: &mut Command, server: &MockServer) {
    cmd.env("OLLAMA_MODEL_ID", "llama3")
        .env("OLLAMA_HOST", server.uri())
        .env("LLM_INITIAL_PROMPT_PATH", "prompt.txt");
}

#[test]
fn help_lists_commands() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("compare"))
        .stdout(contains("classify"));
}

#[test]
fn compare_empty_corpus_fails_before_any_model() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .args(["compare", "--policies-dir", "nowhere"])
        .env("OPENAI_API_KEY", "sk-test")
        .assert()
        .failure()
        .stderr(contains("No policies found"));
}

#[test]
fn compare_without_models_fails() {
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());
    cmd(tmp.path())
        .args(["compare", "--policies-dir", "policies"])
        .assert()
        .failure()
        .stderr(contains("no models configured"));
}

#[test]
fn compare_rejects_unknown_model() {
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());
    cmd(tmp.path())
        .args(["compare", "--policies-dir", "policies", "--model", "Gemini"])
        .assert()
        .failure()
        .stderr(contains("unknown model 'Gemini'"));
}

#[test]
fn classify_missing_file_prints_error_json() {
    let tmp = TempDir::new().unwrap();
    let output = cmd(tmp.path())
        .args(["classify", "missing.json"])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let json: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["model"], "BedrockClassifier");
    assert_eq!(json["input_file"], "missing.json");
    assert_eq!(json["error"], "Failed to read or parse the policy file.");
    assert!(json.get("ai_output").is_none());
}

#[test]
fn classify_unconfigured_backend_prints_error_json() {
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());

    cmd(tmp.path())
        .args(["classify", "policies/weak/admin.json", "--backend", "ollama"])
        .env("LLM_INITIAL_PROMPT_PATH", "prompt.txt")
        .assert()
        .code(1)
        .stdout(contains("\"model\": \"OllamaClassifier\""))
        .stdout(contains("OLLAMA_MODEL_ID"));
}

#[tokio::test(flavor = "multi_thread")]
async fn compare_unloadable_corpus_reaches_no_backend() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("policies/weak")).unwrap();
    fs::write(tmp.path().join("policies/weak/empty.json"), "  \n").unwrap();
    fs::write(tmp.path().join("prompt.txt"), "Answer with JSON.").unwrap();

    cmd(tmp.path())
        .args(["compare", "--policies-dir", "policies"])
        .env("HUGGINGFACE_MODEL_ID", "Qwen/Qwen2.5-0.5B-Instruct")
        .env("HUGGINGFACE_ENDPOINT", server.uri())
        .env("LLM_INITIAL_PROMPT_PATH", "prompt.txt")
        .assert()
        .failure()
        .stderr(contains("No policies found"));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn compare_prints_summary() {
    let server = ollama_always_weak().await;
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());

    let mut command = cmd(tmp.path());
    with_ollama(&mut command, &server);
    command
        .args(["compare", "--policies-dir", "policies"])
        .assert()
        .success()
        .stdout(contains("=== Classification Summary ==="))
        .stdout(contains("Policies: 1 weak, 1 strong"))
        .stdout(contains("Model: Ollama"))
        .stdout(contains("Accuracy: 50.00%"))
        .stdout(contains("- wild (1)"));

    // Connection test plus one call per policy
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn compare_json_report() {
    let server = ollama_always_weak().await;
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());

    let mut command = cmd(tmp.path());
    with_ollama(&mut command, &server);
    let output = command
        .args(["compare", "--policies-dir", "policies", "--json", "--skip-connection-test"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["weak_count"], 1);
    assert_eq!(report["strong_count"], 1);

    let records = report["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["policy"], "admin.json");
    assert_eq!(records[0]["match"], true);
    assert_eq!(records[1]["expected"], "Strong");
    assert_eq!(records[1]["match"], false);

    let summary = &report["summaries"][0];
    assert_eq!(summary["model"], "Ollama");
    assert_eq!(summary["has_data"], true);
    assert_eq!(summary["correct"], 1);
    assert_eq!(summary["wrong"], 1);
    assert_eq!(summary["top_reasons"][0]["reason"], "wild");

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn classify_prints_ai_output() {
    let server = ollama_always_weak().await;
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());

    let mut command = cmd(tmp.path());
    with_ollama(&mut command, &server);
    let output = command
        .args([
            "classify",
            "policies/weak/admin.json",
            "--backend",
            "ollama",
            "--test-connection",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["model"], "OllamaClassifier");
    assert_eq!(json["input_file"], "policies/weak/admin.json");
    assert_eq!(json["ai_output"]["classification"], "Weak");
    assert_eq!(json["ai_output"]["reason"], "wild");
    assert_eq!(json["ai_output"]["policy"]["Version"], "2012-10-17");
    assert!(json.get("error").is_none());
}
