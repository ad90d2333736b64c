pub mod ai;
pub mod cli;
pub mod config;
pub mod eval;
pub mod loader;
pub mod models;
pub mod runner;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::ai::{create_classifier, load_system_instruction, BackendKind, ClassifierRegistry};
use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::eval::{render_text, EvaluationHarness, HarnessOptions};
use crate::loader::{read_policy, PolicyLoader};
use crate::models::{EvalError, Result};
use crate::runner::{SingleShotOutput, SingleShotRunner};

/// Parse arguments, run the chosen command and return the process exit code
pub fn run() -> i32 {
    // Environment variables already set win over .env
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "policy_judge=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            return 1;
        }
    };

    runtime.block_on(async move {
        match cli.command {
            Commands::Compare {
                policies_dir,
                glob,
                models,
                skip_connection_test,
                json,
            } => match compare(policies_dir, glob, &models, !skip_connection_test, json).await {
                Ok(()) => 0,
                Err(e) => {
                    tracing::error!("{}", e);
                    eprintln!("Error: {}\nHint: {}", e, e.recovery_suggestion());
                    1
                }
            },
            Commands::Classify {
                policy_file,
                backend,
                test_connection,
            } => {
                let output = classify(&policy_file, backend, test_connection).await;
                match serde_json::to_string_pretty(&output) {
                    Ok(text) => println!("{}", text),
                    Err(e) => tracing::error!("Failed to render output: {}", e),
                }
                if output.is_success() {
                    0
                } else {
                    1
                }
            }
        }
    })
}

/// Model selection for a comparison run: the named models, or every configured backend
pub fn select_models(config: &AppConfig, names: &[String]) -> Result<Vec<BackendKind>> {
    if names.is_empty() {
        let kinds = config.configured_backends();
        if kinds.is_empty() {
            return Err(EvalError::InvalidConfiguration(
                "no models configured: set OPENAI_API_KEY, BEDROCK_MODEL_ID, OLLAMA_MODEL_ID or HUGGINGFACE_MODEL_ID"
                    .to_string(),
            ));
        }
        return Ok(kinds);
    }

    let mut kinds = Vec::new();
    for name in names {
        let kind = BackendKind::from_name(name).ok_or_else(|| {
            EvalError::InvalidConfiguration(format!("unknown model '{}'", name))
        })?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

async fn compare(
    policies_dir: Option<std::path::PathBuf>,
    glob: Option<String>,
    models: &[String],
    test_connections: bool,
    json: bool,
) -> Result<()> {
    let config = AppConfig::from_env()?;

    let loader = PolicyLoader::new(
        policies_dir.unwrap_or_else(|| config.policy_dir.clone()),
        glob.as_deref().unwrap_or(&config.policy_glob),
    );

    // Load before any classifier is built: building one may already reach its backend
    let policies = loader.load()?;

    let kinds = select_models(&config, models)?;
    let registry = ClassifierRegistry::from_config(&config, &kinds).await?;

    let harness = EvaluationHarness::new(
        &registry,
        HarnessOptions {
            test_connections,
            call_timeout: Some(config.timeout),
        },
    );
    let report = harness.run_policies(policies).await?;

    if json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| {
            EvalError::InvalidConfiguration(format!("Failed to render report: {}", e))
        })?;
        println!("{}", text);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

async fn classify(
    path: &std::path::Path,
    kind: BackendKind,
    test_connection: bool,
) -> SingleShotOutput {
    let name = kind.classifier_name();

    let policy = match read_policy(path) {
        Ok(policy) => policy,
        Err(e) => {
            tracing::error!("{}", e);
            return SingleShotOutput::unreadable(name, path);
        }
    };

    let classifier = match build_single(kind).await {
        Ok(classifier) => classifier,
        Err(e) => {
            tracing::error!("{}", e);
            return SingleShotOutput::failure(name, path, e.to_string());
        }
    };

    SingleShotRunner::new(classifier.as_ref(), test_connection)
        .run(path, policy)
        .await
}

async fn build_single(kind: BackendKind) -> Result<std::sync::Arc<dyn ai::PolicyClassifier>> {
    let config = AppConfig::from_env()?;
    let system_instruction = load_system_instruction(&config)?;
    create_classifier(kind, &config, &system_instruction).await
}
