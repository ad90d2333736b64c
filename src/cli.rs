use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::ai::BackendKind;

#[derive(Parser, Debug)]
#[command(
    name = "policy-judge",
    version,
    about = "Grade IAM policies as Weak or Strong with LLM classifiers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every configured model over the labeled corpus and report accuracy
    Compare {
        #[arg(long, help = "Corpus root containing weak/ and strong/ (default: POLICY_DIR)")]
        policies_dir: Option<PathBuf>,
        #[arg(long, help = "File pattern inside each label directory (default: POLICY_GLOB)")]
        glob: Option<String>,
        #[arg(
            long = "model",
            value_name = "NAME",
            help = "Restrict the run to these models (OpenAI, Bedrock, Ollama, HuggingFace)"
        )]
        models: Vec<String>,
        #[arg(long, default_value_t = false, help = "Skip the per-model connection check")]
        skip_connection_test: bool,
        #[arg(long, default_value_t = false, help = "Print the full report as JSON")]
        json: bool,
    },
    /// Classify a single policy file with one backend
    Classify {
        policy_file: PathBuf,
        #[arg(long, value_enum, default_value_t = BackendKind::Bedrock)]
        backend: BackendKind,
        #[arg(long, default_value_t = false, help = "Ping the backend before classifying")]
        test_connection: bool,
    },
}
