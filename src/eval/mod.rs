//! Batch comparison of classifiers over a labeled policy corpus

mod harness;
mod summary;

pub use harness::{EvaluationHarness, HarnessOptions};
pub use summary::{render_text, summarize, top_reasons, TOP_REASONS};
