pub mod error;
pub mod evaluation;
pub mod policy;

pub use error::{ClassifierError, EvalError, Result, CONNECTION_FAILED, ERROR};
pub use evaluation::{
    AccuracySummary, ClassificationResult, EvaluationRecord, EvaluationReport, ReasonCount,
};
pub use policy::{Label, LabeledPolicy};
