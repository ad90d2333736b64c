//! Accuracy aggregation and reporting

use std::collections::HashMap;
use std::fmt::Write;

use crate::models::{AccuracySummary, EvaluationRecord, EvaluationReport, ReasonCount};

/// How many failure reasons a summary lists
pub const TOP_REASONS: usize = 5;

/// Aggregate records into one summary per model.
///
/// `models` fixes the output order; models that only show up in `records`
/// follow in first-seen order. Sentinel records count as `failed` and never
/// toward accuracy.
pub fn summarize(models: &[&str], records: &[EvaluationRecord]) -> Vec<AccuracySummary> {
    let mut order: Vec<String> = models.iter().map(|m| m.to_string()).collect();
    for record in records {
        if !order.contains(&record.model) {
            order.push(record.model.clone());
        }
    }

    order
        .into_iter()
        .map(|model| {
            let mut correct = 0;
            let mut wrong = 0;
            let mut failed = 0;
            let mut reasons = Vec::new();

            for record in records.iter().filter(|r| r.model == model) {
                if record.is_failure() {
                    failed += 1;
                } else if record.matched == Some(true) {
                    correct += 1;
                } else {
                    wrong += 1;
                    if let Some(reason) = record.reason.as_deref().filter(|r| !r.is_empty()) {
                        reasons.push(reason.to_string());
                    }
                }
            }

            let total = correct + wrong;
            let accuracy = if total > 0 {
                correct as f64 / total as f64
            } else {
                0.0
            };

            AccuracySummary {
                model,
                correct,
                wrong,
                failed,
                accuracy,
                has_data: total > 0,
                top_reasons: top_reasons(&reasons, TOP_REASONS),
            }
        })
        .collect()
}

/// Most frequent reasons, highest count first; ties keep first-seen order
pub fn top_reasons(reasons: &[String], limit: usize) -> Vec<ReasonCount> {
    let mut counts: Vec<ReasonCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for reason in reasons {
        match index.get(reason.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(reason.as_str(), counts.len());
                counts.push(ReasonCount {
                    reason: reason.clone(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// Render a report as the human-readable summary printed by `compare`
pub fn render_text(report: &EvaluationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Classification Summary ===");
    let _ = writeln!(
        out,
        "Policies: {} weak, {} strong (run {})",
        report.weak_count, report.strong_count, report.run_id
    );

    for summary in &report.summaries {
        let _ = writeln!(out);
        let _ = writeln!(out, "Model: {}", summary.model);
        let _ = writeln!(out, "  Correct: {}", summary.correct);
        let _ = writeln!(out, "  Misclassified: {}", summary.wrong);
        if summary.failed > 0 {
            let _ = writeln!(out, "  Failed calls: {}", summary.failed);
        }
        if summary.has_data {
            let _ = writeln!(out, "  Accuracy: {:.2}%", summary.accuracy * 100.0);
        } else {
            let _ = writeln!(out, "  Accuracy: 0.00% (no data)");
        }

        if summary.top_reasons.is_empty() {
            let _ = writeln!(out, "  No reasons provided for misclassifications.");
        } else {
            let _ = writeln!(out, "  Most common reasons for misclassification:");
            for reason in &summary.top_reasons {
                let _ = writeln!(out, "    - {} ({})", reason.reason, reason.count);
            }
        }
    }

    out
}
