//! Text summary builder for CLI output.

use crate::model::RunSummary;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms} ms")
    } else {
        format!("{:.2} s", ms as f64 / 1_000.0)
    }
}

/// Build the closing summary shown after a run.
pub(crate) fn build_text_summary(summary: &RunSummary) -> TextSummary {
    let status = if summary.failures == 0 {
        "PASSED"
    } else {
        "FAILED"
    };
    TextSummary {
        lines: vec![
            String::new(),
            format!("Result:   {status}"),
            format!("Requests: {}", summary.total),
            format!("Failures: {}", summary.failures),
            format!("Duration: {}", format_duration_ms(summary.duration_ms)),
        ],
    }
}
