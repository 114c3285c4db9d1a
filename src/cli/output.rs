//! CLI output: error mapping and plain-text rendering for command results.

use crate::blocks::SelectedBlock;
use crate::error::MockError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &MockError) -> String {
    match e {
        MockError::SpecNotLoaded => {
            "No specification loaded. Pass --spec <FILE> or set spec.path in config.".to_string()
        }
        other => other.to_string(),
    }
}

/// Score table followed by the selected blocks.
pub fn format_block_report(scores: &[(String, f64)], selected: &[SelectedBlock]) -> String {
    let width = scores.iter().map(|(id, _)| id.len()).max().unwrap_or(0);
    let mut out = String::from("Scores:\n");
    for (id, score) in scores {
        out.push_str(&format!("  {:<width$}  {:.2}\n", id, score, width = width));
    }

    out.push_str("\nSelected:\n");
    if selected.is_empty() {
        out.push_str("  (none)\n");
    }
    for block in selected {
        out.push_str(&format!(
            "  {} ({:.2}, {} chars)\n",
            block.id,
            block.score,
            block.text.len()
        ));
    }
    out.trim_end().to_string()
}
