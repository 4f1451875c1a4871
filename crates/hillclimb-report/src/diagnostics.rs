//! Per-dataset diagnostic block, printed when a dataset finishes.

use hillclimb_core::model::{EvaluationResult, ModelOutput};

use crate::style::Palette;

/// Shown instead of the model output when it went straight to the terminal.
pub const STREAMED_PLACEHOLDER: &str = "See above\n";

/// Summary line, model output, scorer stderr, and the error if there was one.
pub fn render_diagnostics(result: &EvaluationResult, palette: Palette) -> String {
    let headline = match &result.error {
        None => format!(
            "Dataset {} finished with a score of {}.",
            result.dataset,
            result.final_score()
        ),
        Some(_) => format!("Dataset {} failed.", result.dataset),
    };

    let model_text = match &result.model_output {
        ModelOutput::Captured(text) => text.as_str(),
        ModelOutput::Streamed => STREAMED_PLACEHOLDER,
        ModelOutput::NotRun => "(model did not run)\n",
    };

    let mut out = String::new();
    out.push_str(&palette.blue(&palette.bold(&headline)));
    out.push('\n');
    out.push_str(&palette.bold("- model stdout & stderr:"));
    out.push('\n');
    push_block(&mut out, model_text);
    out.push_str(&palette.bold("- scorer stderr:"));
    out.push('\n');
    push_block(&mut out, &result.scorer_stderr);

    if let Some(error) = &result.error {
        out.push_str(&palette.bold("- error:"));
        out.push('\n');
        out.push_str(&palette.red(error));
        out.push('\n');
    }

    out
}

fn push_block(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        out.push('\n');
    }
}
