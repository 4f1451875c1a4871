//! Summary table over a run's results.

use comfy_table::{Attribute, Cell, Color, Table};

use hillclimb_core::ledger::LedgerState;
use hillclimb_core::model::{Dataset, EvaluationResult, Status};
use hillclimb_core::report::Tally;

use crate::style::Palette;

/// Render one row per dataset, in the order given.
pub fn render_summary(results: &[EvaluationResult], palette: Palette) -> String {
    let mut table = Table::new();
    if palette.enabled() {
        table.enforce_styling();
    } else {
        table.force_no_tty();
    }
    table.set_header(vec!["Test case", "Old score", "New score", "Status"]);

    for r in results {
        table.add_row(vec![
            Cell::new(r.dataset.token()).add_attribute(Attribute::Bold),
            Cell::new(r.old_score),
            Cell::new(r.new_score),
            status_cell(r.status),
        ]);
    }

    table.to_string()
}

fn status_cell(status: Status) -> Cell {
    let cell = Cell::new(status.label());
    match status {
        Status::Better => cell.fg(Color::Green),
        Status::Same => cell.fg(Color::Yellow),
        Status::Worse => cell.fg(Color::Red),
        Status::Failed => cell.fg(Color::Red).add_attribute(Attribute::Bold),
    }
}

/// Recorded state of one dataset, as shown by `hillclimb status`.
#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub dataset: Dataset,
    pub state: LedgerState,
    pub has_output: bool,
}

/// Render the recorded best score and canonical output presence per dataset.
pub fn render_ledger(rows: &[LedgerRow]) -> String {
    let mut table = Table::new();
    table.force_no_tty();
    table.set_header(vec!["Test case", "Best score", "Best output"]);

    for row in rows {
        let score = match &row.state {
            LedgerState::Recorded(score) => score.to_string(),
            LedgerState::Missing => "-".to_string(),
            LedgerState::Invalid(_) => "invalid".to_string(),
        };
        let output = if row.has_output { "present" } else { "missing" };
        table.add_row(vec![
            Cell::new(row.dataset.token()),
            Cell::new(score),
            Cell::new(output),
        ]);
    }

    table.to_string()
}

/// One-line count of results per status.
pub fn render_tally(tally: &Tally, palette: Palette) -> String {
    format!(
        "{} better, {} same, {} worse, {} failed",
        palette.green(&tally.better.to_string()),
        palette.orange(&tally.same.to_string()),
        palette.red(&tally.worse.to_string()),
        palette.red(&tally.failed.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(token: &str, old: i64, new: i64, status: Status) -> EvaluationResult {
        let mut r = EvaluationResult::pending(Dataset::new(token).unwrap());
        r.old_score = old;
        r.new_score = new;
        r.status = status;
        r
    }

    #[test]
    fn rows_follow_input_order() {
        let results = vec![
            result("B", 10, 15, Status::Better),
            result("A", -1, -1, Status::Failed),
            result("C", 4, 4, Status::Same),
        ];

        let out = render_summary(&results, Palette::plain());

        assert!(out.contains("Test case"));
        assert!(out.contains("Status"));
        let b = out.find("better").unwrap();
        let a = out.find("failed").unwrap();
        let c = out.find("same").unwrap();
        assert!(b < a && a < c, "rows out of order:\n{out}");
        assert!(out.contains("15"));
        assert!(out.contains("-1"));
    }

    #[test]
    fn plain_table_has_no_escape_codes() {
        let out = render_summary(&[result("A", 1, 0, Status::Worse)], Palette::plain());
        assert!(!out.contains('\x1b'));
        assert!(out.contains("worse"));
    }

    #[test]
    fn ledger_rows() {
        let rows = vec![
            LedgerRow {
                dataset: Dataset::new("A").unwrap(),
                state: LedgerState::Recorded(42),
                has_output: true,
            },
            LedgerRow {
                dataset: Dataset::new("B").unwrap(),
                state: LedgerState::Missing,
                has_output: false,
            },
            LedgerRow {
                dataset: Dataset::new("C").unwrap(),
                state: LedgerState::Invalid("bad".into()),
                has_output: true,
            },
        ];

        let out = render_ledger(&rows);

        assert!(out.contains("Best score"));
        assert!(out.contains("42"));
        assert!(out.contains("invalid"));
        assert!(out.contains("missing"));
        assert!(out.contains("present"));
    }

    #[test]
    fn tally_line() {
        let tally = Tally {
            better: 2,
            same: 0,
            worse: 1,
            failed: 1,
        };
        assert_eq!(
            render_tally(&tally, Palette::plain()),
            "2 better, 0 same, 1 worse, 1 failed"
        );
    }
}
