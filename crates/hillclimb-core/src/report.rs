//! Run report with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{EvaluationResult, Status};

/// Outcome of one run over a list of datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub id: Uuid,
    /// When the run finished.
    pub created_at: DateTime<Utc>,
    /// Whether model output was streamed to the terminal.
    pub streamed_output: bool,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// One result per dataset, in input order.
    pub results: Vec<EvaluationResult>,
}

/// Number of datasets per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub better: usize,
    pub same: usize,
    pub worse: usize,
    pub failed: usize,
}

impl RunReport {
    /// Count results by status.
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for r in &self.results {
            match r.status {
                Status::Better => tally.better += 1,
                Status::Same => tally.same += 1,
                Status::Worse => tally.worse += 1,
                Status::Failed => tally.failed += 1,
            }
        }
        tally
    }

    /// Look up the result for a dataset token.
    pub fn result(&self, token: &str) -> Option<&EvaluationResult> {
        self.results.iter().find(|r| r.dataset.token() == token)
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: RunReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}
