use serde::Serialize;
use tracing::warn;

use super::RunResult;
use crate::error::ExtractionError;

/// Text shown (and stored) for a stage that produced nothing readable.
pub const NO_RESULT: &str = "no result";

/// One row of the per-stage view shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub stage_label: String,
    pub agent_label: String,
    pub description: String,
    pub text: String,
    /// `text` is [`NO_RESULT`] rather than model output
    pub placeholder: bool,
}

/// Flatten a run into display records, collecting the stages that had to be
/// replaced by a placeholder.
pub fn flatten_with_issues(run: &RunResult) -> (Vec<DisplayRecord>, Vec<ExtractionError>) {
    let mut records = Vec::with_capacity(run.stages.len());
    let mut issues = Vec::new();

    for (index, stage) in run.stages.iter().enumerate() {
        let stage_label = if stage.stage.trim().is_empty() {
            format!("stage {}", index + 1)
        } else {
            stage.stage.clone()
        };

        let text = stage.output.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let placeholder = text.is_none();
        if placeholder {
            issues.push(ExtractionError {
                stage: stage_label.clone(),
                reason: "stage produced no output text".to_string(),
            });
        }

        records.push(DisplayRecord {
            stage_label,
            agent_label: stage.agent.clone(),
            description: stage.description.clone(),
            text: text.unwrap_or(NO_RESULT).to_string(),
            placeholder,
        });
    }

    (records, issues)
}

/// Flatten a run into display records. Never fails; unreadable stages are logged and
/// shown as [`NO_RESULT`].
pub fn flatten(run: &RunResult) -> Vec<DisplayRecord> {
    let (records, issues) = flatten_with_issues(run);
    for issue in &issues {
        warn!(graph = %run.graph, run_id = %run.run_id, %issue, "substituting placeholder for stage output");
    }
    records
}

/// Text of `stage` in `records`, or [`NO_RESULT`] when the stage is absent.
pub fn final_text(records: &[DisplayRecord], stage: &str) -> String {
    records
        .iter()
        .find(|r| r.stage_label == stage)
        .map(|r| r.text.clone())
        .unwrap_or_else(|| NO_RESULT.to_string())
}
