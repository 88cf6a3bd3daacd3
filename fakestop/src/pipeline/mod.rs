//! Sequential analyst pipeline: stages, graphs, the executor that runs them and the
//! extractor that turns a run into display records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::llm::UsageMetadata;

pub mod executor;
pub mod extract;
pub mod graph;
pub mod stage;

pub use executor::PipelineExecutor;
pub use extract::{final_text, flatten, flatten_with_issues, DisplayRecord, NO_RESULT};
pub use graph::{classification_graph, investigation_graph, Process, TaskGraph};
pub use stage::AnalystStage;

/// Request-scoped progress tag of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Complete,
    Failed { stage: String },
}

/// Output of one stage in one run.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: String,
    /// Agent label shown to the user
    pub agent: String,
    /// Instruction template the stage was declared with
    pub description: String,
    /// Trimmed completion text. The executor never records a stage without one.
    pub output: Option<String>,
    pub usage: UsageMetadata,
    pub elapsed_ms: u64,
}

/// Ordered stage results of one graph execution.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub graph: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageResult>,
}

impl RunResult {
    pub fn start(graph: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            graph: graph.into(),
            status: RunStatus::InProgress,
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    pub(crate) fn complete(&mut self) {
        self.status = RunStatus::Complete;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, stage: impl Into<String>) {
        self.status = RunStatus::Failed { stage: stage.into() };
        self.finished_at = Some(Utc::now());
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    pub fn total_usage(&self) -> UsageMetadata {
        let mut total = UsageMetadata::default();
        for stage in &self.stages {
            total += stage.usage;
        }
        total
    }
}
