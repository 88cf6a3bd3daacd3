//! Two-graph credibility analysis: investigation, then classification, then persist.

use serde::Serialize;
use tracing::info;

use crate::error::{Error, InputValidationError, StorageError};
use crate::llm::UsageMetadata;
use crate::pipeline::graph::{
    CLASSIFICATION_STAGE, COLLECTOR_STAGE, FACT_CHECK_STAGE, LINGUISTIC_STAGE,
};
use crate::pipeline::{
    classification_graph, final_text, flatten, investigation_graph, DisplayRecord, PipelineExecutor,
    TaskGraph,
};
use crate::storage::{AnalysisRecord, AnalysisStore, AnalysisTexts};

/// Everything a client needs to render a finished analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub record: AnalysisRecord,
    pub investigation: Vec<DisplayRecord>,
    pub classification: Vec<DisplayRecord>,
    pub usage: UsageMetadata,
}

/// Options for building the two graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    pub temperature: Option<f32>,
    /// Seed the classifier with the investigation findings
    pub classification_uses_findings: bool,
}

pub struct AnalysisService {
    executor: PipelineExecutor,
    store: AnalysisStore,
    investigation: TaskGraph,
    classification: TaskGraph,
    classification_uses_findings: bool,
}

impl AnalysisService {
    pub fn new(executor: PipelineExecutor, store: AnalysisStore, options: AnalysisOptions) -> Self {
        Self {
            executor,
            store,
            investigation: investigation_graph(options.temperature),
            classification: classification_graph(options.temperature, options.classification_uses_findings),
            classification_uses_findings: options.classification_uses_findings,
        }
    }

    /// Run both graphs over `document` and store the verdict.
    ///
    /// Nothing is stored unless both graphs complete.
    pub async fn analyze(&self, document: &str) -> Result<AnalysisOutcome, Error> {
        if document.trim().is_empty() {
            return Err(InputValidationError::EmptyDocument.into());
        }

        let investigation_run = self.executor.execute(&self.investigation, document).await?;
        let investigation = flatten(&investigation_run);
        info!(stages = investigation.len(), "investigation finished");

        let findings = self
            .classification_uses_findings
            .then(|| findings_digest(&investigation));
        let classification_run = self
            .executor
            .execute_seeded(&self.classification, document, findings.as_deref())
            .await?;
        let classification = flatten(&classification_run);
        info!(stages = classification.len(), "classification finished");

        let texts = AnalysisTexts {
            collector: final_text(&investigation, COLLECTOR_STAGE),
            linguistic: final_text(&investigation, LINGUISTIC_STAGE),
            factcheck: final_text(&investigation, FACT_CHECK_STAGE),
            classification: final_text(&classification, CLASSIFICATION_STAGE),
        };

        let id = self.store.insert(document, &texts).await?;
        let record = self.store.get(id).await?.ok_or(StorageError::Query {
            op: "reload stored analysis",
            source: sqlx::Error::RowNotFound,
        })?;

        let mut usage = investigation_run.total_usage();
        usage += classification_run.total_usage();

        Ok(AnalysisOutcome {
            record,
            investigation,
            classification,
            usage,
        })
    }

    /// All stored analyses, newest first.
    pub async fn history(&self) -> Result<Vec<AnalysisRecord>, Error> {
        Ok(self.store.list_all().await?)
    }

    pub async fn record(&self, id: i64) -> Result<Option<AnalysisRecord>, Error> {
        Ok(self.store.get(id).await?)
    }
}

/// Investigation results rendered as upstream context for the classifier.
/// Placeholder records are left out.
fn findings_digest(records: &[DisplayRecord]) -> String {
    records
        .iter()
        .filter(|r| !r.placeholder)
        .map(|r| format!("## {}\n{}", r.agent_label, r.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
