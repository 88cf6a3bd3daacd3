use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::graph::TaskGraph;
use super::{RunResult, StageResult};
use crate::error::{Error, InputValidationError, StageExecutionError};
use crate::llm::LlmProvider;

/// Runs task graphs against one provider, one stage at a time.
///
/// No caching and no retries: a run depends only on the graph, the document and
/// whatever the provider answers.
#[derive(Clone)]
pub struct PipelineExecutor {
    provider: Arc<dyn LlmProvider>,
}

impl PipelineExecutor {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Run every stage of `graph` in declaration order.
    pub async fn execute(&self, graph: &TaskGraph, document: &str) -> Result<RunResult, Error> {
        self.execute_seeded(graph, document, None).await
    }

    /// Like [`execute`](Self::execute), with `seed` standing in as the upstream output
    /// for the first stage.
    ///
    /// On a provider failure or an empty completion the run stops at the failing stage and the error carries
    /// the stages already completed.
    pub async fn execute_seeded(
        &self,
        graph: &TaskGraph,
        document: &str,
        seed: Option<&str>,
    ) -> Result<RunResult, Error> {
        if document.trim().is_empty() {
            return Err(InputValidationError::EmptyDocument.into());
        }

        let mut run = RunResult::start(graph.name());
        info!(
            graph = graph.name(),
            run_id = %run.run_id,
            process = ?graph.process(),
            stages = graph.len(),
            "pipeline run started"
        );

        let mut upstream: Option<String> = seed.map(str::to_string);

        for stage in graph.stages() {
            let context = if stage.consumes_upstream() { upstream.as_deref() } else { None };
            let instruction = stage.render(document, context)?;
            debug!(
                stage = stage.name(),
                chars = instruction.len(),
                expected = stage.expected_output(),
                "stage instruction rendered"
            );

            let started = Instant::now();
            let response = match self.provider.generate(stage.request(instruction)).await {
                Ok(response) => response,
                Err(e) => return Err(stage_failed(graph, stage.name(), run, e)),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let output = response
                .content
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty());
            let Some(output) = output else {
                let e = anyhow::anyhow!("model {} returned no content", response.model);
                return Err(stage_failed(graph, stage.name(), run, e));
            };

            info!(
                stage = stage.name(),
                elapsed_ms,
                tokens = response.usage.total_tokens,
                "stage completed"
            );

            upstream = Some(output.clone());
            run.push(StageResult {
                stage: stage.name().to_string(),
                agent: stage.role().to_string(),
                description: stage.template().to_string(),
                output: Some(output),
                usage: response.usage,
                elapsed_ms,
            });
        }

        run.complete();
        info!(graph = graph.name(), run_id = %run.run_id, "pipeline run complete");
        Ok(run)
    }
}

/// Stop `run` at `stage` and wrap `source` with the completed stages.
fn stage_failed(graph: &TaskGraph, stage: &str, mut run: RunResult, source: anyhow::Error) -> Error {
    warn!(graph = graph.name(), stage, error = %source, "stage failed, stopping run");
    run.fail(stage);
    StageExecutionError {
        graph: graph.name().to_string(),
        stage: stage.to_string(),
        partial: run,
        source: source.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmRequest, LlmResponse, UsageMetadata};
    use crate::pipeline::graph::{
        classification_graph, investigation_graph, COLLECTOR_STAGE, FACT_CHECK_STAGE, LINGUISTIC_STAGE,
    };
    use crate::pipeline::RunStatus;
    use std::sync::Mutex;

    /// Answers "<role> says ok", fails for `fail_role`, and records every prompt.
    struct ScriptedProvider {
        fail_role: Option<&'static str>,
        blank_role: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self { fail_role: None, blank_role: None, prompts: Mutex::new(Vec::new()) }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
            let role = request.persona.map(|p| p.role).unwrap_or_default();
            self.prompts.lock().unwrap().push(request.prompt);
            if self.fail_role == Some(role.as_str()) {
                anyhow::bail!("LLM API error 500 Internal Server Error: upstream overloaded");
            }
            let content = if self.blank_role == Some(role.as_str()) {
                Some("   ".to_string())
            } else {
                Some(format!("  {} says ok\n", role))
            };
            Ok(LlmResponse {
                content,
                usage: UsageMetadata { prompt_tokens: 3, completion_tokens: 2, total_tokens: 5 },
                model: "scripted".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_all_stages_run_in_order() {
        let provider = Arc::new(ScriptedProvider::new());
        let executor = PipelineExecutor::new(provider.clone());

        let run = executor
            .execute(&investigation_graph(None), "Local officials confirm the bridge closure.")
            .await
            .unwrap();

        assert_eq!(run.len(), 3);
        assert_eq!(run.status, RunStatus::Complete);
        let names: Vec<_> = run.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(names, [COLLECTOR_STAGE, LINGUISTIC_STAGE, FACT_CHECK_STAGE]);
        // trimmed
        assert_eq!(run.stages[0].output.as_deref(), Some("Collector Agent says ok"));
        assert_eq!(run.stages[0].agent, "Collector Agent");
        assert_eq!(run.total_usage().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_previous_output_is_forwarded() {
        let provider = Arc::new(ScriptedProvider::new());
        let executor = PipelineExecutor::new(provider.clone());

        executor.execute(&investigation_graph(None), "Article body").await.unwrap();

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(!prompts[0].contains("says ok"));
        assert!(prompts[1].ends_with("Collector Agent says ok"));
        assert!(prompts[2].ends_with("Linguistic Agent says ok"));
        assert!(!prompts[2].contains("Collector Agent says ok"));
    }

    #[tokio::test]
    async fn test_failure_stops_run_and_keeps_partial() {
        let provider = Arc::new(ScriptedProvider { fail_role: Some("Linguistic Agent"), ..ScriptedProvider::new() });
        let executor = PipelineExecutor::new(provider.clone());

        let err = executor.execute(&investigation_graph(None), "Article body").await.unwrap_err();

        let err = match err {
            Error::StageExecution(err) => err,
            other => panic!("expected a stage execution error, got {other:?}"),
        };
        assert_eq!(err.stage, LINGUISTIC_STAGE);
        assert_eq!(err.graph, "investigation");
        assert_eq!(err.partial.len(), 1);
        assert_eq!(err.partial.stages[0].stage, COLLECTOR_STAGE);
        assert_eq!(err.partial.status, RunStatus::Failed { stage: LINGUISTIC_STAGE.to_string() });
        assert!(err.to_string().contains("upstream overloaded"));
        // fact-checker never called
        assert_eq!(provider.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_document_runs_nothing() {
        let provider = Arc::new(ScriptedProvider::new());
        let executor = PipelineExecutor::new(provider.clone());

        let err = executor.execute(&investigation_graph(None), " \n ").await.unwrap_err();

        assert!(matches!(err, Error::InputValidation(InputValidationError::EmptyDocument)));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_blank_completion_fails_the_stage() {
        let provider = Arc::new(ScriptedProvider { blank_role: Some("Linguistic Agent"), ..ScriptedProvider::new() });
        let executor = PipelineExecutor::new(provider.clone());

        let err = executor.execute(&investigation_graph(None), "Article body").await.unwrap_err();

        let err = match err {
            Error::StageExecution(err) => err,
            other => panic!("expected a stage execution error, got {other:?}"),
        };
        assert_eq!(err.stage, LINGUISTIC_STAGE);
        assert_eq!(err.partial.status, RunStatus::Failed { stage: LINGUISTIC_STAGE.to_string() });
        assert_eq!(err.partial.len(), 1);
        assert!(err.to_string().contains("returned no content"));
        // fact-checker never called
        assert_eq!(provider.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_seed_reaches_wired_classifier_only() {
        let provider = Arc::new(ScriptedProvider::new());
        let executor = PipelineExecutor::new(provider.clone());

        executor
            .execute_seeded(&classification_graph(None, false), "Article body", Some("FINDINGS"))
            .await
            .unwrap();
        executor
            .execute_seeded(&classification_graph(None, true), "Article body", Some("FINDINGS"))
            .await
            .unwrap();

        let prompts = provider.prompts();
        assert!(!prompts[0].contains("FINDINGS"));
        assert!(prompts[1].ends_with("FINDINGS"));
    }

    #[tokio::test]
    async fn test_empty_graph_yields_empty_complete_run() {
        let executor = PipelineExecutor::new(Arc::new(ScriptedProvider::new()));

        let run = executor.execute(&TaskGraph::sequential("noop", Vec::new()), "text").await.unwrap();

        assert!(run.is_empty());
        assert!(run.is_complete());
    }
}
