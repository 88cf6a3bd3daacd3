// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fakestop::analysis::{AnalysisOptions, AnalysisService};
use fakestop::llm::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use fakestop::pipeline::PipelineExecutor;
use fakestop::storage::AnalysisStore;
use sqlx::sqlite::SqlitePoolOptions;

/// Provider double: answers per agent role, can fail or go silent for one role,
/// and records every (role, prompt) it was asked.
#[derive(Default)]
pub struct ScriptedProvider {
    pub fail_role: Option<&'static str>,
    pub silent_role: Option<&'static str>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedProvider {
    pub fn failing(role: &'static str) -> Self {
        Self { fail_role: Some(role), ..Self::default() }
    }

    pub fn silent(role: &'static str) -> Self {
        Self { silent_role: Some(role), ..Self::default() }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        let role = request.persona.map(|p| p.role).unwrap_or_default();
        self.calls.lock().unwrap().push((role.clone(), request.prompt));

        if self.fail_role == Some(role.as_str()) {
            anyhow::bail!("LLM request timed out");
        }
        let content = if self.silent_role == Some(role.as_str()) {
            None
        } else {
            Some(format!("\n{} findings\n", role))
        };
        Ok(LlmResponse {
            content,
            usage: UsageMetadata { prompt_tokens: 20, completion_tokens: 10, total_tokens: 30 },
            model: "scripted".to_string(),
        })
    }
}

pub async fn memory_store() -> AnalysisStore {
    // one connection: every in-memory connection is a separate database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test pool");
    let store = AnalysisStore::new(pool);
    store.initialize().await.expect("initialize store");
    store
}

pub async fn service_with(provider: Arc<ScriptedProvider>, options: AnalysisOptions) -> AnalysisService {
    AnalysisService::new(PipelineExecutor::new(provider), memory_store().await, options)
}
