use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Core trait for LLM providers.
///
/// The pipeline treats a provider as an opaque capability: given a persona and an
/// instruction it returns completion text or fails. Retries and timeouts live here,
/// never in the executor.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Who the model is asked to be while answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub role: String,
    pub goal: String,
    pub backstory: Option<String>,
}

impl Persona {
    /// Render the persona as a system prompt.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!("You are {}.", self.role);
        if let Some(backstory) = self.backstory.as_deref().filter(|b| !b.trim().is_empty()) {
            prompt.push(' ');
            prompt.push_str(backstory.trim());
        }
        prompt.push_str("\nYour personal goal is: ");
        prompt.push_str(&self.goal);
        prompt
    }
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub persona: Option<Persona>,
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            persona: None,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
        }
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = Some(persona);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// `None` when the provider answered without any message content
    pub content: Option<String>,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl std::ops::AddAssign for UsageMetadata {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

pub mod remote;
