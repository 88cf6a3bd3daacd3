use serde::Serialize;

use crate::error::InputValidationError;
use crate::llm::{LlmRequest, Persona};

/// Placeholder replaced by the submitted article in every instruction template.
pub const DOCUMENT_PLACEHOLDER: &str = "{document}";

/// One language-model-backed analyst: a persona plus an instruction template.
#[derive(Debug, Clone, Serialize)]
pub struct AnalystStage {
    name: String,
    role: String,
    goal: String,
    backstory: Option<String>,
    template: String,
    expected_output: String,
    consumes_upstream: bool,
    temperature: Option<f32>,
}

impl AnalystStage {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: None,
            template: template.into(),
            expected_output: String::new(),
            consumes_upstream: false,
            temperature: None,
        }
    }

    pub fn with_backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = Some(backstory.into());
        self
    }

    /// Describes the expected answer. Documentation only, never checked.
    pub fn with_expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    /// Forward the previous stage's trimmed output into this stage's instruction.
    pub fn consuming_upstream(mut self) -> Self {
        self.consumes_upstream = true;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn consumes_upstream(&self) -> bool {
        self.consumes_upstream
    }

    /// Build the instruction text for this stage.
    ///
    /// `upstream` is ignored unless the stage was declared with
    /// [`consuming_upstream`](Self::consuming_upstream); blank upstream text adds nothing.
    pub fn render(&self, document: &str, upstream: Option<&str>) -> Result<String, InputValidationError> {
        if document.trim().is_empty() {
            return Err(InputValidationError::EmptyDocument);
        }

        let mut instruction = self.template.replace(DOCUMENT_PLACEHOLDER, document);

        if self.consumes_upstream {
            if let Some(context) = upstream.map(str::trim).filter(|c| !c.is_empty()) {
                instruction.push_str("\n\nFindings from the previous analysis:\n");
                instruction.push_str(context);
            }
        }

        Ok(instruction)
    }

    /// Provider request for an already rendered instruction.
    pub fn request(&self, instruction: String) -> LlmRequest {
        LlmRequest::new(instruction)
            .with_persona(Persona {
                role: self.role.clone(),
                goal: self.goal.clone(),
                backstory: self.backstory.clone(),
            })
            .with_temperature(self.temperature)
    }
}
