use thiserror::Error;

use crate::pipeline::RunResult;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can stop an analysis request.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InputValidation(#[from] InputValidationError),

    #[error(transparent)]
    StageExecution(#[from] Box<StageExecutionError>),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<StageExecutionError> for Error {
    fn from(err: StageExecutionError) -> Self {
        Error::StageExecution(Box::new(err))
    }
}

/// The submitted document cannot be analysed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputValidationError {
    #[error("document is empty; paste the news article to verify")]
    EmptyDocument,
}

/// A stage's provider call failed. Carries the stages that completed before it.
#[derive(Debug, Error)]
#[error("stage '{stage}' of the {graph} graph failed: {source}")]
pub struct StageExecutionError {
    pub graph: String,
    pub stage: String,
    /// Run state at the moment of failure, status `Failed`, completed stages only
    pub partial: RunResult,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

/// A stage result that could not be turned into display text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stage '{stage}': {reason}")]
pub struct ExtractionError {
    pub stage: String,
    pub reason: String,
}

/// Persistence failure. Reported to the caller as-is.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to {op}: {source}")]
    Query {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StorageError {
    pub(crate) fn query(op: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| StorageError::Query { op, source }
    }
}
