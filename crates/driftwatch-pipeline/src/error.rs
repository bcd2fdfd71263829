//! Error types for driftwatch-pipeline

use std::time::Duration;
use thiserror::Error;

/// Result type for driftwatch-pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for driftwatch-pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] driftwatch_core::Error),

    /// Generative model or web search failed
    #[error("External call failed: {0}")]
    ExternalCall(String),

    /// A single external call exceeded its deadline
    #[error("External call timed out after {0:?}")]
    Timeout(Duration),

    /// Model output could not be interpreted
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// A stage read a state field no earlier stage has written
    #[error("Stage '{stage}' needs '{field}', which has not been produced yet")]
    MissingInput {
        stage: &'static str,
        field: &'static str,
    },

    /// A stage tried to overwrite a populated state field
    #[error("Stage '{stage}' tried to overwrite '{field}'")]
    SlotAlreadyWritten {
        stage: &'static str,
        field: &'static str,
    },

    /// A stage failed; `source` carries the cause
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// The run was cancelled before or during `stage`
    #[error("Run cancelled during stage '{stage}'")]
    Cancelled { stage: &'static str },

    /// Agent error from llm-toolkit
    #[error("Agent error: {0}")]
    Agent(#[from] llm_toolkit::agent::AgentError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the root cause is a missing subject or record
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Core(e) => e.is_not_found(),
            Error::Stage { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether the error came from cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled { .. } => true,
            Error::Stage { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Whether retrying the same external call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ExternalCall(_) | Error::Timeout(_) | Error::Agent(_)
        )
    }

    /// Name of the stage that failed, if known
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Error::Stage { stage, .. } | Error::Cancelled { stage } => Some(*stage),
            Error::MissingInput { stage, .. } | Error::SlotAlreadyWritten { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }

    /// Innermost error, with stage attribution removed
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn in_stage(self, stage: &'static str) -> Self {
        match self {
            // Already attributed
            Error::Stage { .. } | Error::Cancelled { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_survives_stage_wrapping() {
        let err = Error::from(driftwatch_core::Error::subject_not_found(9)).in_stage("extract");
        assert!(err.is_not_found());
        assert_eq!(err.stage(), Some("extract"));
        assert!(err.to_string().contains("Subject not found: 9"));
        assert!(matches!(err.root_cause(), Error::Core(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(Error::ExternalCall("503".into()).is_retryable());
        assert!(!Error::MalformedOutput("x".into()).is_retryable());
        assert!(!Error::Cancelled { stage: "drift" }.is_retryable());
    }
}
