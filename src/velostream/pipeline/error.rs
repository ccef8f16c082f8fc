//! Error types for pipeline construction and execution
//!
//! Construction errors are returned by the builder call that caused them. Execution
//! errors are carried in the [`PipelineResult`](super::PipelineResult) of the run, or
//! stored inside a materialized view until a stage reads it.

use crate::velostream::serialization::SerializationError;
use std::error::Error;
use std::sync::Arc;

/// Main error type for pipeline operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// Invalid options or configuration file
    #[error("Invalid pipeline configuration: {message}")]
    Configuration { message: String },

    /// Two stages registered under the same name
    #[error("Stage '{name}' is already registered in this pipeline")]
    DuplicateStageName { name: String },

    /// A builder call was given inputs it cannot turn into a stage
    #[error("Invalid construction of '{stage}': {message}")]
    Construction { stage: String, message: String },

    /// Encoding or decoding an element failed
    #[error("Serialization error in '{stage}': {source}")]
    Serialization {
        stage: String,
        #[source]
        source: SerializationError,
    },

    /// A stage read a view it did not declare as a side input
    #[error("Stage '{stage}' reads view '{view}' which is not one of its side inputs")]
    UndeclaredSideInput { stage: String, view: String },

    /// A view could not produce a value for the requested window
    #[error("View '{view}' could not be materialized: {message}")]
    ViewMaterialization { view: String, message: String },

    /// A map-shaped view saw the same key twice
    #[error("Duplicate key {key} in map view '{view}'")]
    DuplicateKey { view: String, key: String },

    /// User code inside a stage returned an error
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Arc<dyn Error + Send + Sync>,
    },

    /// Broken engine invariant
    #[error("Internal pipeline error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    /// Wrap a user error raised inside `stage`
    pub fn stage_failed<E>(stage: impl Into<String>, err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        PipelineError::StageFailed {
            stage: stage.into(),
            source: Arc::new(err),
        }
    }

    pub fn construction(stage: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Construction {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PipelineError::Internal {
            message: message.into(),
        }
    }

    /// Stage that raised the error, when known
    pub fn stage(&self) -> Option<&str> {
        match self {
            PipelineError::Construction { stage, .. }
            | PipelineError::Serialization { stage, .. }
            | PipelineError::UndeclaredSideInput { stage, .. }
            | PipelineError::StageFailed { stage, .. } => Some(stage),
            PipelineError::DuplicateStageName { name } => Some(name),
            PipelineError::ViewMaterialization { view, .. }
            | PipelineError::DuplicateKey { view, .. } => Some(view),
            PipelineError::Configuration { .. } | PipelineError::Internal { .. } => None,
        }
    }

    /// Downcast the user error carried by [`PipelineError::StageFailed`]
    pub fn user_error<E>(&self) -> Option<&E>
    where
        E: Error + 'static,
    {
        match self {
            PipelineError::StageFailed { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Whether the error was raised while the pipeline was being built
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration { .. }
                | PipelineError::DuplicateStageName { .. }
                | PipelineError::Construction { .. }
        )
    }
}

/// Result type alias for pipeline operations
pub type PipelineOutcome<T> = Result<T, PipelineError>;
