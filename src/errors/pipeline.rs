// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by the pipeline's admission and response operations.
//!
//! Element-reported failures are not errors at this level: they travel to the
//! stream's response sink as diagnostic responses and never abort the stream.

use std::time::Duration;

use thiserror::Error;

use crate::errors::{ElementMapError, ValidationError};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stream with the same identifier is already live
    #[error("Stream '{0}' already exists")]
    DuplicateStream(String),

    /// The stream was never created, or has been destroyed
    #[error("Stream '{0}' does not exist")]
    UnknownStream(String),

    /// A graph path names an element that is not part of the definition
    #[error("Graph path '{0}' does not name an element in the pipeline")]
    UnknownGraphPath(String),

    /// Frame data does not carry the inputs the graph path requires
    #[error("Frame for stream '{stream_id}' at graph path '{graph_path}' is missing inputs: {}", missing.join(", "))]
    MissingInputs {
        stream_id: String,
        graph_path: String,
        missing: Vec<String>,
    },

    /// An element's start_stream hook returned ERROR
    #[error("Stream '{stream_id}' failed to start in element '{element}': {diagnostic}")]
    StreamStartFailed {
        stream_id: String,
        element: String,
        diagnostic: String,
    },

    /// No response arrived within the caller's window
    #[error("Timed out after {0:?} waiting for a pipeline response")]
    ResponseTimeout(Duration),

    /// The pipeline's event loop has been terminated
    #[error("Pipeline '{0}' has been terminated")]
    PipelineTerminated(String),

    #[error("Failed to load pipeline definition '{path}': {reason}")]
    DefinitionLoad { path: String, reason: String },

    #[error(transparent)]
    ElementMap(#[from] ElementMapError),

    #[error("Pipeline definition is invalid:\n{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<ValidationError>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs_lists_fields() {
        let error = PipelineError::MissingInputs {
            stream_id: "1".to_string(),
            graph_path: "pe_0".to_string(),
            missing: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Frame for stream '1' at graph path 'pe_0' is missing inputs: a, b"
        );
    }

    #[test]
    fn test_timeout_is_distinct_from_element_failure() {
        let error = PipelineError::ResponseTimeout(Duration::from_secs(10));
        assert!(matches!(error, PipelineError::ResponseTimeout(_)));
        assert!(error.to_string().contains("Timed out"));
    }
}
