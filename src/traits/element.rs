// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::consts::DIAGNOSTIC_KEY;
use crate::config::Parameters;
use crate::engine::{ElementContext, FrameId};

/// Named values accumulated by a frame as it moves through the graph.
pub type Swag = BTreeMap<String, Value>;

/// Control outcome returned by every element hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Okay,
    Error,
    Stop,
}

/// Outcome and output fields of a hook invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementResponse {
    pub event: StreamEvent,
    pub outputs: Swag,
}

impl ElementResponse {
    pub fn okay(outputs: Swag) -> Self {
        Self {
            event: StreamEvent::Okay,
            outputs,
        }
    }

    /// OKAY with no output fields
    pub fn empty() -> Self {
        Self::okay(Swag::new())
    }

    /// ERROR carrying a diagnostic message under the `diagnostic` key
    pub fn error(diagnostic: impl Into<String>) -> Self {
        Self {
            event: StreamEvent::Error,
            outputs: Swag::from([(
                DIAGNOSTIC_KEY.to_string(),
                Value::String(diagnostic.into()),
            )]),
        }
    }

    pub fn stop() -> Self {
        Self {
            event: StreamEvent::Stop,
            outputs: Swag::new(),
        }
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.outputs.get(DIAGNOSTIC_KEY).and_then(Value::as_str)
    }
}

/// Result of one generator tick: zero, one or many frame payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorResponse {
    pub event: StreamEvent,
    pub frames: Vec<Swag>,
    pub diagnostic: Option<String>,
}

impl GeneratorResponse {
    pub fn frame(frame_data: Swag) -> Self {
        Self::frames(vec![frame_data])
    }

    pub fn frames(frames: Vec<Swag>) -> Self {
        Self {
            event: StreamEvent::Okay,
            frames,
            diagnostic: None,
        }
    }

    pub fn stop(diagnostic: impl Into<String>) -> Self {
        Self {
            event: StreamEvent::Stop,
            frames: vec![],
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn error(diagnostic: impl Into<String>) -> Self {
        Self {
            event: StreamEvent::Error,
            frames: vec![],
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Construction-time context handed to an element constructor.
///
/// `parameters` are the pipeline-wide parameters overlaid with the element's
/// own declared parameters, so constructors can read static configuration.
/// Per-frame lookups should still go through [`ElementContext::get_parameter`]
/// to honor stream overrides.
#[derive(Debug, Clone)]
pub struct ElementInit {
    pub name: String,
    pub class_name: String,
    pub protocol: Option<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub parameters: Parameters,
}

/// The unit of computation in a pipeline graph.
///
/// Only `process_frame` is required. Stream hooks and frame generation have
/// OKAY / "no frames" defaults so plain transform elements stay small.
///
/// Elements must not keep per-frame state on `self`: the same instance serves
/// every frame of every stream, possibly concurrently. Cross-frame state goes
/// through [`ElementContext::variables`], which is private to the stream.
#[async_trait]
pub trait Element: Send + Sync {
    /// Process one frame. `inputs` holds exactly the element's declared inputs.
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse;

    /// Called once per stream before any of its frames reach this element.
    async fn start_stream(&self, _context: &ElementContext<'_>) -> ElementResponse {
        ElementResponse::empty()
    }

    /// Called on stream teardown for every element whose `start_stream` ran.
    async fn stop_stream(&self, _context: &ElementContext<'_>) -> ElementResponse {
        ElementResponse::empty()
    }

    /// Produce frame data for a generator registered with
    /// [`ElementContext::create_frames`]. `frame_id` is the id the next frame
    /// of the stream will receive.
    async fn generate(&self, _context: &ElementContext<'_>, _frame_id: FrameId) -> GeneratorResponse {
        GeneratorResponse::stop("Element does not generate frames")
    }

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_carries_diagnostic() {
        let response = ElementResponse::error("boom");
        assert_eq!(response.event, StreamEvent::Error);
        assert_eq!(response.diagnostic(), Some("boom"));
    }

    #[test]
    fn test_okay_response_has_no_diagnostic() {
        let response = ElementResponse::okay(Swag::from([("b".to_string(), Value::from(1))]));
        assert_eq!(response.event, StreamEvent::Okay);
        assert_eq!(response.diagnostic(), None);
    }
}
