// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::sync::Arc;

use crate::config::GraphDefinition;
use crate::engine::frame::{Frame, FrameId};
use crate::engine::parameters::{
    value_as_bool, value_as_f64, value_as_i64, value_as_list, value_as_string,
};
use crate::engine::pipeline::PipelineShared;
use crate::engine::scheduler::{spawn_generator, GeneratorOptions};
use crate::engine::stream::{FrameOrigin, Stream, StreamVariables};
use crate::errors::PipelineError;
use crate::traits::Swag;

/// What an element sees of the engine during one hook invocation.
///
/// A context is scoped to one element on one stream and, inside
/// `process_frame`, to the frame being processed. Parameter lookups resolve
/// through the stream, element and pipeline scopes in that order.
pub struct ElementContext<'a> {
    shared: &'a Arc<PipelineShared>,
    stream: &'a Arc<Stream>,
    element: &'a str,
    frame: Option<&'a Frame>,
}

impl<'a> ElementContext<'a> {
    pub(crate) fn new(
        shared: &'a Arc<PipelineShared>,
        stream: &'a Arc<Stream>,
        element: &'a str,
        frame: Option<&'a Frame>,
    ) -> Self {
        Self {
            shared,
            stream,
            element,
            frame,
        }
    }

    pub fn element_name(&self) -> &str {
        self.element
    }

    pub fn stream_id(&self) -> &str {
        self.stream.id()
    }

    pub fn stream(&self) -> &Stream {
        self.stream
    }

    /// The frame being processed; `None` in stream hooks and generators
    pub fn frame(&self) -> Option<&Frame> {
        self.frame
    }

    pub fn frame_id(&self) -> Option<FrameId> {
        self.frame.map(|frame| frame.frame_id)
    }

    pub fn definition(&self) -> &GraphDefinition {
        &self.shared.definition
    }

    /// Baseline resident memory captured when the pipeline was built
    pub fn pipeline_start_memory(&self) -> Option<u64> {
        self.shared.start_memory
    }

    /// Resolve `key` for this element; `found` is false only when no scope
    /// defines it and `default` was returned.
    pub fn get_parameter(&self, key: &str, default: impl Into<Value>) -> (Value, bool) {
        self.shared
            .resolver
            .resolve(self.stream.parameters(), self.element, key, default.into())
    }

    /// Defined parameter value, or `None`
    pub fn parameter(&self, key: &str) -> Option<Value> {
        match self.get_parameter(key, Value::Null) {
            (value, true) => Some(value),
            (_, false) => None,
        }
    }

    pub fn parameter_i64(&self, key: &str, default: i64) -> i64 {
        self.parameter(key)
            .as_ref()
            .and_then(value_as_i64)
            .unwrap_or(default)
    }

    pub fn parameter_f64(&self, key: &str, default: f64) -> f64 {
        self.parameter(key)
            .as_ref()
            .and_then(value_as_f64)
            .unwrap_or(default)
    }

    pub fn parameter_bool(&self, key: &str, default: bool) -> bool {
        self.parameter(key)
            .as_ref()
            .and_then(value_as_bool)
            .unwrap_or(default)
    }

    pub fn parameter_string(&self, key: &str) -> Option<String> {
        self.parameter(key).as_ref().and_then(value_as_string)
    }

    pub fn parameter_list(&self, key: &str) -> Vec<String> {
        self.parameter(key)
            .as_ref()
            .map(value_as_list)
            .unwrap_or_default()
    }

    /// Lock the stream's variables. Hold the guard only as long as needed:
    /// every element of the stream contends for it.
    pub async fn variables(&self) -> tokio::sync::MutexGuard<'a, StreamVariables> {
        let stream: &'a Stream = self.stream;
        stream.variables().await
    }

    /// Inject a new frame into this stream, optionally at another graph path.
    ///
    /// Fails like external admission: unknown graph path, missing required
    /// inputs, or a stream that has been destroyed.
    pub fn create_frame(
        &self,
        frame_data: Swag,
        graph_path: Option<&str>,
    ) -> Result<FrameId, PipelineError> {
        self.shared
            .admit(self.stream, frame_data, graph_path, FrameOrigin::Element)
    }

    /// Register this element as a frame generator for the stream.
    ///
    /// Called from `start_stream`, generation begins once every element on
    /// the stream's path has started; called later, it begins immediately.
    pub fn create_frames(&self, options: GeneratorOptions) {
        if !self.stream.defer_generator(self.element, options.clone()) {
            spawn_generator(
                self.shared.clone(),
                self.stream.clone(),
                self.element.to_string(),
                options,
            );
        }
    }
}
