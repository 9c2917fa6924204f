// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Synchronous request/response on top of streams.
//!
//! Each call gets a private stream: create it at the requested graph path,
//! admit one frame, wait on the sink with a timeout, destroy the stream and
//! drain anything that arrived late so it can't leak into a later call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Parameters;
use crate::engine::pipeline::Pipeline;
use crate::engine::response::{response_channel, FrameResponse};
use crate::engine::stream::StreamOptions;
use crate::errors::PipelineError;
use crate::observability::messages::engine::LateResponsesDrained;
use crate::observability::messages::StructuredLog;
use crate::traits::Swag;

pub struct RequestAdapter {
    pipeline: Arc<Pipeline>,
    timeout: Duration,
    next_stream: AtomicU64,
}

impl RequestAdapter {
    /// Uses the definition's `response_timeout_secs` as the wait window
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let timeout = pipeline.definition().runtime.get_response_timeout();
        Self {
            pipeline,
            timeout,
            next_stream: AtomicU64::new(0),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one frame through the graph and return its terminal response.
    ///
    /// An element-reported failure comes back as `Ok` with an ERROR
    /// response; only an empty sink after the window is `ResponseTimeout`.
    pub async fn invoke_graph(
        &self,
        graph_path: Option<&str>,
        parameters: Parameters,
        frame_data: Swag,
    ) -> Result<FrameResponse, PipelineError> {
        let stream_id = format!(
            "{}-invoke-{}",
            self.pipeline.name(),
            self.next_stream.fetch_add(1, Ordering::Relaxed)
        );
        let (sink, responses) = response_channel();

        let mut options = StreamOptions::new().parameters(parameters);
        if let Some(graph_path) = graph_path {
            options = options.graph_path(graph_path);
        }
        self.pipeline
            .create_stream(stream_id.clone(), options, sink)
            .await?;

        let result = match self.pipeline.create_frame(&stream_id, frame_data, None) {
            Ok(_) => responses.recv_timeout(self.timeout).await,
            Err(error) => Err(error),
        };

        self.pipeline.destroy_stream(&stream_id).await;
        let late = responses.drain().await;
        if !late.is_empty() {
            LateResponsesDrained {
                stream_id: &stream_id,
                count: late.len(),
            }
            .log();
        }

        result
    }

    /// Invoke an element advertised as a tool, with `arguments` as frame data.
    pub async fn call_tool(
        &self,
        tool: &str,
        arguments: Swag,
    ) -> Result<FrameResponse, PipelineError> {
        if !self.pipeline.tools().iter().any(|t| t.name == tool) {
            return Err(PipelineError::UnknownGraphPath(tool.to_string()));
        }
        self.invoke_graph(Some(tool), Parameters::new(), arguments)
            .await
    }
}
