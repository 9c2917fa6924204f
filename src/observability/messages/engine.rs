// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline, stream and frame lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Pipeline construction and termination
//! * Stream creation, expiry and destruction
//! * Frame admission, delivery and failure
//! * Frame generation and late response draining

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Pipeline built from a definition and ready to start.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use streamwood::observability::messages::engine::PipelineCreated;
///
/// let msg = PipelineCreated {
///     pipeline: "p_demo",
///     element_count: 5,
///     max_concurrency: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PipelineCreated<'a> {
    pub pipeline: &'a str,
    pub element_count: usize,
    pub max_concurrency: usize,
}

impl Display for PipelineCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created pipeline '{}': {} elements, max_concurrency={}",
            self.pipeline, self.element_count, self.max_concurrency
        )
    }
}

impl StructuredLog for PipelineCreated<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            element_count = self.element_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            pipeline = self.pipeline,
            element_count = self.element_count,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// Pipeline event loop stopped; every live stream has been destroyed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineTerminated<'a> {
    pub pipeline: &'a str,
    pub destroyed_streams: usize,
}

impl Display for PipelineTerminated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' terminated, destroyed {} live streams",
            self.pipeline, self.destroyed_streams
        )
    }
}

impl StructuredLog for PipelineTerminated<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            destroyed_streams = self.destroyed_streams,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_terminated",
            span_name = name,
            pipeline = self.pipeline,
            destroyed_streams = self.destroyed_streams,
        )
    }
}

/// Stream admitted to a pipeline.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use streamwood::observability::messages::engine::StreamCreated;
/// use std::time::Duration;
///
/// let msg = StreamCreated {
///     pipeline: "p_demo",
///     stream_id: "1",
///     graph_path: "pe_0",
///     grace_time: Duration::from_secs(300),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct StreamCreated<'a> {
    pub pipeline: &'a str,
    pub stream_id: &'a str,
    pub graph_path: &'a str,
    pub grace_time: Duration,
}

impl Display for StreamCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created stream '{}' on pipeline '{}' at graph path '{}' (grace time {:?})",
            self.stream_id, self.pipeline, self.graph_path, self.grace_time
        )
    }
}

impl StructuredLog for StreamCreated<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            stream_id = self.stream_id,
            graph_path = self.graph_path,
            grace_time_secs = self.grace_time.as_secs(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stream",
            span_name = name,
            pipeline = self.pipeline,
            stream_id = self.stream_id,
            graph_path = self.graph_path,
        )
    }
}

/// Stream torn down.
///
/// `reason` is one of `requested`, `expired`, `start_failed` or `terminated`.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StreamDestroyed<'a> {
    pub stream_id: &'a str,
    pub reason: &'a str,
    pub frames_created: u64,
}

impl Display for StreamDestroyed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Destroyed stream '{}' ({}) after {} frames",
            self.stream_id, self.reason, self.frames_created
        )
    }
}

impl StructuredLog for StreamDestroyed<'_> {
    fn log(&self) {
        tracing::info!(
            stream_id = self.stream_id,
            reason = self.reason,
            frames_created = self.frames_created,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stream_destroyed",
            span_name = name,
            stream_id = self.stream_id,
            reason = self.reason,
        )
    }
}

/// Idle stream passed its grace time while frames were still in flight.
///
/// The stream stops accepting external frames and is destroyed once the
/// in-flight frames have been delivered.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StreamExpiring<'a> {
    pub stream_id: &'a str,
    pub idle: Duration,
    pub frames_in_flight: usize,
}

impl Display for StreamExpiring<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stream '{}' idle for {:?}, flushing {} in-flight frames before teardown",
            self.stream_id, self.idle, self.frames_in_flight
        )
    }
}

impl StructuredLog for StreamExpiring<'_> {
    fn log(&self) {
        tracing::info!(
            stream_id = self.stream_id,
            idle_ms = self.idle.as_millis() as u64,
            frames_in_flight = self.frames_in_flight,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stream_expiring",
            span_name = name,
            stream_id = self.stream_id,
            frames_in_flight = self.frames_in_flight,
        )
    }
}

/// # Log Level
/// `debug!` - Per-frame event
pub struct FrameAdmitted<'a> {
    pub stream_id: &'a str,
    pub frame_id: u64,
    pub graph_path: &'a str,
}

impl Display for FrameAdmitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Admitted frame {} on stream '{}' at graph path '{}'",
            self.frame_id, self.stream_id, self.graph_path
        )
    }
}

impl StructuredLog for FrameAdmitted<'_> {
    fn log(&self) {
        tracing::debug!(
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            graph_path = self.graph_path,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "frame",
            span_name = name,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            graph_path = self.graph_path,
        )
    }
}

/// # Log Level
/// `debug!` - Per-frame event
pub struct FrameDelivered<'a> {
    pub stream_id: &'a str,
    pub frame_id: u64,
    pub pipeline_time: Option<Duration>,
}

impl Display for FrameDelivered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.pipeline_time {
            Some(time) => write!(
                f,
                "Delivered frame {} on stream '{}' in {:?}",
                self.frame_id, self.stream_id, time
            ),
            None => write!(
                f,
                "Delivered frame {} on stream '{}'",
                self.frame_id, self.stream_id
            ),
        }
    }
}

impl StructuredLog for FrameDelivered<'_> {
    fn log(&self) {
        tracing::debug!(
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            pipeline_time_us = self.pipeline_time.map(|t| t.as_micros() as u64),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "frame_delivered",
            span_name = name,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
        )
    }
}

/// Frame abandoned with a diagnostic delivered to the stream's sink.
///
/// # Log Level
/// `warn!` - Per-frame failure, stream unaffected
pub struct FrameFailed<'a> {
    pub stream_id: &'a str,
    pub frame_id: u64,
    pub element: &'a str,
    pub diagnostic: &'a str,
}

impl Display for FrameFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Frame {} on stream '{}' failed at '{}': {}",
            self.frame_id, self.stream_id, self.element, self.diagnostic
        )
    }
}

impl StructuredLog for FrameFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            element = self.element,
            diagnostic = self.diagnostic,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "frame_failed",
            span_name = name,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            element = self.element,
        )
    }
}

/// Frame dropped without a response (STOP outcome or destroyed stream).
///
/// # Log Level
/// `debug!` - Per-frame event
pub struct FrameDiscarded<'a> {
    pub stream_id: &'a str,
    pub frame_id: u64,
    pub reason: &'a str,
}

impl Display for FrameDiscarded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discarded frame {} on stream '{}': {}",
            self.frame_id, self.stream_id, self.reason
        )
    }
}

impl StructuredLog for FrameDiscarded<'_> {
    fn log(&self) {
        tracing::debug!(
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "frame_discarded",
            span_name = name,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
        )
    }
}

/// # Log Level
/// `info!` - Important operational event
pub struct GeneratorStarted<'a> {
    pub stream_id: &'a str,
    pub element: &'a str,
    pub rate: f64,
    pub limit: Option<u64>,
}

impl Display for GeneratorStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.limit {
            Some(limit) => write!(
                f,
                "Generating frames for stream '{}' from '{}' at {}/s, limit {}",
                self.stream_id, self.element, self.rate, limit
            ),
            None => write!(
                f,
                "Generating frames for stream '{}' from '{}' at {}/s",
                self.stream_id, self.element, self.rate
            ),
        }
    }
}

impl StructuredLog for GeneratorStarted<'_> {
    fn log(&self) {
        tracing::info!(
            stream_id = self.stream_id,
            element = self.element,
            rate = self.rate,
            limit = self.limit,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "generator",
            span_name = name,
            stream_id = self.stream_id,
            element = self.element,
        )
    }
}

/// # Log Level
/// `info!` - Important operational event
pub struct GeneratorStopped<'a> {
    pub stream_id: &'a str,
    pub element: &'a str,
    pub generated: u64,
    pub reason: &'a str,
}

impl Display for GeneratorStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stopped generating frames for stream '{}' from '{}' after {}: {}",
            self.stream_id, self.element, self.generated, self.reason
        )
    }
}

impl StructuredLog for GeneratorStopped<'_> {
    fn log(&self) {
        tracing::info!(
            stream_id = self.stream_id,
            element = self.element,
            generated = self.generated,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "generator_stopped",
            span_name = name,
            stream_id = self.stream_id,
            element = self.element,
        )
    }
}

/// Responses that arrived after a caller stopped waiting.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
pub struct LateResponsesDrained<'a> {
    pub stream_id: &'a str,
    pub count: usize,
}

impl Display for LateResponsesDrained<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Drained {} late responses from stream '{}'",
            self.count, self.stream_id
        )
    }
}

impl StructuredLog for LateResponsesDrained<'_> {
    fn log(&self) {
        tracing::warn!(
            stream_id = self.stream_id,
            count = self.count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "late_responses",
            span_name = name,
            stream_id = self.stream_id,
            count = self.count,
        )
    }
}
