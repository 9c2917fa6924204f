// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for element invocation and stream hook events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// # Log Level
/// `debug!` - Per-frame event
pub struct ElementInvocationStarted<'a> {
    pub element: &'a str,
    pub stream_id: &'a str,
    pub frame_id: u64,
}

impl Display for ElementInvocationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Invoking element '{}' for frame {} on stream '{}'",
            self.element, self.frame_id, self.stream_id
        )
    }
}

impl StructuredLog for ElementInvocationStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            element = self.element,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "element",
            span_name = name,
            element = self.element,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
        )
    }
}

/// # Log Level
/// `debug!` - Per-frame event
pub struct ElementInvocationCompleted<'a> {
    pub element: &'a str,
    pub stream_id: &'a str,
    pub frame_id: u64,
    pub duration: Duration,
}

impl Display for ElementInvocationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Element '{}' processed frame {} on stream '{}' in {:?}",
            self.element, self.frame_id, self.stream_id, self.duration
        )
    }
}

impl StructuredLog for ElementInvocationCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            element = self.element,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            duration_us = self.duration.as_micros() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "element_completed",
            span_name = name,
            element = self.element,
            frame_id = self.frame_id,
        )
    }
}

/// Element returned ERROR for a frame.
///
/// # Log Level
/// `warn!` - Recoverable, per-frame failure
///
/// # Example
/// ```
/// use streamwood::observability::messages::element::ElementReportedError;
///
/// let msg = ElementReportedError {
///     element: "pe_0",
///     stream_id: "1",
///     frame_id: 4,
///     diagnostic: "Input 'a' is not a number",
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct ElementReportedError<'a> {
    pub element: &'a str,
    pub stream_id: &'a str,
    pub frame_id: u64,
    pub diagnostic: &'a str,
}

impl Display for ElementReportedError<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Element '{}' reported an error for frame {} on stream '{}': {}",
            self.element, self.frame_id, self.stream_id, self.diagnostic
        )
    }
}

impl StructuredLog for ElementReportedError<'_> {
    fn log(&self) {
        tracing::warn!(
            element = self.element,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            diagnostic = self.diagnostic,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "element_error",
            span_name = name,
            element = self.element,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
        )
    }
}

/// Frame task panicked inside an element.
///
/// # Log Level
/// `error!` - Engine defect or element bug
pub struct ElementPanicked<'a> {
    pub stream_id: &'a str,
    pub frame_id: u64,
    pub reason: &'a str,
}

impl Display for ElementPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Frame {} on stream '{}' panicked: {}",
            self.frame_id, self.stream_id, self.reason
        )
    }
}

impl StructuredLog for ElementPanicked<'_> {
    fn log(&self) {
        tracing::error!(
            stream_id = self.stream_id,
            frame_id = self.frame_id,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "element_panicked",
            span_name = name,
            stream_id = self.stream_id,
            frame_id = self.frame_id,
        )
    }
}

/// `start_stream` or `stop_stream` returned ERROR.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
pub struct StreamHookFailed<'a> {
    pub element: &'a str,
    pub stream_id: &'a str,
    pub hook: &'a str,
    pub diagnostic: &'a str,
}

impl Display for StreamHookFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Element '{}' failed {} for stream '{}': {}",
            self.element, self.hook, self.stream_id, self.diagnostic
        )
    }
}

impl StructuredLog for StreamHookFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            element = self.element,
            stream_id = self.stream_id,
            hook = self.hook,
            diagnostic = self.diagnostic,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "stream_hook_failed",
            span_name = name,
            element = self.element,
            stream_id = self.stream_id,
            hook = self.hook,
        )
    }
}

/// Element could not be built from its binding.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ElementInstantiationFailed<'a> {
    pub element: &'a str,
    pub class_name: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ElementInstantiationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to instantiate element '{}' with binding '{}': {}",
            self.element, self.class_name, self.error
        )
    }
}

impl StructuredLog for ElementInstantiationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            element = self.element,
            class_name = self.class_name,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "element_instantiation",
            span_name = name,
            element = self.element,
            class_name = self.class_name,
        )
    }
}
