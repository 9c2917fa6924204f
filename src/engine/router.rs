// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Drives one frame along its graph path.
//!
//! The router invokes each element of the path in dependency order, merges
//! declared outputs into the swag, and delivers the swag to the stream's
//! sink at the end of the path. Control outcomes end the walk early:
//!
//! * `Error` abandons the frame and delivers the element's diagnostic
//! * `Stop` abandons the frame without a response
//!
//! An element is never invoked with a declared input absent from the swag;
//! such a frame fails with a diagnostic instead. A destroyed stream's frame
//! is discarded at the next element boundary.
//!
//! An element not yet started for the stream has `start_stream` run before
//! its first frame. An ERROR from that hook fails the frame.

use serde_json::Value;
use std::sync::Arc;

use crate::config::consts::DIAGNOSTIC_KEY;
use crate::engine::context::ElementContext;
use crate::engine::frame::{Frame, FrameState};
use crate::engine::metrics::ElementTimer;
use crate::engine::pipeline::{PipelineShared, StartOutcome};
use crate::engine::response::FrameResponse;
use crate::engine::stream::Stream;
use crate::observability::messages::element::{
    ElementInvocationCompleted, ElementInvocationStarted, ElementReportedError,
};
use crate::observability::messages::engine::{FrameDelivered, FrameDiscarded, FrameFailed};
use crate::observability::messages::StructuredLog;
use crate::traits::{StreamEvent, Swag};

pub(crate) async fn route_frame(shared: Arc<PipelineShared>, stream: Arc<Stream>, mut frame: Frame) {
    let Some(path) = shared.paths.get(&frame.graph_path) else {
        let diagnostic = format!("Unknown graph path '{}'", frame.graph_path);
        let head = frame.graph_path.clone();
        fail(&shared, &stream, frame, &head, diagnostic_swag(&diagnostic));
        return;
    };

    for element_name in &path.elements {
        if stream.is_cancelled() {
            discard(&stream, &mut frame, "stream destroyed");
            return;
        }

        let (Some(definition), Some(element)) = (
            shared.definition.element(element_name),
            shared.elements.get(element_name),
        ) else {
            let diagnostic = format!("Element '{}' is not part of the pipeline", element_name);
            fail(&shared, &stream, frame, element_name, diagnostic_swag(&diagnostic));
            return;
        };

        match shared.start_element(&stream, element_name).await {
            StartOutcome::Ready | StartOutcome::Stopped => {}
            StartOutcome::Failed(diagnostic) => {
                fail(&shared, &stream, frame, element_name, diagnostic_swag(&diagnostic));
                return;
            }
            StartOutcome::Destroyed => {
                discard(&stream, &mut frame, "stream destroyed");
                return;
            }
        }

        let inputs = definition.input_names();
        let missing = frame.missing_inputs(&inputs);
        if !missing.is_empty() {
            let diagnostic = format!(
                "Element '{}' not invoked, missing inputs: {}",
                element_name,
                missing.join(", ")
            );
            fail(&shared, &stream, frame, element_name, diagnostic_swag(&diagnostic));
            return;
        }

        frame.transition(FrameState::Ready);
        frame.transition(FrameState::Running);
        let selected = frame.select(&inputs);

        ElementInvocationStarted {
            element: element_name,
            stream_id: stream.id(),
            frame_id: frame.frame_id,
        }
        .log();

        let timer = ElementTimer::start();
        let response = {
            let context = ElementContext::new(&shared, &stream, element_name, Some(&frame));
            element.process_frame(&context, selected).await
        };
        let sample = timer.finish();

        ElementInvocationCompleted {
            element: element_name,
            stream_id: stream.id(),
            frame_id: frame.frame_id,
            duration: sample.time,
        }
        .log();
        frame.metrics.record(element_name, sample);
        stream.touch();

        match response.event {
            StreamEvent::Okay => {
                frame.merge_outputs(element_name, &definition.output_names(), response.outputs);
                frame.transition(FrameState::Advanced);
            }
            StreamEvent::Error => {
                let mut outputs = response.outputs;
                outputs
                    .entry(DIAGNOSTIC_KEY.to_string())
                    .or_insert_with(|| Value::String("Element reported an error".to_string()));
                ElementReportedError {
                    element: element_name,
                    stream_id: stream.id(),
                    frame_id: frame.frame_id,
                    diagnostic: outputs
                        .get(DIAGNOSTIC_KEY)
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                }
                .log();
                fail(&shared, &stream, frame, element_name, outputs);
                return;
            }
            StreamEvent::Stop => {
                let reason = format!("stopped by element '{}'", element_name);
                discard(&stream, &mut frame, &reason);
                return;
            }
        }
    }

    if stream.is_cancelled() {
        discard(&stream, &mut frame, "stream destroyed");
        return;
    }
    deliver(&shared, &stream, frame);
}

fn diagnostic_swag(diagnostic: &str) -> Swag {
    Swag::from([(
        DIAGNOSTIC_KEY.to_string(),
        Value::String(diagnostic.to_string()),
    )])
}

fn deliver(shared: &PipelineShared, stream: &Stream, mut frame: Frame) {
    frame.transition(FrameState::Delivered);
    frame.metrics.finalize(shared.start_memory);

    FrameDelivered {
        stream_id: stream.id(),
        frame_id: frame.frame_id,
        pipeline_time: frame.metrics.pipeline_time,
    }
    .log();

    send(
        stream,
        FrameResponse {
            stream_id: stream.id().to_string(),
            frame_id: frame.frame_id,
            graph_path: frame.graph_path,
            event: StreamEvent::Okay,
            swag: frame.swag,
            metrics: frame.metrics,
        },
    );
}

/// Abandon the frame and deliver `outputs`, which carry the diagnostic.
fn fail(shared: &PipelineShared, stream: &Stream, mut frame: Frame, element: &str, outputs: Swag) {
    frame.transition(FrameState::Failed);
    frame.metrics.finalize(shared.start_memory);

    FrameFailed {
        stream_id: stream.id(),
        frame_id: frame.frame_id,
        element,
        diagnostic: outputs
            .get(DIAGNOSTIC_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default(),
    }
    .log();

    send(
        stream,
        FrameResponse {
            stream_id: stream.id().to_string(),
            frame_id: frame.frame_id,
            graph_path: frame.graph_path,
            event: StreamEvent::Error,
            swag: outputs,
            metrics: frame.metrics,
        },
    );
}

fn discard(stream: &Stream, frame: &mut Frame, reason: &str) {
    frame.transition(FrameState::Failed);
    FrameDiscarded {
        stream_id: stream.id(),
        frame_id: frame.frame_id,
        reason,
    }
    .log();
}

fn send(stream: &Stream, response: FrameResponse) {
    let frame_id = response.frame_id;
    if !stream.sink().deliver(response) {
        tracing::debug!(
            stream_id = stream.id(),
            frame_id,
            "Response receiver dropped, result not delivered"
        );
    }
}
