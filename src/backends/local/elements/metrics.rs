// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::backends::local::elements::frame_pass_through;
use crate::engine::{ElementContext, Frame};
use crate::traits::{Element, ElementInit, ElementResponse, Swag};

const MEGABYTE: f64 = 1024.0 * 1024.0;

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Render the metrics gathered so far for `frame`.
///
/// Runs mid-path, so pipeline totals cover the elements that have already
/// processed the frame.
pub(crate) fn metrics_report(frame: &Frame, pipeline_start_memory: Option<u64>) -> Vec<String> {
    let mut lines: Vec<String> = frame
        .metrics
        .elements
        .iter()
        .map(|(element, sample)| match sample.memory {
            Some(memory) => format!(
                "{}: {:.3} ms, {:.3} MB",
                element,
                millis(sample.time),
                memory as f64 / MEGABYTE
            ),
            None => format!("{}: {:.3} ms", element, millis(sample.time)),
        })
        .collect();

    let total: Duration = frame.metrics.elements.values().map(|s| s.time).sum();
    lines.push(format!("pipeline_time: {:.3} ms", millis(total)));

    let memory: i64 = frame
        .metrics
        .elements
        .values()
        .filter_map(|s| s.memory)
        .sum();
    lines.push(format!("pipeline_memory: {:.3} MB", memory as f64 / MEGABYTE));

    if let Some(start) = pipeline_start_memory {
        lines.push(format!(
            "pipeline_start_memory: {:.3} MB",
            start as f64 / MEGABYTE
        ));
    }
    lines
}

/// Logs frame metrics every `rate` frames (default 1) when `enable` is set,
/// then passes its declared outputs through.
pub struct MetricsElement {
    outputs: Vec<String>,
}

impl MetricsElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        Ok(Self {
            outputs: init.outputs.clone(),
        })
    }
}

#[async_trait]
impl Element for MetricsElement {
    async fn process_frame(&self, context: &ElementContext<'_>, _inputs: Swag) -> ElementResponse {
        let outputs = frame_pass_through(context, &self.outputs);
        let Some(frame) = context.frame() else {
            return ElementResponse::okay(outputs);
        };
        if !context.parameter_bool("enable", true) {
            return ElementResponse::okay(outputs);
        }

        let rate = context.parameter_i64("rate", 1).max(1).unsigned_abs();
        if frame.frame_id % rate != 0 {
            return ElementResponse::okay(outputs);
        }

        for line in metrics_report(frame, context.pipeline_start_memory()) {
            info!(
                element = context.element_name(),
                stream_id = context.stream_id(),
                frame_id = frame.frame_id,
                "{}",
                line
            );
        }
        ElementResponse::okay(outputs)
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}
