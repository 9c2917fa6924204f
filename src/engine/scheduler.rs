// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Rate-controlled frame generation.
//!
//! Each registered generator runs as its own task ticking at `rate` frames
//! per second and admits what the element's `generate` hook yields through
//! the same admission path as external frames. Generated frames go through
//! the pipeline's bounded worker pool like any other work, so a fast source
//! only ever queues frames and can't starve routing for other streams.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::engine::context::ElementContext;
use crate::engine::pipeline::PipelineShared;
use crate::engine::stream::{FrameOrigin, Stream};
use crate::errors::PipelineError;
use crate::observability::messages::element::StreamHookFailed;
use crate::observability::messages::engine::{GeneratorStarted, GeneratorStopped};
use crate::observability::messages::StructuredLog;
use crate::traits::StreamEvent;

/// Longest interval between ticks, for very slow or invalid rates
const MAX_PERIOD: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    /// Ticks per second
    pub rate: f64,
    /// Stop after admitting this many frames
    pub limit: Option<u64>,
}

impl GeneratorOptions {
    pub fn new(rate: f64) -> Self {
        Self { rate, limit: None }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn period(&self) -> Duration {
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return MAX_PERIOD;
        }
        Duration::try_from_secs_f64(1.0 / self.rate)
            .unwrap_or(MAX_PERIOD)
            .min(MAX_PERIOD)
    }
}

pub(crate) fn spawn_generator(
    shared: Arc<PipelineShared>,
    stream: Arc<Stream>,
    element: String,
    options: GeneratorOptions,
) -> JoinHandle<()> {
    tokio::spawn(async move { run_generator(shared, stream, element, options).await })
}

async fn run_generator(
    shared: Arc<PipelineShared>,
    stream: Arc<Stream>,
    element_name: String,
    options: GeneratorOptions,
) {
    let Some(element) = shared.elements.get(&element_name).cloned() else {
        return;
    };

    GeneratorStarted {
        stream_id: stream.id(),
        element: &element_name,
        rate: options.rate,
        limit: options.limit,
    }
    .log();

    let cancelled = stream.generation_token();
    let mut ticker = interval(options.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut generated: u64 = 0;
    let limit_reached = |generated: u64| options.limit.is_some_and(|limit| generated >= limit);

    let reason: String = 'generation: loop {
        tokio::select! {
            biased;
            _ = cancelled.cancelled() => break "stream closed".to_string(),
            _ = ticker.tick() => {}
        }

        if limit_reached(generated) {
            break "limit reached".to_string();
        }

        let response = {
            let context = ElementContext::new(&shared, &stream, &element_name, None);
            element.generate(&context, stream.peek_frame_id()).await
        };

        match response.event {
            StreamEvent::Stop => {
                break response
                    .diagnostic
                    .unwrap_or_else(|| "stopped by element".to_string());
            }
            StreamEvent::Error => {
                let diagnostic = response
                    .diagnostic
                    .unwrap_or_else(|| "generator error".to_string());
                StreamHookFailed {
                    element: &element_name,
                    stream_id: stream.id(),
                    hook: "generate",
                    diagnostic: &diagnostic,
                }
                .log();
                break diagnostic;
            }
            StreamEvent::Okay => {}
        }

        for frame_data in response.frames {
            if limit_reached(generated) {
                break 'generation "limit reached".to_string();
            }
            match shared.admit(&stream, frame_data, None, FrameOrigin::Generator) {
                Ok(_) => generated += 1,
                Err(error @ PipelineError::MissingInputs { .. }) => {
                    tracing::warn!(
                        stream_id = stream.id(),
                        element = %element_name,
                        "Skipping generated frame: {}",
                        error
                    );
                }
                Err(error) => break 'generation error.to_string(),
            }
        }
    };

    GeneratorStopped {
        stream_id: stream.id(),
        element: &element_name,
        generated,
        reason: &reason,
    }
    .log();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_rate() {
        assert_eq!(GeneratorOptions::new(4.0).period(), Duration::from_millis(250));
        assert_eq!(GeneratorOptions::new(1.0).limit(3).limit, Some(3));
    }

    #[test]
    fn test_non_positive_rate_is_clamped() {
        assert_eq!(GeneratorOptions::new(0.0).period(), MAX_PERIOD);
        assert_eq!(GeneratorOptions::new(-2.0).period(), MAX_PERIOD);
        assert_eq!(GeneratorOptions::new(f64::NAN).period(), MAX_PERIOD);
        assert_eq!(GeneratorOptions::new(1e-300).period(), MAX_PERIOD);
    }
}
