// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::backends::local::elements::single_field;
use crate::engine::{value_as_i64, ElementContext, FrameId, GeneratorOptions};
use crate::traits::{Element, ElementInit, ElementResponse, GeneratorResponse, Swag};

/// Frame source producing random integers.
///
/// `start_stream` registers a generator at `rate` frames per second, stopping
/// after `limit` frames when given. Each tick yields `batch` frames (default
/// 1) whose single field holds an integer in `minimum..=maximum` (default
/// `0..=9`). `process_frame` passes the value through.
pub struct RandomIntegersElement {
    input: String,
    output: String,
}

impl RandomIntegersElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        let (input, output) = single_field(init)?;
        Ok(Self { input, output })
    }

    fn draw(&self, count: usize, minimum: i64, maximum: i64) -> Vec<Swag> {
        let (low, high) = if minimum <= maximum {
            (minimum, maximum)
        } else {
            (maximum, minimum)
        };
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| Swag::from([(self.input.clone(), Value::from(rng.gen_range(low..=high)))]))
            .collect()
    }
}

#[async_trait]
impl Element for RandomIntegersElement {
    async fn start_stream(&self, context: &ElementContext<'_>) -> ElementResponse {
        let mut options = GeneratorOptions::new(context.parameter_f64("rate", 1.0));
        if let Some(limit) = context.parameter("limit").as_ref().and_then(value_as_i64) {
            options = options.limit(limit.max(0).unsigned_abs());
        }
        context.create_frames(options);
        ElementResponse::empty()
    }

    async fn generate(&self, context: &ElementContext<'_>, frame_id: FrameId) -> GeneratorResponse {
        let batch = context.parameter_i64("batch", 1).clamp(1, 1024) as usize;
        let frames = self.draw(
            batch,
            context.parameter_i64("minimum", 0),
            context.parameter_i64("maximum", 9),
        );
        debug!(
            element = context.element_name(),
            stream_id = context.stream_id(),
            next_frame_id = frame_id,
            batch,
            "Generated random integers"
        );
        GeneratorResponse::frames(frames)
    }

    async fn process_frame(&self, _context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        match inputs.get(&self.input) {
            Some(value) => ElementResponse::okay(Swag::from([(self.output.clone(), value.clone())])),
            None => ElementResponse::error(format!("Input '{}' is missing", self.input)),
        }
    }

    fn name(&self) -> &'static str {
        "random_integers"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::elements::test_support::{init, start};
    use crate::engine::StreamOptions;
    use std::time::Duration;

    const SOURCE: &str = r#"
name: source
elements:
  - name: pe_random
    input: [random]
    output: [random]
    parameters: { rate: 50, limit: 4, batch: 2, minimum: 3, maximum: 5 }
    deploy: { local: { class_name: random_integers } }
"#;

    #[test]
    fn test_draw_respects_bounds_even_when_reversed() {
        let element = RandomIntegersElement::new(&init("random_integers", &["r"], &["r"])).unwrap();
        for frame in element.draw(50, 7, 2) {
            let value = frame["r"].as_i64().unwrap();
            assert!((2..=7).contains(&value));
        }
    }

    #[tokio::test]
    async fn test_generator_stops_at_limit_across_batches() {
        let (pipeline, receiver) = start(SOURCE, StreamOptions::new()).await;

        let mut frame_ids = Vec::new();
        for _ in 0..4 {
            let response = receiver.recv_timeout(Duration::from_secs(5)).await.unwrap();
            let value = response.get("random").and_then(Value::as_i64).unwrap();
            assert!((3..=5).contains(&value));
            frame_ids.push(response.frame_id);
        }
        frame_ids.sort_unstable();
        assert_eq!(frame_ids, vec![0, 1, 2, 3]);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(receiver.drain().await.is_empty());
        pipeline.terminate().await;
    }
}
