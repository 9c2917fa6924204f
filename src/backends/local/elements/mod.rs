// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in elements of the local backend.

pub mod arithmetic;
pub mod branching;
pub mod data_codec;
pub mod inspect;
pub mod metrics;
pub mod random_integers;
pub mod text;

pub use arithmetic::{AddElement, IncrementElement, SumElement};
pub use branching::{AggregateElement, OptionElement, SelectElement};
pub use data_codec::{DataDecodeElement, DataEncodeElement};
pub use inspect::InspectElement;
pub use metrics::MetricsElement;
pub use random_integers::RandomIntegersElement;
pub use text::TextSuffixElement;

use crate::engine::ElementContext;
use crate::traits::{ElementInit, Swag};

/// Frame key carrying the rejoin element of a branch frame
pub const NEXT_STEP_KEY: &str = "next_step";

/// The one input and one output a mapping element works on.
pub(crate) fn single_field(init: &ElementInit) -> Result<(String, String), String> {
    match (init.inputs.as_slice(), init.outputs.as_slice()) {
        ([input], [output]) => Ok((input.clone(), output.clone())),
        (inputs, outputs) => Err(format!(
            "expected exactly one input and one output, found {} input(s) and {} output(s)",
            inputs.len(),
            outputs.len()
        )),
    }
}

/// Declared outputs that are present in `source`
pub(crate) fn pass_through(outputs: &[String], source: &Swag) -> Swag {
    outputs
        .iter()
        .filter_map(|name| source.get(name).map(|value| (name.clone(), value.clone())))
        .collect()
}

/// Declared outputs taken from the swag of the frame being processed.
///
/// Observers such as `inspect` and `metrics` declare no inputs and read the
/// whole frame instead.
pub(crate) fn frame_pass_through(context: &ElementContext<'_>, outputs: &[String]) -> Swag {
    context
        .frame()
        .map(|frame| pass_through(outputs, &frame.swag))
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use crate::config::{GraphDefinition, Parameters};
    use crate::engine::{response_channel, FrameResponse, Pipeline, ResponseReceiver, StreamOptions};
    use crate::traits::{ElementInit, Swag};

    /// Build and start a pipeline with one live stream named `s`.
    pub async fn start(yaml: &str, options: StreamOptions) -> (Pipeline, ResponseReceiver) {
        let definition: GraphDefinition = serde_yaml::from_str(yaml).unwrap();
        let pipeline = Pipeline::new(definition, Parameters::new()).unwrap();
        pipeline.start();
        let (sink, receiver) = response_channel();
        pipeline.create_stream("s", options, sink).await.unwrap();
        (pipeline, receiver)
    }

    /// Push one frame through a fresh pipeline and return its response.
    pub async fn run_frame(yaml: &str, options: StreamOptions, frame_data: Swag) -> FrameResponse {
        let (pipeline, receiver) = start(yaml, options).await;
        pipeline.create_frame("s", frame_data, None).unwrap();
        let response = receiver.recv_timeout(Duration::from_secs(5)).await.unwrap();
        pipeline.terminate().await;
        response
    }

    pub fn init(class_name: &str, inputs: &[&str], outputs: &[&str]) -> ElementInit {
        ElementInit {
            name: class_name.to_string(),
            class_name: class_name.to_string(),
            protocol: None,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            parameters: Parameters::new(),
        }
    }
}
