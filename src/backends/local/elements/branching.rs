// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dynamic branching: `select` fans a frame out to branch elements, each
//! `option` branch reports into the stream's branch set and forwards to the
//! rejoin element, where `aggregate` observes the set.
//!
//! The definition's branch selector names both the branch set and the frame
//! field carrying a branch frame's id, so all three elements agree on it
//! without extra configuration.

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::backends::local::elements::{pass_through, NEXT_STEP_KEY};
use crate::engine::{value_as_list, value_as_string, BranchObservation, ElementContext};
use crate::traits::{Element, ElementInit, ElementResponse, Swag};

/// Chooses branch targets and creates one frame per chosen branch.
///
/// `selection` lists the branches to take (`*` for all of them); without it
/// each branch is taken with `probability` (default 0.5). `next_step` names
/// the rejoin element and is required.
pub struct SelectElement {
    outputs: Vec<String>,
}

impl SelectElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        Ok(Self {
            outputs: init.outputs.clone(),
        })
    }

    fn choose(context: &ElementContext<'_>, targets: &[String]) -> Vec<String> {
        if let Some(selection) = context.parameter("selection") {
            let selection = value_as_list(&selection);
            if selection.iter().any(|choice| choice == "*") {
                return targets.to_vec();
            }
            return targets
                .iter()
                .filter(|target| selection.contains(*target))
                .cloned()
                .collect();
        }

        let probability = context.parameter_f64("probability", 0.5);
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.5
        };
        let mut rng = rand::thread_rng();
        targets
            .iter()
            .filter(|_| rng.gen_bool(probability))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Element for SelectElement {
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let definition = context.definition();
        let Some(next_step) = context.parameter_string(NEXT_STEP_KEY) else {
            return ElementResponse::error("Parameter 'next_step' is required");
        };
        if !definition.contains(&next_step) {
            return ElementResponse::error(format!(
                "Parameter 'next_step' names unknown element '{}'",
                next_step
            ));
        }

        let barrier = definition.branch_selector();
        let selection = Self::choose(context, &definition.branch_targets());
        info!(
            element = context.element_name(),
            stream_id = context.stream_id(),
            selection = ?selection,
            "Branches selected"
        );

        // Register every expected branch before any branch frame can report.
        context
            .variables()
            .await
            .branches(&barrier)
            .expect(selection.iter().cloned());

        for branch in &selection {
            let mut frame_data = inputs.clone();
            frame_data.insert(barrier.clone(), Value::String(branch.clone()));
            frame_data.insert(NEXT_STEP_KEY.to_string(), Value::String(next_step.clone()));
            if let Err(error) = context.create_frame(frame_data, Some(branch)) {
                return ElementResponse::error(format!(
                    "Failed to create frame for branch '{}': {}",
                    branch, error
                ));
            }
        }

        ElementResponse::okay(pass_through(&self.outputs, &inputs))
    }

    fn name(&self) -> &'static str {
        "select"
    }
}

/// One branch of a dynamic fan-out.
///
/// Produces `"{branch}:{text}:out"` from its first input after an optional
/// `delay` in milliseconds, records it in the branch set and forwards the
/// frame to its `next_step`.
pub struct OptionElement {
    input: String,
    output: String,
}

impl OptionElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        match (init.inputs.first(), init.outputs.first()) {
            (Some(input), Some(output)) => Ok(Self {
                input: input.clone(),
                output: output.clone(),
            }),
            _ => Err("expected at least one input and one output".to_string()),
        }
    }
}

#[async_trait]
impl Element for OptionElement {
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let Some(frame) = context.frame() else {
            return ElementResponse::error("Branch element invoked without a frame");
        };
        let barrier = context.definition().branch_selector();
        let branch = frame
            .swag
            .get(&barrier)
            .and_then(Value::as_str)
            .unwrap_or(context.element_name())
            .to_string();
        let Some(next_step) = frame
            .swag
            .get(NEXT_STEP_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            return ElementResponse::error("Branch frame carries no 'next_step'");
        };

        let delay = context.parameter_i64("delay", 0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay.unsigned_abs())).await;
        }

        let text = inputs
            .get(&self.input)
            .and_then(value_as_string)
            .unwrap_or_default();
        let result = Value::String(format!("{}:{}:out", branch, text));

        {
            let mut variables = context.variables().await;
            variables.branches(&barrier).report(branch.clone(), result.clone());
        }

        let mut frame_data = frame.swag.clone();
        frame_data.insert(self.output.clone(), result.clone());
        if let Err(error) = context.create_frame(frame_data, Some(&next_step)) {
            return ElementResponse::error(format!(
                "Failed to forward branch '{}' to '{}': {}",
                branch, next_step, error
            ));
        }

        debug!(element = context.element_name(), branch = %branch, "Branch reported");
        ElementResponse::okay(Swag::from([(self.output.clone(), result)]))
    }

    fn name(&self) -> &'static str {
        "option"
    }
}

/// Rejoin point of a dynamic fan-out.
///
/// Outputs `complete` (false until every expected branch has reported) and
/// `results` keyed by branch id. Completion is declared exactly once; later
/// observations produce no outputs.
pub struct AggregateElement;

impl AggregateElement {
    pub fn new(_init: &ElementInit) -> Result<Self, String> {
        Ok(Self)
    }
}

fn results_value(results: impl IntoIterator<Item = (String, Value)>) -> Value {
    Value::Object(results.into_iter().collect())
}

#[async_trait]
impl Element for AggregateElement {
    async fn process_frame(&self, context: &ElementContext<'_>, _inputs: Swag) -> ElementResponse {
        let barrier = context.definition().branch_selector();
        let (observation, reported) = {
            let mut variables = context.variables().await;
            let branches = variables.branches(&barrier);
            let observation = branches.observe();
            (observation, branches.reported().clone())
        };

        match observation {
            BranchObservation::Pending { missing } => {
                info!(
                    element = context.element_name(),
                    stream_id = context.stream_id(),
                    missing = ?missing,
                    "Waiting on branches"
                );
                ElementResponse::okay(Swag::from([
                    ("complete".to_string(), Value::Bool(false)),
                    ("results".to_string(), results_value(reported)),
                ]))
            }
            BranchObservation::Complete(results) => {
                info!(
                    element = context.element_name(),
                    stream_id = context.stream_id(),
                    branches = results.len(),
                    "All branches complete"
                );
                ElementResponse::okay(Swag::from([
                    ("complete".to_string(), Value::Bool(true)),
                    ("results".to_string(), results_value(results)),
                ]))
            }
            BranchObservation::AlreadyComplete => {
                debug!(element = context.element_name(), "Branch set already complete");
                ElementResponse::empty()
            }
        }
    }

    fn name(&self) -> &'static str {
        "aggregate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::elements::test_support::start;
    use crate::engine::{FrameResponse, StreamOptions};
    use crate::traits::StreamEvent;
    use serde_json::json;

    const FAN_OUT: &str = r#"
name: fan_out
graph_path: pe_in
runtime: { max_concurrency: 8 }
elements:
  - name: pe_in
    input: [in_a]
    output: [text_b]
    deploy: { local: { class_name: text_in } }
  - name: pe_select
    input: [text_b]
    output: [text_b]
    parameters: { next_step: pe_join, selection: [pe_x, pe_y] }
    depends_on: [pe_in]
    deploy: { local: { class_name: select } }
  - name: pe_x
    input: [text_b]
    output: [out_c]
    parameters: { option: true }
    deploy: { local: { class_name: option } }
  - name: pe_y
    input: [text_b]
    output: [out_c]
    parameters: { option: true, delay: 300 }
    deploy: { local: { class_name: option } }
  - name: pe_z
    input: [text_b]
    output: [out_c]
    parameters: { option: true }
    deploy: { local: { class_name: option } }
  - name: pe_join
    input: [text_b, out_c]
    output: [complete, results]
    deploy: { local: { class_name: aggregate } }
"#;

    async fn join_responses(receiver: &crate::engine::ResponseReceiver, count: usize) -> Vec<FrameResponse> {
        let mut joins = Vec::new();
        while joins.len() < count {
            let response = receiver
                .recv_timeout(Duration::from_secs(5))
                .await
                .unwrap();
            if response.graph_path == "pe_join" {
                joins.push(response);
            }
        }
        joins
    }

    #[tokio::test]
    async fn test_aggregate_completes_only_after_every_branch() {
        let (pipeline, receiver) = start(FAN_OUT, StreamOptions::new()).await;
        pipeline
            .create_frame("s", Swag::from([("in_a".to_string(), json!("a"))]), None)
            .unwrap();

        let joins = join_responses(&receiver, 2).await;
        assert_eq!(joins[0].get("complete"), Some(&json!(false)));
        assert_eq!(
            joins[0].get("results"),
            Some(&json!({ "pe_x": "pe_x:a:in:out" }))
        );
        assert_eq!(joins[1].get("complete"), Some(&json!(true)));
        assert_eq!(
            joins[1].get("results"),
            Some(&json!({ "pe_x": "pe_x:a:in:out", "pe_y": "pe_y:a:in:out" }))
        );

        let stream = pipeline.stream("s").unwrap();
        let variables = stream.variables().await;
        assert!(variables.branch_set("option").unwrap().is_complete());
        drop(variables);
        pipeline.terminate().await;
    }

    #[tokio::test]
    async fn test_missing_next_step_is_an_element_error() {
        let yaml = FAN_OUT.replace("next_step: pe_join, ", "");
        let (pipeline, receiver) = start(&yaml, StreamOptions::new()).await;
        pipeline
            .create_frame("s", Swag::from([("in_a".to_string(), json!("a"))]), None)
            .unwrap();

        let response = receiver.recv_timeout(Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.event, StreamEvent::Error);
        assert_eq!(response.diagnostic(), Some("Parameter 'next_step' is required"));
        pipeline.terminate().await;
    }

    #[tokio::test]
    async fn test_zero_probability_selects_nothing() {
        let yaml = FAN_OUT.replace(", selection: [pe_x, pe_y]", ", probability: 0");
        let (pipeline, receiver) = start(&yaml, StreamOptions::new()).await;
        pipeline
            .create_frame("s", Swag::from([("in_a".to_string(), json!("a"))]), None)
            .unwrap();

        let response = receiver.recv_timeout(Duration::from_secs(5)).await.unwrap();
        assert!(response.is_okay());
        assert_eq!(response.graph_path, "pe_in");

        let stream = pipeline.stream("s").unwrap();
        let variables = stream.variables().await;
        assert!(variables.branch_set("option").unwrap().expected().is_empty());
        drop(variables);
        pipeline.terminate().await;
    }
}
