// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tracing::debug;

use crate::engine::metrics::FrameMetrics;
use crate::traits::Swag;

pub type FrameId = u64;

/// Per-frame state machine.
///
/// `Pending -> Ready -> Running -> Advanced -> Ready -> ...` while the frame
/// walks its path; `Delivered` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Pending,
    Ready,
    Running,
    Advanced,
    Delivered,
    Failed,
}

impl FrameState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FrameState::Delivered | FrameState::Failed)
    }

    fn can_transition_to(self, next: FrameState) -> bool {
        use FrameState::*;
        matches!(
            (self, next),
            (Pending, Ready)
                | (Pending, Failed)
                | (Advanced, Ready)
                | (Advanced, Delivered)
                | (Advanced, Failed)
                | (Ready, Running)
                | (Ready, Failed)
                | (Running, Advanced)
                | (Running, Failed)
        )
    }
}

/// One unit of work travelling along a graph path.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_id: FrameId,
    pub graph_path: String,
    pub swag: Swag,
    pub metrics: FrameMetrics,
    state: FrameState,
}

impl Frame {
    pub fn new(frame_id: FrameId, graph_path: impl Into<String>, frame_data: Swag) -> Self {
        Self {
            frame_id,
            graph_path: graph_path.into(),
            swag: frame_data,
            metrics: FrameMetrics::default(),
            state: FrameState::Pending,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Move to `next`. An illegal transition is an engine defect.
    pub(crate) fn transition(&mut self, next: FrameState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal frame transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Declared inputs not yet present in the swag
    pub fn missing_inputs(&self, inputs: &[String]) -> Vec<String> {
        inputs
            .iter()
            .filter(|input| !self.swag.contains_key(*input))
            .cloned()
            .collect()
    }

    /// Copy of the swag restricted to `inputs`
    pub fn select(&self, inputs: &[String]) -> Swag {
        inputs
            .iter()
            .filter_map(|input| {
                self.swag
                    .get(input)
                    .map(|value| (input.clone(), value.clone()))
            })
            .collect()
    }

    /// Merge an element's outputs, keeping only the names it declares.
    ///
    /// An element may overwrite a field it declares as its own output; fields
    /// outside its declaration are dropped.
    pub fn merge_outputs(&mut self, element: &str, declared: &[String], outputs: Swag) {
        for (name, value) in outputs {
            if declared.contains(&name) {
                self.swag.insert(name, value);
            } else {
                debug!(
                    element,
                    field = %name,
                    frame_id = self.frame_id,
                    "Dropping undeclared output field"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_inputs_and_select() {
        let frame = Frame::new(0, "pe_0", Swag::from([("a".to_string(), json!(0))]));
        let inputs = vec!["a".to_string(), "b".to_string()];

        assert_eq!(frame.missing_inputs(&inputs), vec!["b"]);
        assert_eq!(frame.select(&inputs), Swag::from([("a".to_string(), json!(0))]));
        assert_eq!(frame.state(), FrameState::Pending);
    }

    #[test]
    fn test_merge_outputs_keeps_declared_fields_only() {
        let mut frame = Frame::new(0, "pe_text", Swag::from([("text_b".to_string(), json!("x:in"))]));
        let outputs = Swag::from([
            ("text_b".to_string(), json!("x:in:text")),
            ("stray".to_string(), json!(true)),
        ]);

        frame.merge_outputs("pe_text", &["text_b".to_string()], outputs);

        assert_eq!(frame.swag.get("text_b"), Some(&json!("x:in:text")));
        assert!(!frame.swag.contains_key("stray"));
    }

    #[test]
    fn test_state_machine_walk() {
        let mut frame = Frame::new(3, "pe_0", Swag::new());
        frame.transition(FrameState::Ready);
        frame.transition(FrameState::Running);
        frame.transition(FrameState::Advanced);
        frame.transition(FrameState::Ready);
        frame.transition(FrameState::Running);
        frame.transition(FrameState::Advanced);
        frame.transition(FrameState::Delivered);
        assert!(frame.state().is_terminal());
    }

    #[test]
    #[should_panic(expected = "illegal frame transition")]
    #[cfg(debug_assertions)]
    fn test_illegal_transition_is_a_defect() {
        let mut frame = Frame::new(0, "pe_0", Swag::new());
        frame.transition(FrameState::Delivered);
    }
}
