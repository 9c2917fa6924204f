// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test elements for exercising the engine's failure and lifecycle paths.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::ElementRegistry;
use crate::engine::{value_as_i64, ElementContext};
use crate::traits::{Element, ElementInit, ElementResponse, Swag};

/// Shared log of hook invocations, e.g. `start:pe_0:s1`.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn record(log: &EventLog, event: String) {
    log.lock().unwrap_or_else(PoisonError::into_inner).push(event);
}

/// Copies each declared input to the output at the same position.
fn forward(inputs: &[String], outputs: &[String], values: &Swag) -> Swag {
    inputs
        .iter()
        .zip(outputs)
        .filter_map(|(input, output)| values.get(input).map(|v| (output.clone(), v.clone())))
        .collect()
}

/// Records every hook call and forwards inputs to outputs.
#[derive(Default)]
pub struct RecordingElement {
    pub log: EventLog,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[async_trait]
impl Element for RecordingElement {
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        record(
            &self.log,
            format!(
                "process:{}:{}:{}",
                context.element_name(),
                context.stream_id(),
                context.frame_id().unwrap_or_default()
            ),
        );
        ElementResponse::okay(forward(&self.inputs, &self.outputs, &inputs))
    }

    async fn start_stream(&self, context: &ElementContext<'_>) -> ElementResponse {
        record(
            &self.log,
            format!("start:{}:{}", context.element_name(), context.stream_id()),
        );
        ElementResponse::empty()
    }

    async fn stop_stream(&self, context: &ElementContext<'_>) -> ElementResponse {
        record(
            &self.log,
            format!("stop:{}:{}", context.element_name(), context.stream_id()),
        );
        ElementResponse::empty()
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Fails every frame with the `diagnostic` parameter (default "boom").
pub struct FailingElement;

#[async_trait]
impl Element for FailingElement {
    async fn process_frame(&self, context: &ElementContext<'_>, _inputs: Swag) -> ElementResponse {
        let diagnostic = context
            .parameter_string("diagnostic")
            .unwrap_or_else(|| "boom".to_string());
        ElementResponse::error(diagnostic)
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Fails frames whose first input equals the `fail_on` parameter, forwards
/// the rest.
pub struct FailWhenElement {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[async_trait]
impl Element for FailWhenElement {
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let fail_on = context.parameter("fail_on");
        let first = self.inputs.first().and_then(|name| inputs.get(name));
        if fail_on.is_some() && first == fail_on.as_ref() {
            return ElementResponse::error(format!("refusing {}", fail_on.unwrap_or_default()));
        }
        ElementResponse::okay(forward(&self.inputs, &self.outputs, &inputs))
    }

    fn name(&self) -> &'static str {
        "fail_when"
    }
}

/// Panics while processing a frame.
pub struct PanickingElement;

#[async_trait]
impl Element for PanickingElement {
    async fn process_frame(&self, _context: &ElementContext<'_>, _inputs: Swag) -> ElementResponse {
        panic!("element exploded");
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

/// Rejects every stream in `start_stream`, recording its hooks.
#[derive(Default)]
pub struct StartFailingElement {
    pub log: EventLog,
}

#[async_trait]
impl Element for StartFailingElement {
    async fn process_frame(&self, _context: &ElementContext<'_>, _inputs: Swag) -> ElementResponse {
        ElementResponse::empty()
    }

    async fn start_stream(&self, context: &ElementContext<'_>) -> ElementResponse {
        record(&self.log, format!("start:{}", context.element_name()));
        ElementResponse::error("no capacity")
    }

    async fn stop_stream(&self, context: &ElementContext<'_>) -> ElementResponse {
        record(&self.log, format!("stop:{}", context.element_name()));
        ElementResponse::empty()
    }

    fn name(&self) -> &'static str {
        "start_failing"
    }
}

/// Takes the `delay` parameter in milliseconds to start, recording its hooks.
#[derive(Default)]
pub struct SlowStartElement {
    pub log: EventLog,
}

#[async_trait]
impl Element for SlowStartElement {
    async fn process_frame(&self, _context: &ElementContext<'_>, _inputs: Swag) -> ElementResponse {
        ElementResponse::empty()
    }

    async fn start_stream(&self, context: &ElementContext<'_>) -> ElementResponse {
        record(&self.log, format!("start:{}", context.element_name()));
        let delay = context.parameter_i64("delay", 100).max(0);
        tokio::time::sleep(Duration::from_millis(delay.unsigned_abs())).await;
        ElementResponse::empty()
    }

    async fn stop_stream(&self, context: &ElementContext<'_>) -> ElementResponse {
        record(&self.log, format!("stop:{}", context.element_name()));
        ElementResponse::empty()
    }

    fn name(&self) -> &'static str {
        "slow_start"
    }
}

/// Sleeps for the `delay` parameter in milliseconds, then forwards.
pub struct SlowElement {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[async_trait]
impl Element for SlowElement {
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let delay = context
            .parameter("delay")
            .as_ref()
            .and_then(value_as_i64)
            .unwrap_or(100)
            .max(0);
        tokio::time::sleep(Duration::from_millis(delay.unsigned_abs())).await;
        ElementResponse::okay(forward(&self.inputs, &self.outputs, &inputs))
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Returns STOP for every frame.
pub struct StoppingElement;

#[async_trait]
impl Element for StoppingElement {
    async fn process_frame(&self, _context: &ElementContext<'_>, _inputs: Swag) -> ElementResponse {
        ElementResponse::stop()
    }

    fn name(&self) -> &'static str {
        "stopping"
    }
}

/// Registry with every stub bound under its own name; recording hooks land
/// in `log`.
pub fn stub_registry(log: &EventLog) -> ElementRegistry {
    let mut registry = ElementRegistry::new();

    let recording_log = log.clone();
    registry.register(
        "recording",
        Arc::new(move |init: &ElementInit| {
            Ok(Arc::new(RecordingElement {
                log: recording_log.clone(),
                inputs: init.inputs.clone(),
                outputs: init.outputs.clone(),
            }) as Arc<dyn Element>)
        }),
    );

    let start_log = log.clone();
    registry.register(
        "start_failing",
        Arc::new(move |_init: &ElementInit| {
            Ok(Arc::new(StartFailingElement {
                log: start_log.clone(),
            }) as Arc<dyn Element>)
        }),
    );

    let slow_start_log = log.clone();
    registry.register(
        "slow_start",
        Arc::new(move |_init: &ElementInit| {
            Ok(Arc::new(SlowStartElement {
                log: slow_start_log.clone(),
            }) as Arc<dyn Element>)
        }),
    );

    registry.register(
        "failing",
        Arc::new(|_init: &ElementInit| Ok(Arc::new(FailingElement) as Arc<dyn Element>)),
    );
    registry.register(
        "fail_when",
        Arc::new(|init: &ElementInit| {
            Ok(Arc::new(FailWhenElement {
                inputs: init.inputs.clone(),
                outputs: init.outputs.clone(),
            }) as Arc<dyn Element>)
        }),
    );
    registry.register(
        "panicking",
        Arc::new(|_init: &ElementInit| Ok(Arc::new(PanickingElement) as Arc<dyn Element>)),
    );
    registry.register(
        "slow",
        Arc::new(|init: &ElementInit| {
            Ok(Arc::new(SlowElement {
                inputs: init.inputs.clone(),
                outputs: init.outputs.clone(),
            }) as Arc<dyn Element>)
        }),
    );
    registry.register(
        "stopping",
        Arc::new(|_init: &ElementInit| Ok(Arc::new(StoppingElement) as Arc<dyn Element>)),
    );
    registry
}
