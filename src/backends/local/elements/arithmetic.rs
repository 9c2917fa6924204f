// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::backends::local::elements::single_field;
use crate::engine::{value_as_i64, ElementContext};
use crate::traits::{Element, ElementInit, ElementResponse, Swag};

fn integer_input(inputs: &Swag, name: &str) -> Result<i64, ElementResponse> {
    inputs.get(name).and_then(value_as_i64).ok_or_else(|| {
        ElementResponse::error(format!("Input '{}' is not an integer", name))
    })
}

/// Adds the `increment` parameter (default 1) to its single input.
pub struct IncrementElement {
    input: String,
    output: String,
}

impl IncrementElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        let (input, output) = single_field(init)?;
        Ok(Self { input, output })
    }
}

#[async_trait]
impl Element for IncrementElement {
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let value = match integer_input(&inputs, &self.input) {
            Ok(value) => value,
            Err(response) => return response,
        };
        let increment = context.parameter_i64("increment", 1);
        let Some(result) = value.checked_add(increment) else {
            return ElementResponse::error(format!("{} + {} overflows", value, increment));
        };

        debug!(
            element = context.element_name(),
            input = value,
            output = result,
            "increment"
        );
        ElementResponse::okay(Swag::from([(self.output.clone(), Value::from(result))]))
    }

    fn name(&self) -> &'static str {
        "increment"
    }
}

/// Adds the `constant` parameter (default 1) after an optional `delay`
/// given in seconds.
pub struct AddElement {
    input: String,
    output: String,
}

impl AddElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        let (input, output) = single_field(init)?;
        Ok(Self { input, output })
    }
}

#[async_trait]
impl Element for AddElement {
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let value = match integer_input(&inputs, &self.input) {
            Ok(value) => value,
            Err(response) => return response,
        };
        let constant = context.parameter_i64("constant", 1);

        let delay = context.parameter_f64("delay", 0.0);
        if delay > 0.0 {
            if let Ok(delay) = Duration::try_from_secs_f64(delay) {
                tokio::time::sleep(delay).await;
            }
        }

        let Some(result) = value.checked_add(constant) else {
            return ElementResponse::error(format!("{} + {} overflows", value, constant));
        };
        ElementResponse::okay(Swag::from([(self.output.clone(), Value::from(result))]))
    }

    fn name(&self) -> &'static str {
        "add"
    }
}

/// Sums every declared input into the single declared output.
pub struct SumElement {
    inputs: Vec<String>,
    output: String,
}

impl SumElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        let [output] = init.outputs.as_slice() else {
            return Err(format!(
                "expected exactly one output, found {}",
                init.outputs.len()
            ));
        };
        if init.inputs.is_empty() {
            return Err("expected at least one input".to_string());
        }
        Ok(Self {
            inputs: init.inputs.clone(),
            output: output.clone(),
        })
    }
}

#[async_trait]
impl Element for SumElement {
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let mut total: i64 = 0;
        for name in &self.inputs {
            let value = match integer_input(&inputs, name) {
                Ok(value) => value,
                Err(response) => return response,
            };
            match total.checked_add(value) {
                Some(sum) => total = sum,
                None => return ElementResponse::error("Sum overflows"),
            }
        }

        debug!(element = context.element_name(), total, "sum");
        ElementResponse::okay(Swag::from([(self.output.clone(), Value::from(total))]))
    }

    fn name(&self) -> &'static str {
        "sum"
    }
}
