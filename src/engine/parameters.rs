// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Layered parameter lookup.
//!
//! Every element reads its configuration through one resolver. A key is looked
//! up at stream scope, then in the element's declared parameters, then at
//! pipeline scope; only when all three miss does the caller's default apply,
//! and only then is `found` false. Absence is never an error, so elements can
//! branch on "was this explicitly configured".

use serde_json::Value;
use std::collections::HashMap;

use crate::config::{GraphDefinition, Parameters};

/// Which scope satisfied a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterScope {
    Stream,
    Element,
    Pipeline,
    Default,
}

/// Read-only parameter scopes captured at pipeline construction.
#[derive(Debug, Clone, Default)]
pub struct ParameterResolver {
    pipeline: Parameters,
    elements: HashMap<String, Parameters>,
}

impl ParameterResolver {
    /// Build the resolver from a definition.
    ///
    /// Pipeline scope is the definition's own `parameters` overlaid with the
    /// parameters supplied when the pipeline is created.
    pub fn new(definition: &GraphDefinition, construction: &Parameters) -> Self {
        let mut pipeline = definition.parameters.clone();
        pipeline.extend(construction.iter().map(|(k, v)| (k.clone(), v.clone())));

        let elements = definition
            .elements
            .iter()
            .map(|element| (element.name.clone(), element.parameters.clone()))
            .collect();

        Self { pipeline, elements }
    }

    /// Resolve `key` for `element` within a stream; returns `(value, found)`.
    pub fn resolve(
        &self,
        stream: &Parameters,
        element: &str,
        key: &str,
        default: Value,
    ) -> (Value, bool) {
        let (value, scope) = self.resolve_scoped(stream, element, key, default);
        (value, scope != ParameterScope::Default)
    }

    /// Like [`resolve`](Self::resolve) but reports the scope that matched
    pub fn resolve_scoped(
        &self,
        stream: &Parameters,
        element: &str,
        key: &str,
        default: Value,
    ) -> (Value, ParameterScope) {
        if let Some(value) = stream.get(key) {
            return (value.clone(), ParameterScope::Stream);
        }
        if let Some(value) = self.elements.get(element).and_then(|p| p.get(key)) {
            return (value.clone(), ParameterScope::Element);
        }
        if let Some(value) = self.pipeline.get(key) {
            return (value.clone(), ParameterScope::Pipeline);
        }
        (default, ParameterScope::Default)
    }

    pub fn pipeline_parameters(&self) -> &Parameters {
        &self.pipeline
    }

    /// Pipeline scope overlaid with the element's declared parameters
    pub fn construction_parameters(&self, element: &str) -> Parameters {
        let mut parameters = self.pipeline.clone();
        if let Some(declared) = self.elements.get(element) {
            parameters.extend(declared.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        parameters
    }
}

// Parameters frequently arrive as strings (command line, wire protocol), so
// the typed accessors accept numeric and boolean text as well.

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f as i64)),
        Value::String(text) => text.trim().parse().ok(),
        Value::Bool(flag) => Some(i64::from(*flag)),
        _ => None,
    }
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Strings as-is, other scalars in their JSON rendering
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// A list parameter: a JSON array, or a comma/space separated string
pub fn value_as_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_as_string).collect(),
        Value::String(text) => text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Null => vec![],
        other => vec![other.to_string()],
    }
}
