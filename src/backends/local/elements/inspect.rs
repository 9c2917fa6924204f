// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::backends::local::elements::frame_pass_through;
use crate::engine::ElementContext;
use crate::traits::{Element, ElementInit, ElementResponse, Swag};

/// Where inspected fields are written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Log,
    Print,
    File(String),
}

impl Target {
    fn parse(target: &str) -> Option<Self> {
        match target {
            "log" => Some(Self::Log),
            "print" => Some(Self::Print),
            _ => target
                .strip_prefix("file:")
                .filter(|path| !path.is_empty())
                .map(|path| Self::File(path.to_string())),
        }
    }
}

/// Reports selected fields of every frame it sees.
///
/// Parameters: `enable` (default true), `inspect` (field names, `*` or absent
/// for all) and `target` (`log`, `print` or `file:<path>`). A file target is
/// opened once per stream in append mode and closed by `stop_stream`.
pub struct InspectElement {
    outputs: Vec<String>,
}

impl InspectElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        Ok(Self {
            outputs: init.outputs.clone(),
        })
    }

    fn resource_key(context: &ElementContext<'_>) -> String {
        format!("inspect_file:{}", context.element_name())
    }

    fn lines(context: &ElementContext<'_>) -> Vec<String> {
        let Some(frame) = context.frame() else {
            return vec![];
        };
        let fields = context.parameter_list("inspect");
        let names: Vec<&String> = if fields.is_empty() || fields.iter().any(|f| f == "*") {
            frame.swag.keys().collect()
        } else {
            fields.iter().collect()
        };

        names
            .into_iter()
            .map(|name| {
                let value = frame.swag.get(name).unwrap_or(&Value::Null);
                format!(
                    "{} frame {} {}: {}",
                    context.element_name(),
                    frame.frame_id,
                    name,
                    value
                )
            })
            .collect()
    }

    /// Append `lines` to the stream's file, opening it on first use. The
    /// variables lock is held throughout so frames don't interleave lines.
    async fn append(context: &ElementContext<'_>, path: &str, lines: &[String]) -> Result<(), String> {
        let key = Self::resource_key(context);
        let mut variables = context.variables().await;
        if !variables.has_resource(&key) {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .map_err(|e| format!("Failed to open '{}': {}", path, e))?;
            variables.insert_resource(key.clone(), file);
        }
        let file = variables
            .resource_mut::<File>(&key)
            .ok_or_else(|| format!("Inspect resource '{}' is not a file", key))?;

        let mut text = String::new();
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        file.write_all(text.as_bytes())
            .await
            .map_err(|e| format!("Failed to write '{}': {}", path, e))?;
        file.flush()
            .await
            .map_err(|e| format!("Failed to flush '{}': {}", path, e))
    }
}

#[async_trait]
impl Element for InspectElement {
    async fn process_frame(&self, context: &ElementContext<'_>, _inputs: Swag) -> ElementResponse {
        let outputs = frame_pass_through(context, &self.outputs);
        if !context.parameter_bool("enable", true) {
            return ElementResponse::okay(outputs);
        }

        let target = context
            .parameter_string("target")
            .unwrap_or_else(|| "log".to_string());
        let Some(target) = Target::parse(&target) else {
            return ElementResponse::error(
                "'target' parameter must be 'file:<path>', 'log' or 'print'",
            );
        };

        let lines = Self::lines(context);
        match target {
            Target::Log => {
                for line in &lines {
                    info!(stream_id = context.stream_id(), "{}", line);
                }
            }
            Target::Print => {
                for line in &lines {
                    println!("{}", line);
                }
            }
            Target::File(path) => {
                if let Err(diagnostic) = Self::append(context, &path, &lines).await {
                    return ElementResponse::error(diagnostic);
                }
            }
        }
        ElementResponse::okay(outputs)
    }

    async fn stop_stream(&self, context: &ElementContext<'_>) -> ElementResponse {
        let key = Self::resource_key(context);
        let file = context.variables().await.take_resource::<File>(&key);
        if let Some(mut file) = file {
            if let Err(e) = file.flush().await {
                return ElementResponse::error(format!("Failed to flush inspect file: {}", e));
            }
        }
        ElementResponse::empty()
    }

    fn name(&self) -> &'static str {
        "inspect"
    }
}
