// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Base64 codec for arbitrary frame values.
//!
//! `data_encode` serializes its input to JSON and base64-encodes the bytes;
//! `data_decode` reverses it. Together they let structured values cross
//! text-only boundaries.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::backends::local::elements::single_field;
use crate::engine::ElementContext;
use crate::traits::{Element, ElementInit, ElementResponse, Swag};

pub fn encode_value(value: &Value) -> Result<String, String> {
    serde_json::to_vec(value)
        .map(|bytes| STANDARD.encode(bytes))
        .map_err(|e| format!("Failed to serialize value: {}", e))
}

pub fn decode_value(encoded: &str) -> Result<Value, String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("Invalid base64: {}", e))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("Invalid encoded JSON: {}", e))
}

pub struct DataEncodeElement {
    input: String,
    output: String,
}

impl DataEncodeElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        let (input, output) = single_field(init)?;
        Ok(Self { input, output })
    }
}

#[async_trait]
impl Element for DataEncodeElement {
    async fn process_frame(&self, _context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let Some(value) = inputs.get(&self.input) else {
            return ElementResponse::error(format!("Input '{}' is missing", self.input));
        };
        match encode_value(value) {
            Ok(encoded) => {
                ElementResponse::okay(Swag::from([(self.output.clone(), Value::String(encoded))]))
            }
            Err(diagnostic) => ElementResponse::error(diagnostic),
        }
    }

    fn name(&self) -> &'static str {
        "data_encode"
    }
}

pub struct DataDecodeElement {
    input: String,
    output: String,
}

impl DataDecodeElement {
    pub fn new(init: &ElementInit) -> Result<Self, String> {
        let (input, output) = single_field(init)?;
        Ok(Self { input, output })
    }
}

#[async_trait]
impl Element for DataDecodeElement {
    async fn process_frame(&self, _context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let Some(encoded) = inputs.get(&self.input).and_then(Value::as_str) else {
            return ElementResponse::error(format!("Input '{}' is not a string", self.input));
        };
        match decode_value(encoded) {
            Ok(value) => ElementResponse::okay(Swag::from([(self.output.clone(), value)])),
            Err(diagnostic) => ElementResponse::error(diagnostic),
        }
    }

    fn name(&self) -> &'static str {
        "data_decode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::elements::test_support::run_frame;
    use crate::engine::StreamOptions;
    use crate::traits::StreamEvent;
    use serde_json::json;

    const CODEC: &str = r#"
name: codec
elements:
  - name: encode
    input: [data]
    output: [encoded]
    deploy: { local: { class_name: data_encode } }
  - name: decode
    input: [encoded]
    output: [decoded]
    depends_on: [encode]
    deploy: { local: { class_name: data_decode } }
"#;

    #[test]
    fn test_encoding_is_base64_of_json() {
        assert_eq!(encode_value(&json!({"a": 1})).unwrap(), "eyJhIjoxfQ==");
        assert_eq!(decode_value("eyJhIjoxfQ==").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_value("***").unwrap_err().starts_with("Invalid base64"));
        // "not json" in base64
        assert!(decode_value("bm90IGpzb24=")
            .unwrap_err()
            .starts_with("Invalid encoded JSON"));
    }

    #[tokio::test]
    async fn test_structured_value_survives_the_codec_chain() {
        let data = json!({"values": [1, 2, 3], "label": "x"});
        let response = run_frame(
            CODEC,
            StreamOptions::new(),
            Swag::from([("data".to_string(), data.clone())]),
        )
        .await;

        assert!(response.is_okay());
        assert_eq!(response.get("decoded"), Some(&data));
    }

    #[tokio::test]
    async fn test_decode_of_non_string_is_an_element_error() {
        let response = run_frame(
            CODEC,
            StreamOptions::new().graph_path("decode"),
            Swag::from([("encoded".to_string(), json!(12))]),
        )
        .await;

        assert_eq!(response.event, StreamEvent::Error);
        assert_eq!(response.diagnostic(), Some("Input 'encoded' is not a string"));
    }
}
