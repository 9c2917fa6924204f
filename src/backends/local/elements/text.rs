// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use crate::backends::local::elements::single_field;
use crate::engine::{value_as_string, ElementContext};
use crate::traits::{Element, ElementInit, ElementResponse, Swag};

/// Appends a suffix to its single text input.
///
/// Backs the `text_in`, `text` and `text_out` bindings, which differ only in
/// their default suffix. A `suffix` parameter overrides it.
pub struct TextSuffixElement {
    binding: &'static str,
    default_suffix: &'static str,
    input: String,
    output: String,
}

impl TextSuffixElement {
    pub fn new(
        init: &ElementInit,
        binding: &'static str,
        default_suffix: &'static str,
    ) -> Result<Self, String> {
        let (input, output) = single_field(init)?;
        Ok(Self {
            binding,
            default_suffix,
            input,
            output,
        })
    }

    pub fn text_in(init: &ElementInit) -> Result<Self, String> {
        Self::new(init, "text_in", ":in")
    }

    pub fn text(init: &ElementInit) -> Result<Self, String> {
        Self::new(init, "text", ":text")
    }

    pub fn text_out(init: &ElementInit) -> Result<Self, String> {
        Self::new(init, "text_out", ":out")
    }
}

#[async_trait]
impl Element for TextSuffixElement {
    async fn process_frame(&self, context: &ElementContext<'_>, inputs: Swag) -> ElementResponse {
        let Some(text) = inputs.get(&self.input).and_then(value_as_string) else {
            return ElementResponse::error(format!("Input '{}' has no text", self.input));
        };
        let suffix = context
            .parameter_string("suffix")
            .unwrap_or_else(|| self.default_suffix.to_string());

        ElementResponse::okay(Swag::from([(
            self.output.clone(),
            Value::String(format!("{}{}", text, suffix)),
        )]))
    }

    fn name(&self) -> &'static str {
        self.binding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::elements::test_support::{init, run_frame};
    use crate::engine::StreamOptions;
    use serde_json::json;

    const TEXT_CHAIN: &str = r#"
name: text_chain
elements:
  - name: pe_in
    input: [in_a]
    output: [text_b]
    deploy: { local: { class_name: text_in } }
  - name: pe_text
    input: [text_b]
    output: [text_c]
    depends_on: [pe_in]
    deploy: { local: { class_name: text } }
  - name: pe_out
    input: [text_c]
    output: [out_c]
    depends_on: [pe_text]
    deploy: { local: { class_name: text_out } }
"#;

    #[test]
    fn test_bindings_report_their_name() {
        let init = init("text", &["a"], &["b"]);
        assert_eq!(TextSuffixElement::text_in(&init).unwrap().name(), "text_in");
        assert_eq!(TextSuffixElement::text(&init).unwrap().name(), "text");
        assert_eq!(TextSuffixElement::text_out(&init).unwrap().name(), "text_out");
    }

    #[tokio::test]
    async fn test_suffixes_accumulate_along_the_chain() {
        let response = run_frame(
            TEXT_CHAIN,
            StreamOptions::new(),
            Swag::from([("in_a".to_string(), json!("hello"))]),
        )
        .await;

        assert_eq!(response.get("text_b"), Some(&json!("hello:in")));
        assert_eq!(response.get("text_c"), Some(&json!("hello:in:text")));
        assert_eq!(response.get("out_c"), Some(&json!("hello:in:text:out")));
    }

    #[tokio::test]
    async fn test_non_string_input_is_rendered() {
        let response = run_frame(
            TEXT_CHAIN,
            StreamOptions::new().parameter("suffix", "!"),
            Swag::from([("in_a".to_string(), json!(7))]),
        )
        .await;

        assert_eq!(response.get("out_c"), Some(&json!("7!!!")));
    }
}
