// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::elements::*;
use crate::errors::ElementMapError;
use crate::traits::{Element, ElementInit};

fn boxed<E: Element + 'static>(element: Result<E, String>) -> Result<Arc<dyn Element>, String> {
    element.map(|element| Arc::new(element) as Arc<dyn Element>)
}

/// Factory for the built-in (in-process) element library
pub struct LocalElementFactory;

impl LocalElementFactory {
    /// Create an element from its definition.
    ///
    /// `class_name` selects the implementation:
    /// - "add", "increment", "sum" -> arithmetic on integer fields
    /// - "text_in", "text", "text_out" -> TextSuffixElement with its default suffix
    /// - "select", "option", "aggregate" -> dynamic branching and rejoin
    /// - "inspect", "metrics" -> frame observers
    /// - "random_integers" -> generator source
    /// - "data_encode", "data_decode" -> base64/JSON codec
    pub fn create_element(init: &ElementInit) -> Result<Arc<dyn Element>, ElementMapError> {
        let created = match init.class_name.as_str() {
            // Arithmetic
            "add" => boxed(AddElement::new(init)),
            "increment" => boxed(IncrementElement::new(init)),
            "sum" => boxed(SumElement::new(init)),

            // Text
            "text_in" => boxed(TextSuffixElement::text_in(init)),
            "text" => boxed(TextSuffixElement::text(init)),
            "text_out" => boxed(TextSuffixElement::text_out(init)),

            // Branching
            "select" => boxed(SelectElement::new(init)),
            "option" => boxed(OptionElement::new(init)),
            "aggregate" => boxed(AggregateElement::new(init)),

            // Observers
            "inspect" => boxed(InspectElement::new(init)),
            "metrics" => boxed(MetricsElement::new(init)),

            // Sources and codecs
            "random_integers" => boxed(RandomIntegersElement::new(init)),
            "data_encode" => boxed(DataEncodeElement::new(init)),
            "data_decode" => boxed(DataDecodeElement::new(init)),

            _ => {
                return Err(ElementMapError::UnknownImplementation {
                    element: init.name.clone(),
                    class_name: init.class_name.clone(),
                })
            }
        };

        created.map_err(|reason| ElementMapError::ElementCreationFailed {
            element: init.name.clone(),
            class_name: init.class_name.clone(),
            reason,
        })
    }

    /// List all built-in element implementations
    pub fn list_available_implementations() -> Vec<&'static str> {
        vec![
            "add",
            "increment",
            "sum",
            "text_in",
            "text",
            "text_out",
            "select",
            "option",
            "aggregate",
            "inspect",
            "metrics",
            "random_integers",
            "data_encode",
            "data_decode",
        ]
    }

    /// Check if an implementation is available
    pub fn is_implementation_available(class_name: &str) -> bool {
        Self::list_available_implementations().contains(&class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::elements::test_support::init;

    fn io_for(class_name: &str) -> (Vec<&'static str>, Vec<&'static str>) {
        match class_name {
            "sum" => (vec!["a", "b"], vec!["c"]),
            "aggregate" => (vec!["text_b", "out_c"], vec!["complete", "results"]),
            "inspect" | "metrics" => (vec![], vec!["a"]),
            _ => (vec!["a"], vec!["b"]),
        }
    }

    #[test]
    fn test_every_listed_implementation_can_be_created() {
        for class_name in LocalElementFactory::list_available_implementations() {
            let (inputs, outputs) = io_for(class_name);
            let element = LocalElementFactory::create_element(&init(class_name, &inputs, &outputs))
                .unwrap_or_else(|e| panic!("{}: {}", class_name, e));
            assert_eq!(element.name(), class_name);
        }
    }

    #[test]
    fn test_unknown_implementation() {
        let result = LocalElementFactory::create_element(&init("reverse_text", &["a"], &["b"]));
        assert!(matches!(
            result,
            Err(ElementMapError::UnknownImplementation { class_name, .. }) if class_name == "reverse_text"
        ));
    }

    #[test]
    fn test_constructor_rejection_is_creation_failure() {
        let result = LocalElementFactory::create_element(&init("increment", &["a", "b"], &["c"]));
        assert!(matches!(
            result,
            Err(ElementMapError::ElementCreationFailed { reason, .. }) if reason.contains("exactly one input")
        ));
    }

    #[test]
    fn test_is_implementation_available() {
        assert!(LocalElementFactory::is_implementation_available("select"));
        assert!(LocalElementFactory::is_implementation_available("data_decode"));
        assert!(!LocalElementFactory::is_implementation_available("wasm"));
    }
}
