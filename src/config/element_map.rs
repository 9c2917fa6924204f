// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Deploy, ElementRegistry, GraphDefinition, Parameters};
use crate::errors::ElementMapError;
use crate::observability::messages::element::ElementInstantiationFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::{Element, ElementInit};

/// Element instances of one pipeline, keyed by element name.
///
/// Every element is instantiated exactly once when the pipeline is built and
/// then shared by all streams through `Arc<dyn Element>`. Elements must
/// therefore keep per-stream state in stream variables, never on `self`.
#[derive(Clone, Default)]
pub struct ElementMap(pub HashMap<String, Arc<dyn Element>>);

impl ElementMap {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Instantiate every element of `definition` through `registry`.
    ///
    /// Construction parameters are the pipeline-scope `parameters` overlaid
    /// with each element's own declared parameters. The first failure aborts
    /// construction; a remote binding fails with `BackendNotImplemented`.
    pub fn from_definition(
        definition: &GraphDefinition,
        registry: &ElementRegistry,
        parameters: &Parameters,
    ) -> Result<Self, ElementMapError> {
        let mut elements = HashMap::new();

        for element in &definition.elements {
            let class_name = match &element.deploy {
                Deploy::Local { class_name, .. } => class_name,
                Deploy::Remote { service_filter } => {
                    return Err(ElementMapError::BackendNotImplemented {
                        element: element.name.clone(),
                        service_filter: service_filter.clone(),
                    });
                }
            };

            let mut construction = parameters.clone();
            construction.extend(
                element
                    .parameters
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );

            let init = ElementInit {
                name: element.name.clone(),
                class_name: class_name.clone(),
                protocol: element.protocol.clone(),
                inputs: element.input_names(),
                outputs: element.output_names(),
                parameters: construction,
            };

            let instance = registry.create(&init).inspect_err(|error| {
                ElementInstantiationFailed {
                    element: &element.name,
                    class_name,
                    error,
                }
                .log();
            })?;

            elements.insert(element.name.clone(), instance);
        }

        Ok(Self(elements))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Element>> {
        self.0.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl From<HashMap<String, Arc<dyn Element>>> for ElementMap {
    fn from(map: HashMap<String, Arc<dyn Element>>) -> Self {
        Self(map)
    }
}
