// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use crate::config::{DependencyGraph, GraphDefinition};

/// A resolved route through the graph, starting at a head element.
///
/// `elements` is the walk order the router follows for every frame admitted
/// at this path. `required_inputs` are the inputs no earlier element on the
/// path produces; they must arrive as frame data.
///
/// # Examples
///
/// ```
/// use streamwood::config::{DependencyGraph, GraphDefinition, GraphPath};
///
/// let definition: GraphDefinition = serde_yaml::from_str(r#"
/// name: p
/// elements:
///   - { name: pe_0, input: [a], output: [b], deploy: { local: { class_name: increment } } }
///   - { name: pe_1, input: [b], output: [c], depends_on: [pe_0], deploy: { local: { class_name: increment } } }
/// "#).unwrap();
/// let graph = DependencyGraph::from_definition(&definition);
///
/// let path = GraphPath::resolve(&definition, &graph, "pe_0").unwrap();
/// assert_eq!(path.elements, vec!["pe_0", "pe_1"]);
/// assert_eq!(path.required_inputs, vec!["a"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath {
    pub head: String,
    pub elements: Vec<String>,
    pub required_inputs: Vec<String>,
}

impl GraphPath {
    pub fn resolve(
        definition: &GraphDefinition,
        graph: &DependencyGraph,
        head: &str,
    ) -> Option<Self> {
        let elements = graph.path_from(head)?;

        let mut produced: HashSet<String> = HashSet::new();
        let mut required_inputs = Vec::new();
        for name in &elements {
            let Some(element) = definition.element(name) else {
                continue;
            };
            for input in element.input_names() {
                if !produced.contains(&input) && !required_inputs.contains(&input) {
                    required_inputs.push(input);
                }
            }
            produced.extend(element.output_names());
        }

        Some(Self {
            head: head.to_string(),
            elements,
            required_inputs,
        })
    }

    /// Required inputs absent from `available`
    pub fn missing_inputs<'a, I>(&self, available: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let available: HashSet<&String> = available.into_iter().collect();
        self.required_inputs
            .iter()
            .filter(|input| !available.contains(input))
            .cloned()
            .collect()
    }

    pub fn is_terminal(&self, element: &str) -> bool {
        self.elements.last().map(String::as_str) == Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond_definition() -> GraphDefinition {
        serde_yaml::from_str(
            r#"
name: p_diamond
elements:
  - { name: pe_0, input: [a], output: [b], deploy: { local: { class_name: increment } } }
  - { name: pe_1, input: [b], output: [c], depends_on: [pe_0], deploy: { local: { class_name: increment } } }
  - { name: pe_2, input: [c], output: [d], depends_on: [pe_1], deploy: { local: { class_name: increment } } }
  - { name: pe_3, input: [c], output: [e], depends_on: [pe_1], deploy: { local: { class_name: increment } } }
  - { name: pe_4, input: [d, e], output: [f], depends_on: [pe_2, pe_3], deploy: { local: { class_name: sum } } }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_full_path_requires_only_head_inputs() {
        let definition = diamond_definition();
        let graph = DependencyGraph::from_definition(&definition);
        let path = GraphPath::resolve(&definition, &graph, "pe_0").unwrap();

        assert_eq!(path.required_inputs, vec!["a"]);
        assert!(path.is_terminal("pe_4"));
        assert!(!path.is_terminal("pe_0"));
    }

    #[test]
    fn test_partial_path_requires_sibling_outputs() {
        let definition = diamond_definition();
        let graph = DependencyGraph::from_definition(&definition);
        let path = GraphPath::resolve(&definition, &graph, "pe_2").unwrap();

        assert_eq!(path.elements, vec!["pe_2", "pe_4"]);
        assert_eq!(path.required_inputs, vec!["c", "e"]);

        let data = vec!["c".to_string()];
        assert_eq!(path.missing_inputs(&data), vec!["e"]);
    }
}
