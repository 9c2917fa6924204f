// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Definition validation for graph integrity.
//!
//! The validation pipeline runs in a fixed order because later checks need a
//! structurally sound graph:
//!
//! 1. **Non-empty**: A definition must declare at least one element
//! 2. **Uniqueness**: Element names are unique
//! 3. **Reference Validation**: Every `depends_on` entry names a declared element
//! 4. **Cycle Detection**: DFS with a recursion stack, reporting the cycle path
//! 5. **Graph Path**: The default graph path, if given, names an element
//!
//! Input satisfiability is only a warning: an input that no ancestor produces
//! may legitimately arrive as frame data, so [`unproducible_inputs`] reports
//! candidates and the pipeline logs them at construction.

use std::collections::{HashMap, HashSet};

use crate::config::{DependencyGraph, GraphDefinition};
use crate::errors::ValidationError;
use crate::observability::messages::validation::{
    CyclicDependencyDetected, DuplicateElementName, UnresolvedDependency, ValidationCompleted,
    ValidationFailed, ValidationStarted,
};
use crate::observability::messages::StructuredLog;

/// Validates a definition for structural integrity.
///
/// Errors are accumulated so a user sees every problem at once. Cycle
/// detection is skipped while reference errors exist, since it needs every
/// edge to resolve.
///
/// # Returns
///
/// * `Ok(())` - Definition is ready to build a pipeline from
/// * `Err(Vec<ValidationError>)` - Every validation error found
pub fn validate_definition(definition: &GraphDefinition) -> Result<(), Vec<ValidationError>> {
    ValidationStarted {
        definition: &definition.name,
        element_count: definition.elements.len(),
    }
    .log();

    if definition.elements.is_empty() {
        ValidationFailed {
            definition: &definition.name,
            error_count: 1,
        }
        .log();
        return Err(vec![ValidationError::EmptyDefinition]);
    }

    let mut errors = Vec::new();

    if let Err(duplicate_errors) = validate_unique_element_names(definition) {
        errors.extend(duplicate_errors);
    }

    if let Err(unresolved_errors) = validate_dependency_references(definition) {
        errors.extend(unresolved_errors);
    }

    if errors.is_empty() {
        if let Err(cycle_errors) = validate_acyclic_graph(definition) {
            errors.extend(cycle_errors);
        }
    }

    if let Some(graph_path) = &definition.graph_path {
        if !definition.contains(graph_path) {
            errors.push(ValidationError::UnknownGraphPath {
                graph_path: graph_path.clone(),
            });
        }
    }

    if errors.is_empty() {
        ValidationCompleted {
            definition: &definition.name,
            element_count: definition.elements.len(),
            warning_count: 0,
        }
        .log();
        Ok(())
    } else {
        errors.iter().for_each(log_validation_error);
        ValidationFailed {
            definition: &definition.name,
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}

fn log_validation_error(error: &ValidationError) {
    match error {
        ValidationError::CyclicDependency { cycle } => CyclicDependencyDetected { cycle }.log(),
        ValidationError::UnresolvedDependency {
            element,
            missing_dependency,
        } => UnresolvedDependency {
            element,
            missing_dependency,
        }
        .log(),
        ValidationError::DuplicateElementName { element } => {
            DuplicateElementName { element }.log()
        }
        other => tracing::error!("{}", other),
    }
}

/// Inputs that no ancestor of the element produces, as `(element, input)` pairs.
///
/// These must be supplied as frame data whenever a graph path reaches the
/// element, so they are worth a warning but are not an error.
pub fn unproducible_inputs(
    definition: &GraphDefinition,
    graph: &DependencyGraph,
) -> Vec<(String, String)> {
    let mut unproducible = Vec::new();

    for element in &definition.elements {
        if element.depends_on.is_empty() {
            continue; // path heads take their inputs from frame data
        }
        let produced: HashSet<String> = graph
            .ancestors(&element.name)
            .iter()
            .filter_map(|ancestor| definition.element(ancestor))
            .flat_map(|ancestor| ancestor.output_names())
            .collect();

        for input in element.input_names() {
            if !produced.contains(&input) {
                unproducible.push((element.name.clone(), input));
            }
        }
    }

    unproducible
}

/// Validates that all element names are unique.
///
/// Names are the primary key for dependency references, graph paths,
/// parameter scopes and metrics, so a duplicate makes all of those ambiguous.
fn validate_unique_element_names(definition: &GraphDefinition) -> Result<(), Vec<ValidationError>> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for element in &definition.elements {
        if !seen.insert(&element.name) {
            errors.push(ValidationError::DuplicateElementName {
                element: element.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates that all dependency references point to declared elements.
fn validate_dependency_references(
    definition: &GraphDefinition,
) -> Result<(), Vec<ValidationError>> {
    let names: HashSet<&str> = definition.element_names().collect();
    let mut errors = Vec::new();

    for element in &definition.elements {
        for dependency in &element.depends_on {
            if !names.contains(dependency.as_str()) {
                errors.push(ValidationError::UnresolvedDependency {
                    element: element.name.clone(),
                    missing_dependency: dependency.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates that the dependency graph is acyclic.
///
/// Uses the "three colors" DFS: a node met again while it is still on the
/// recursion stack closes a cycle, and the path segment from that node to the
/// current one is the cycle reported to the user.
fn validate_acyclic_graph(definition: &GraphDefinition) -> Result<(), Vec<ValidationError>> {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();

    for element in &definition.elements {
        graph.entry(element.name.as_str()).or_default();
    }

    // Edges run dependency -> dependent
    for element in &definition.elements {
        for dependency in &element.depends_on {
            graph
                .entry(dependency.as_str())
                .or_default()
                .push(element.name.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    // Declaration order keeps the reported cycle stable between runs
    for element in &definition.elements {
        if !visited.contains(element.name.as_str()) {
            if let Some(cycle) = dfs_cycle_detection(
                &element.name,
                &graph,
                &mut visited,
                &mut rec_stack,
                &mut path,
            ) {
                return Err(vec![ValidationError::CyclicDependency { cycle }]);
            }
        }
    }

    Ok(())
}

/// Depth-first search with cycle detection and path tracking.
///
/// For `A -> B -> C -> A` the search reaches A again while A is still on the
/// recursion stack; the cycle is `path[position(A)..] + [A]`.
fn dfs_cycle_detection(
    node: &str,
    graph: &HashMap<&str, Vec<&str>>,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path)
                {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                let cycle_start = path.iter().position(|x| x == neighbor).unwrap_or(0);
                let mut cycle = path[cycle_start..].to_vec();
                cycle.push(neighbor.to_string());
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Deploy, ElementDefinition, FieldDefinition, RuntimeOptions};

    fn element(name: &str, depends_on: Vec<&str>) -> ElementDefinition {
        ElementDefinition {
            name: name.to_string(),
            protocol: None,
            input: vec![],
            output: vec![],
            parameters: Default::default(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            deploy: Deploy::Local {
                class_name: "increment".to_string(),
                module: None,
            },
        }
    }

    fn definition(elements: Vec<ElementDefinition>) -> GraphDefinition {
        GraphDefinition {
            name: "p_test".to_string(),
            version: 0,
            graph_path: None,
            parameters: Default::default(),
            runtime: RuntimeOptions::default(),
            elements,
        }
    }

    #[test]
    fn test_empty_definition_is_rejected() {
        let errors = validate_definition(&definition(vec![])).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyDefinition]);
    }

    #[test]
    fn test_valid_linear_chain() {
        let definition = definition(vec![
            element("a", vec![]),
            element("b", vec!["a"]),
            element("c", vec!["b"]),
        ]);
        assert!(validate_definition(&definition).is_ok());
    }

    #[test]
    fn test_valid_diamond_dependency() {
        let definition = definition(vec![
            element("a", vec![]),
            element("b", vec!["a"]),
            element("c", vec!["a"]),
            element("d", vec!["b", "c"]),
        ]);
        assert!(validate_definition(&definition).is_ok());
    }

    #[test]
    fn test_duplicate_element_names() {
        let definition = definition(vec![element("a", vec![]), element("a", vec![])]);
        let errors = validate_definition(&definition).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ValidationError::DuplicateElementName { .. }
        ));
    }

    #[test]
    fn test_unresolved_dependency() {
        let definition = definition(vec![element("a", vec![]), element("b", vec!["nonexistent"])]);
        let errors = validate_definition(&definition).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnresolvedDependency {
                element: "b".to_string(),
                missing_dependency: "nonexistent".to_string(),
            }]
        );
    }

    #[test]
    fn test_complex_cycle_reports_path() {
        let definition = definition(vec![
            element("a", vec![]),
            element("b", vec!["a", "d"]),
            element("c", vec!["b"]),
            element("d", vec!["c"]),
        ]);
        let errors = validate_definition(&definition).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            ValidationError::CyclicDependency { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.contains(&"b".to_string()));
                assert!(cycle.contains(&"c".to_string()));
                assert!(cycle.contains(&"d".to_string()));
            }
            other => panic!("Expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_cycle() {
        let definition = definition(vec![element("a", vec!["a"])]);
        let errors = validate_definition(&definition).unwrap_err();
        assert!(matches!(errors[0], ValidationError::CyclicDependency { .. }));
    }

    #[test]
    fn test_unknown_default_graph_path() {
        let mut definition = definition(vec![element("a", vec![])]);
        definition.graph_path = Some("missing".to_string());
        let errors = validate_definition(&definition).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnknownGraphPath {
                graph_path: "missing".to_string()
            }]
        );
    }

    #[test]
    fn test_multiple_errors_are_accumulated() {
        let definition = definition(vec![
            element("a", vec!["nonexistent"]),
            element("a", vec![]),
            element("b", vec!["missing"]),
        ]);
        let errors = validate_definition(&definition).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_unproducible_inputs_are_reported() {
        let mut producer = element("a", vec![]);
        producer.output = vec![FieldDefinition::from("b")];
        let mut consumer = element("b", vec!["a"]);
        consumer.input = vec![FieldDefinition::from("b"), FieldDefinition::from("z")];
        let definition = definition(vec![producer, consumer]);
        let graph = DependencyGraph::from_definition(&definition);

        assert_eq!(
            unproducible_inputs(&definition, &graph),
            vec![("b".to_string(), "z".to_string())]
        );
    }
}
