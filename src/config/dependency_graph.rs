// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::config::GraphDefinition;

/// Adjacency view of a definition's `depends_on` edges.
///
/// `dependents` maps an element to the elements that consume it, in
/// declaration order. The graph is assumed acyclic; validation rejects
/// cycles before a pipeline is ever built.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependents: HashMap<String, Vec<String>>,
    dependencies: HashMap<String, Vec<String>>,
    declaration_order: Vec<String>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definition(definition: &GraphDefinition) -> Self {
        let mut graph = Self::new();
        for element in &definition.elements {
            graph.add_element(element.name.clone(), element.depends_on.clone());
        }
        graph
    }

    /// Add an element together with the elements it depends on
    pub fn add_element(&mut self, name: String, depends_on: Vec<String>) {
        self.declaration_order.push(name.clone());
        self.dependents.entry(name.clone()).or_default();
        for dependency in &depends_on {
            self.dependents
                .entry(dependency.clone())
                .or_default()
                .push(name.clone());
        }
        self.dependencies.insert(name, depends_on);
    }

    /// Get dependents for an element
    pub fn get_dependents(&self, name: &str) -> Option<&Vec<String>> {
        self.dependents.get(name)
    }

    /// Get the direct dependencies of an element
    pub fn get_dependencies(&self, name: &str) -> Option<&Vec<String>> {
        self.dependencies.get(name)
    }

    /// Get all element names in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.declaration_order.iter()
    }

    /// Every element upstream of `name`, excluding `name` itself
    pub fn ancestors(&self, name: &str) -> HashSet<String> {
        let mut ancestors = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([name]);

        while let Some(current) = queue.pop_front() {
            for dependency in self.dependencies.get(current).into_iter().flatten() {
                if ancestors.insert(dependency.clone()) {
                    queue.push_back(dependency);
                }
            }
        }

        ancestors
    }

    /// Elements reachable from `head` in topological order.
    ///
    /// Kahn's algorithm restricted to the reachable subgraph; ties between
    /// ready elements are broken by declaration order so the walk is
    /// deterministic. Returns `None` if `head` is not in the graph.
    pub fn path_from(&self, head: &str) -> Option<Vec<String>> {
        if !self.dependents.contains_key(head) {
            return None;
        }

        let mut reachable: HashSet<&str> = HashSet::from([head]);
        let mut queue: VecDeque<&str> = VecDeque::from([head]);
        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents.get(current).into_iter().flatten() {
                if reachable.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        let rank: HashMap<&str, usize> = self
            .declaration_order
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index))
            .collect();

        let mut in_degree: HashMap<&str, usize> = reachable
            .iter()
            .map(|&name| {
                let count = self
                    .dependencies
                    .get(name)
                    .into_iter()
                    .flatten()
                    .filter(|dependency| reachable.contains(dependency.as_str()))
                    .count();
                (name, count)
            })
            .collect();

        let mut ready: BTreeSet<(usize, &str)> = in_degree
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&name, _)| (rank.get(name).copied().unwrap_or(usize::MAX), name))
            .collect();

        let mut order = Vec::with_capacity(reachable.len());
        while let Some((_, name)) = ready.pop_first() {
            order.push(name.to_string());
            for dependent in self.dependents.get(name).into_iter().flatten() {
                if let Some(count) = in_degree.get_mut(dependent.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert((
                            rank.get(dependent.as_str()).copied().unwrap_or(usize::MAX),
                            dependent.as_str(),
                        ));
                    }
                }
            }
        }

        Some(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> DependencyGraph {
        // pe_0 -> pe_1 -> (pe_2, pe_3) -> pe_4
        let mut graph = DependencyGraph::new();
        graph.add_element("pe_0".to_string(), vec![]);
        graph.add_element("pe_1".to_string(), vec!["pe_0".to_string()]);
        graph.add_element("pe_2".to_string(), vec!["pe_1".to_string()]);
        graph.add_element("pe_3".to_string(), vec!["pe_1".to_string()]);
        graph.add_element(
            "pe_4".to_string(),
            vec!["pe_2".to_string(), "pe_3".to_string()],
        );
        graph
    }

    #[test]
    fn test_path_from_head_is_topological() {
        let graph = diamond();
        assert_eq!(
            graph.path_from("pe_0").unwrap(),
            vec!["pe_0", "pe_1", "pe_2", "pe_3", "pe_4"]
        );
    }

    #[test]
    fn test_path_from_inner_element_only_reaches_downstream() {
        let graph = diamond();
        assert_eq!(graph.path_from("pe_3").unwrap(), vec!["pe_3", "pe_4"]);
    }

    #[test]
    fn test_path_from_unknown_head() {
        assert!(diamond().path_from("missing").is_none());
    }

    #[test]
    fn test_ancestors() {
        let graph = diamond();
        let ancestors = graph.ancestors("pe_4");
        assert_eq!(ancestors.len(), 4);
        assert!(graph.ancestors("pe_0").is_empty());
    }

    #[test]
    fn test_dependents_follow_declaration_order() {
        let graph = diamond();
        assert_eq!(
            graph.get_dependents("pe_1").unwrap(),
            &vec!["pe_2".to_string(), "pe_3".to_string()]
        );
        assert!(graph.get_dependents("pe_4").unwrap().is_empty());
    }
}
