// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_BRANCH_SELECTOR, DEFAULT_EXPIRY_CHECK_MS, DEFAULT_GRACE_TIME_SECS,
    DEFAULT_RESPONSE_TIMEOUT_SECS, MIN_DEFAULT_CONCURRENCY, SELECT_CLASS_NAME, TOOL_PARAMETER,
};
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Key/value parameters at any scope (pipeline, element or stream).
pub type Parameters = BTreeMap<String, Value>;

/// A parsed pipeline definition.
///
/// The definition is loaded once and shared read-only by every stream of the
/// pipeline built from it. Elements keep the order they were declared in, which
/// is also the tie-breaker for the topological order of a graph path.
///
/// # Example
/// ```yaml
/// name: p_example
/// graph_path: pe_0
/// parameters:
///   pe_1_inc: 2
/// runtime:
///   max_concurrency: 4
///   grace_time_secs: 60
/// elements:
///   - name: pe_0
///     input: [a]
///     output: [b]
///     deploy: { local: { class_name: increment } }
///   - name: pe_1
///     input: [b]
///     output: [{ name: c, type: int }]
///     depends_on: [pe_0]
///     deploy: { local: { class_name: increment } }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphDefinition {
    pub name: String,
    #[serde(default)]
    pub version: u32,
    /// Default head element for streams that don't choose a graph path
    #[serde(default)]
    pub graph_path: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub runtime: RuntimeOptions,
    pub elements: Vec<ElementDefinition>,
}

/// One element of the graph.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElementDefinition {
    pub name: String,
    /// Protocol tag advertised by the element, e.g. `increment:0`
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub input: Vec<FieldDefinition>,
    #[serde(default)]
    pub output: Vec<FieldDefinition>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub deploy: Deploy,
}

/// A declared input or output field.
///
/// Accepts either a bare name (`a`) or a descriptor (`{ name: a, type: int }`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "FieldRepr")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldRepr {
    Name(String),
    Descriptor {
        name: String,
        #[serde(rename = "type", default)]
        field_type: Option<String>,
    },
}

impl From<FieldRepr> for FieldDefinition {
    fn from(repr: FieldRepr) -> Self {
        match repr {
            FieldRepr::Name(name) => Self {
                name,
                field_type: None,
            },
            FieldRepr::Descriptor { name, field_type } => Self { name, field_type },
        }
    }
}

impl From<&str> for FieldDefinition {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: None,
        }
    }
}

/// Where an element's implementation lives.
///
/// # Variants
/// * `Local` - In-process implementation looked up by class name in the element registry
/// * `Remote` - Element hosted by another process, discovered through a service filter
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Deploy {
    Local {
        class_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module: Option<String>,
    },
    Remote {
        service_filter: String,
    },
}

/// Engine options carried by a definition.
///
/// # Fields
/// * `max_concurrency` - Frames routed in parallel. Defaults to the available
///   parallelism but never fewer than `MIN_DEFAULT_CONCURRENCY`, since a frame
///   keeps its worker while its element awaits
/// * `grace_time_secs` - Idle-expiry for streams created without a grace time
/// * `expiry_check_ms` - Period of the idle-stream sweep
/// * `response_timeout_secs` - Window used by the request/response adapter
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeOptions {
    pub max_concurrency: Option<usize>,
    pub grace_time_secs: Option<u64>,
    pub expiry_check_ms: Option<u64>,
    pub response_timeout_secs: Option<u64>,
}

impl RuntimeOptions {
    pub fn get_max_concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
                    .max(MIN_DEFAULT_CONCURRENCY)
            })
            .max(1)
    }

    pub fn get_grace_time(&self) -> Duration {
        Duration::from_secs(self.grace_time_secs.unwrap_or(DEFAULT_GRACE_TIME_SECS))
    }

    pub fn get_expiry_check(&self) -> Duration {
        Duration::from_millis(self.expiry_check_ms.unwrap_or(DEFAULT_EXPIRY_CHECK_MS).max(1))
    }

    pub fn get_response_timeout(&self) -> Duration {
        Duration::from_secs(
            self.response_timeout_secs
                .unwrap_or(DEFAULT_RESPONSE_TIMEOUT_SECS),
        )
    }
}

/// An element advertised as a callable tool through its `tool` parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub inputs: Vec<String>,
}

impl ElementDefinition {
    pub fn input_names(&self) -> Vec<String> {
        self.input.iter().map(|field| field.name.clone()).collect()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.output.iter().map(|field| field.name.clone()).collect()
    }

    /// Class name of a locally deployed element
    pub fn class_name(&self) -> Option<&str> {
        match &self.deploy {
            Deploy::Local { class_name, .. } => Some(class_name),
            Deploy::Remote { .. } => None,
        }
    }
}

impl GraphDefinition {
    pub fn element(&self, name: &str) -> Option<&ElementDefinition> {
        self.elements.iter().find(|element| element.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.element(name).is_some()
    }

    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|element| element.name.as_str())
    }

    /// Head element used when a stream doesn't pick a graph path.
    ///
    /// The explicit `graph_path` wins; otherwise the first declared element
    /// without dependencies is the natural start of the graph.
    pub fn default_graph_path(&self) -> Option<&str> {
        if let Some(graph_path) = &self.graph_path {
            return Some(graph_path);
        }
        self.elements
            .iter()
            .find(|element| element.depends_on.is_empty())
            .or_else(|| self.elements.first())
            .map(|element| element.name.as_str())
    }

    /// Marker parameter used to discover dynamic branch targets.
    ///
    /// Defaults to `option`; a `select` element may rename it through its own
    /// `selector` parameter.
    pub fn branch_selector(&self) -> String {
        self.elements
            .iter()
            .find(|element| element.class_name() == Some(SELECT_CLASS_NAME))
            .and_then(|element| element.parameters.get("selector"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BRANCH_SELECTOR)
            .to_string()
    }

    /// Elements carrying the branch marker parameter, in declaration order
    pub fn branch_targets(&self) -> Vec<String> {
        let selector = self.branch_selector();
        self.elements
            .iter()
            .filter(|element| element.parameters.contains_key(&selector))
            .map(|element| element.name.clone())
            .collect()
    }

    /// Elements advertised as tools
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.elements
            .iter()
            .filter(|element| element.parameters.contains_key(TOOL_PARAMETER))
            .map(|element| ToolDescriptor {
                name: element.name.clone(),
                description: element
                    .parameters
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                inputs: element.input_names(),
            })
            .collect()
    }
}

/// Load a definition from a YAML, JSON or TOML file (chosen by extension)
pub fn load_definition<P: AsRef<Path>>(path: P) -> Result<GraphDefinition, PipelineError> {
    let path = path.as_ref();
    let load_error = |reason: String| PipelineError::DefinitionLoad {
        path: path.display().to_string(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("yaml")
        .to_ascii_lowercase();

    match extension.as_str() {
        "json" => serde_json::from_str(&content).map_err(|e| load_error(e.to_string())),
        "toml" => toml::from_str(&content).map_err(|e| load_error(e.to_string())),
        _ => serde_yaml::from_str(&content).map_err(|e| load_error(e.to_string())),
    }
}

/// Load and validate a definition
///
/// Fails when the graph is structurally unusable: duplicate names, unresolved
/// dependencies, cycles or an unknown default graph path.
pub fn load_and_validate_definition<P: AsRef<Path>>(
    path: P,
) -> Result<GraphDefinition, PipelineError> {
    let definition = load_definition(path)?;
    crate::config::validate_definition(&definition).map_err(PipelineError::Validation)?;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PATHS_YAML: &str = r#"
name: p_paths
parameters:
  greeting: hello
elements:
  - name: pe_in
    input: [in_a]
    output: [text_b]
    deploy: { local: { class_name: text_in } }
  - name: pe_select
    input: [text_b]
    output: [text_b]
    depends_on: [pe_in]
    parameters: { selector: route, next_step: pe_out }
    deploy: { local: { class_name: select } }
  - name: pe_x
    input: [text_b]
    output: [out_c]
    parameters: { route: true }
    deploy: { local: { class_name: option } }
  - name: pe_out
    input: [text_b, out_c]
    output: [complete, results]
    parameters: { tool: true, description: "Collects branch results" }
    deploy: { remote: { service_filter: "name=collector" } }
"#;

    #[test]
    fn parse_basic_definition() {
        let definition: GraphDefinition = serde_yaml::from_str(PATHS_YAML).unwrap();
        assert_eq!(definition.name, "p_paths");
        assert_eq!(definition.elements.len(), 4);
        assert_eq!(definition.elements[1].depends_on, vec!["pe_in"]);
        assert_eq!(definition.elements[0].class_name(), Some("text_in"));
        assert_eq!(definition.elements[3].class_name(), None);
    }

    #[test]
    fn test_field_definitions_accept_names_and_descriptors() {
        let yaml = r#"
name: p
elements:
  - name: pe
    input: [a, { name: b, type: int }]
    output: [{ name: c }]
    deploy: { local: { class_name: sum } }
"#;
        let definition: GraphDefinition = serde_yaml::from_str(yaml).unwrap();
        let element = &definition.elements[0];
        assert_eq!(element.input_names(), vec!["a", "b"]);
        assert_eq!(element.input[1].field_type.as_deref(), Some("int"));
        assert_eq!(element.output_names(), vec!["c"]);
    }

    #[test]
    fn test_default_graph_path_is_first_independent_element() {
        let definition: GraphDefinition = serde_yaml::from_str(PATHS_YAML).unwrap();
        assert_eq!(definition.default_graph_path(), Some("pe_in"));

        let mut explicit = definition.clone();
        explicit.graph_path = Some("pe_x".to_string());
        assert_eq!(explicit.default_graph_path(), Some("pe_x"));
    }

    #[test]
    fn test_branch_selector_comes_from_select_element() {
        let definition: GraphDefinition = serde_yaml::from_str(PATHS_YAML).unwrap();
        assert_eq!(definition.branch_selector(), "route");
        assert_eq!(definition.branch_targets(), vec!["pe_x"]);
    }

    #[test]
    fn test_branch_selector_defaults_to_option() {
        let yaml = r#"
name: p
elements:
  - name: pe_a
    parameters: { option: 1 }
    deploy: { local: { class_name: option } }
  - name: pe_b
    deploy: { local: { class_name: option } }
"#;
        let definition: GraphDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(definition.branch_selector(), "option");
        assert_eq!(definition.branch_targets(), vec!["pe_a"]);
    }

    #[test]
    fn test_tools_are_discovered_from_parameters() {
        let definition: GraphDefinition = serde_yaml::from_str(PATHS_YAML).unwrap();
        let tools = definition.tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "pe_out");
        assert_eq!(
            tools[0].description.as_deref(),
            Some("Collects branch results")
        );
        assert_eq!(tools[0].inputs, vec!["text_b", "out_c"]);
    }

    #[test]
    fn test_runtime_defaults() {
        let options = RuntimeOptions::default();
        assert_eq!(options.get_grace_time(), Duration::from_secs(300));
        assert_eq!(options.get_expiry_check(), Duration::from_millis(1_000));
        assert_eq!(options.get_response_timeout(), Duration::from_secs(10));
        assert!(options.get_max_concurrency() >= MIN_DEFAULT_CONCURRENCY);

        let pinned = RuntimeOptions {
            max_concurrency: Some(2),
            ..Default::default()
        };
        assert_eq!(pinned.get_max_concurrency(), 2);
    }

    #[test]
    fn test_deploy_reads_as_single_key_map() {
        let yaml = r#"
name: p_deploy
elements:
  - name: pe_0
    deploy: { local: { class_name: increment } }
  - name: pe_1
    deploy:
      remote:
        service_filter: "name=detector"
"#;
        let definition: GraphDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            definition.elements[0].deploy,
            Deploy::Local {
                class_name: "increment".to_string(),
                module: None,
            }
        );
        assert_eq!(
            definition.elements[1].deploy,
            Deploy::Remote {
                service_filter: "name=detector".to_string(),
            }
        );

        let written = serde_yaml::to_string(&definition).unwrap();
        assert!(written.contains("local:"));
        let reread: GraphDefinition = serde_yaml::from_str(&written).unwrap();
        assert_eq!(reread.elements[0].class_name(), Some("increment"));
    }

    #[test]
    fn test_increment_demo_loads_from_yaml() {
        let definition = load_definition("demos/pipeline_increment.yaml").unwrap();
        assert_eq!(definition.elements[0].class_name(), Some("increment"));
        assert_eq!(definition.elements[1].class_name(), Some("increment"));
    }

    #[test]
    fn test_load_json_definition() {
        let json = r#"{
            "name": "p_json",
            "elements": [
                { "name": "pe_0", "input": ["a"], "output": ["b"],
                  "deploy": { "local": { "class_name": "increment" } } }
            ]
        }"#;
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let definition = load_and_validate_definition(file.path()).unwrap();
        assert_eq!(definition.name, "p_json");
        assert_eq!(definition.elements[0].output_names(), vec!["b"]);
    }

    #[test]
    fn test_load_toml_definition() {
        let toml_text = r#"
name = "p_toml"

[runtime]
grace_time_secs = 5

[[elements]]
name = "pe_0"
input = ["a"]
output = ["b"]

[elements.deploy.local]
class_name = "increment"
"#;
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(toml_text.as_bytes()).unwrap();

        let definition = load_definition(file.path()).unwrap();
        assert_eq!(definition.runtime.get_grace_time(), Duration::from_secs(5));
        assert_eq!(definition.elements[0].class_name(), Some("increment"));
    }

    #[test]
    fn test_load_and_validate_rejects_cycles() {
        let yaml = r#"
name: p_cycle
elements:
  - name: a
    depends_on: [b]
    deploy: { local: { class_name: increment } }
  - name: b
    depends_on: [a]
    deploy: { local: { class_name: increment } }
"#;
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let error = load_and_validate_definition(file.path()).unwrap_err();
        assert!(error.to_string().contains("Cyclic dependency detected"));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let error = load_definition("/nonexistent/definition.yaml").unwrap_err();
        assert!(matches!(error, PipelineError::DefinitionLoad { .. }));
        assert!(error.to_string().contains("/nonexistent/definition.yaml"));
    }
}
