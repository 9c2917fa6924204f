// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod dependency_graph;
mod element_map;
mod graph_path;
mod loader;
mod registry;
mod validation;

pub mod consts;

pub use dependency_graph::DependencyGraph;
pub use element_map::ElementMap;
pub use graph_path::GraphPath;
pub use loader::{
    load_and_validate_definition, load_definition, Deploy, ElementDefinition, FieldDefinition,
    GraphDefinition, Parameters, RuntimeOptions, ToolDescriptor,
};
pub use registry::{ElementConstructor, ElementRegistry};
pub use validation::{unproducible_inputs, validate_definition};
