// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Errors that can occur during pipeline definition validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A circular dependency was detected in the element graph
    CyclicDependency {
        /// The cycle path showing the circular dependency
        cycle: Vec<String>,
    },
    /// An element references a dependency that doesn't exist
    UnresolvedDependency {
        /// The element that has the unresolved dependency
        element: String,
        /// The dependency that couldn't be resolved
        missing_dependency: String,
    },
    /// Two elements share the same name
    DuplicateElementName {
        /// The duplicate element name
        element: String,
    },
    /// The definition's default graph path names an element that doesn't exist
    UnknownGraphPath {
        /// The graph path head
        graph_path: String,
    },
    /// The definition contains no elements
    EmptyDefinition,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CyclicDependency { cycle } => {
                write!(f, "Cyclic dependency detected: {}", cycle.join(" -> "))
            }
            ValidationError::UnresolvedDependency {
                element,
                missing_dependency,
            } => {
                write!(
                    f,
                    "Element '{}' depends on '{}' which does not exist",
                    element, missing_dependency
                )
            }
            ValidationError::DuplicateElementName { element } => {
                write!(f, "Duplicate element name: '{}'", element)
            }
            ValidationError::UnknownGraphPath { graph_path } => {
                write!(
                    f,
                    "Default graph path '{}' does not name an element",
                    graph_path
                )
            }
            ValidationError::EmptyDefinition => write!(f, "Pipeline definition has no elements"),
        }
    }
}

impl std::error::Error for ValidationError {}
