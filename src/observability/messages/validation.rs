// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration validation warnings and errors.
//!
//! This module contains message types for logging events related to:
//! * Dependency graph validation
//! * Cyclic dependency detection
//! * Unresolved dependency detection
//! * Duplicate element name detection
//! * Inputs that must arrive as frame data

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Cyclic dependency detected in configuration.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use streamwood::observability::messages::validation::CyclicDependencyDetected;
///
/// let cycle: Vec<String> = ["pe_1", "pe_2", "pe_3", "pe_1"]
///     .iter()
///     .map(|s| s.to_string())
///     .collect();
/// let msg = CyclicDependencyDetected {
///     cycle: &cycle,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct CyclicDependencyDetected<'a> {
    pub cycle: &'a [String],
}

impl Display for CyclicDependencyDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cyclic dependency detected: {}", self.cycle.join(" -> "))
    }
}

impl StructuredLog for CyclicDependencyDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = %self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            cycle = %self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
        )
    }
}

/// An element depends on an element that is not declared.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use streamwood::observability::messages::validation::UnresolvedDependency;
///
/// let msg = UnresolvedDependency {
///     element: "pe_1",
///     missing_dependency: "pe_missing",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct UnresolvedDependency<'a> {
    pub element: &'a str,
    pub missing_dependency: &'a str,
}

impl Display for UnresolvedDependency<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Element '{}' depends on missing element '{}'",
            self.element, self.missing_dependency
        )
    }
}

impl StructuredLog for UnresolvedDependency<'_> {
    fn log(&self) {
        tracing::error!(
            element = self.element,
            missing_dependency = self.missing_dependency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            element = self.element,
            missing_dependency = self.missing_dependency,
        )
    }
}

/// # Log Level
/// `error!` - Failure requiring attention
pub struct DuplicateElementName<'a> {
    pub element: &'a str,
}

impl Display for DuplicateElementName<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Duplicate element name: '{}'", self.element)
    }
}

impl StructuredLog for DuplicateElementName<'_> {
    fn log(&self) {
        tracing::error!(element = self.element, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            element = self.element,
        )
    }
}

/// An input that no upstream element produces.
///
/// Every frame whose graph path reaches the element has to carry the field
/// as frame data, otherwise it is rejected at admission.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
///
/// # Example
/// ```
/// use streamwood::observability::messages::validation::UnproducibleInput;
///
/// let msg = UnproducibleInput {
///     element: "pe_aggregate",
///     input: "text_b",
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct UnproducibleInput<'a> {
    pub element: &'a str,
    pub input: &'a str,
}

impl Display for UnproducibleInput<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Input '{}' of element '{}' is not produced upstream and must be supplied as frame data",
            self.input, self.element
        )
    }
}

impl StructuredLog for UnproducibleInput<'_> {
    fn log(&self) {
        tracing::warn!(
            element = self.element,
            input = self.input,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::WARN,
            "span_name",
            name = name,
            element = self.element,
            input = self.input,
        )
    }
}

/// Definition validation started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ValidationStarted<'a> {
    pub definition: &'a str,
    pub element_count: usize,
}

impl Display for ValidationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Validating definition '{}' with {} elements",
            self.definition, self.element_count
        )
    }
}

impl StructuredLog for ValidationStarted<'_> {
    fn log(&self) {
        tracing::info!(
            definition = self.definition,
            element_count = self.element_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            definition = self.definition,
            element_count = self.element_count,
        )
    }
}

/// Definition validation completed successfully.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use streamwood::observability::messages::validation::ValidationCompleted;
///
/// let msg = ValidationCompleted {
///     definition: "p_demo",
///     element_count: 5,
///     warning_count: 1,
/// };
///
/// assert!(msg.to_string().contains("1 warnings"));
/// ```
pub struct ValidationCompleted<'a> {
    pub definition: &'a str,
    pub element_count: usize,
    pub warning_count: usize,
}

impl Display for ValidationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.warning_count > 0 {
            write!(
                f,
                "Validation of '{}' completed for {} elements with {} warnings",
                self.definition, self.element_count, self.warning_count
            )
        } else {
            write!(
                f,
                "Validation of '{}' completed successfully for {} elements",
                self.definition, self.element_count
            )
        }
    }
}

impl StructuredLog for ValidationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            definition = self.definition,
            element_count = self.element_count,
            warning_count = self.warning_count,
            has_warnings = self.warning_count > 0,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            definition = self.definition,
            element_count = self.element_count,
            warning_count = self.warning_count,
        )
    }
}

/// Definition validation failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ValidationFailed<'a> {
    pub definition: &'a str,
    pub error_count: usize,
}

impl Display for ValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Validation of '{}' failed with {} errors",
            self.definition, self.error_count
        )
    }
}

impl StructuredLog for ValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            definition = self.definition,
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            definition = self.definition,
            error_count = self.error_count,
        )
    }
}
