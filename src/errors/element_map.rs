// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for element map creation and element instantiation.

use thiserror::Error;

/// Errors that can occur while turning element definitions into running elements
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementMapError {
    /// The element is deployed remotely; only local bindings are supported
    #[error("Element '{element}' is deployed remotely ({service_filter}). Remote elements are not yet supported.")]
    BackendNotImplemented {
        element: String,
        service_filter: String,
    },

    /// No constructor is registered under the element's class name
    #[error("Unknown element implementation '{class_name}' for element '{element}'")]
    UnknownImplementation { element: String, class_name: String },

    /// The constructor rejected the element definition
    #[error("Failed to create element '{element}' ({class_name}): {reason}")]
    ElementCreationFailed {
        element: String,
        class_name: String,
        reason: String,
    },
}
