// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Element implementations.
//!
//! # Local Backend
//! The built-in element library, resolved by class name through
//! [`LocalElementFactory`](local::LocalElementFactory):
//! - **Arithmetic**: `add`, `increment`, `sum`
//! - **Text**: `text_in`, `text`, `text_out`
//! - **Branching**: `select`, `option`, `aggregate`
//! - **Observers**: `inspect`, `metrics`
//! - **Sources and codecs**: `random_integers`, `data_encode`, `data_decode`
//!
//! Remote deployments are described by definitions but not yet executable;
//! building a pipeline that contains one fails with `BackendNotImplemented`.
//!
//! # Stub Backend (Test-Only)
//! Elements that record their hooks, fail, panic, stall or stop, for engine
//! tests. Not available in production builds.
//!
//! # Example
//! ```rust
//! use streamwood::backends::local::LocalElementFactory;
//! use streamwood::config::Parameters;
//! use streamwood::traits::ElementInit;
//!
//! let init = ElementInit {
//!     name: "pe_0".to_string(),
//!     class_name: "increment".to_string(),
//!     protocol: None,
//!     inputs: vec!["a".to_string()],
//!     outputs: vec!["b".to_string()],
//!     parameters: Parameters::new(),
//! };
//!
//! let element = LocalElementFactory::create_element(&init)?;
//! assert_eq!(element.name(), "increment");
//! # Ok::<(), streamwood::errors::ElementMapError>(())
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
