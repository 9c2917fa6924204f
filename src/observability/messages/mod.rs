// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit that line at its fixed level together with the
//! message's fields, or to open a span carrying them.
//!
//! # Organization
//!
//! * `engine` - Pipeline, stream and frame lifecycle events
//! * `element` - Element invocation and stream hook events
//! * `validation` - Definition validation warnings and errors
//!
//! # Usage Pattern
//!
//! ```rust
//! use streamwood::observability::messages::engine::StreamCreated;
//! use streamwood::observability::messages::StructuredLog;
//! use std::time::Duration;
//!
//! let msg = StreamCreated {
//!     pipeline: "p_demo",
//!     stream_id: "1",
//!     graph_path: "pe_0",
//!     grace_time: Duration::from_secs(300),
//! };
//!
//! msg.log();
//! let _span = msg.span("create_stream").entered();
//! ```

use tracing::Span;

pub mod element;
pub mod engine;
pub mod validation;

/// A log message with a fixed level and structured fields.
pub trait StructuredLog {
    /// Emit the message at its level with its fields attached
    fn log(&self);

    /// Open a span at the message's level carrying the same fields
    fn span(&self, name: &str) -> Span;
}
