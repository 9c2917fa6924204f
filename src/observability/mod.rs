// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and
//! operational logging in streamwood. Message types follow a struct-based
//! pattern with a `Display` implementation so that log text lives in one place
//! and every event carries the same structured fields wherever it is emitted.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - Pipeline, stream and frame lifecycle events
//! * `messages::element` - Element invocation and stream hook events
//! * `messages::validation` - Definition validation warnings and errors
//!
//! # Usage
//!
//! ```rust
//! use streamwood::observability::messages::element::ElementReportedError;
//! use streamwood::observability::messages::StructuredLog;
//!
//! ElementReportedError {
//!     element: "pe_0",
//!     stream_id: "7",
//!     frame_id: 3,
//!     diagnostic: "Input 'a' is not a number",
//! }
//! .log();
//! ```

pub mod messages;
