// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stream/frame execution engine.
//!
//! * [`Pipeline`] - element instances, stream table and event loop
//! * [`Stream`] - per-stream frame ids, variables and lifecycle
//! * [`Frame`] - swag, metrics and state of one unit of work
//! * [`ParameterResolver`] - stream, element, pipeline and default scopes
//! * [`BranchSet`] - rejoin barrier for dynamic fan-out
//! * [`RequestAdapter`] - one-shot request/response over a private stream

mod branches;
mod context;
mod frame;
mod invoke;
mod metrics;
mod parameters;
mod pipeline;
mod response;
mod router;
mod scheduler;
mod stream;


pub use branches::{BranchObservation, BranchSet};
pub use context::ElementContext;
pub use frame::{Frame, FrameId, FrameState};
pub use invoke::RequestAdapter;
pub use metrics::{process_memory, ElementSample, FrameMetrics};
pub use parameters::{
    value_as_bool, value_as_f64, value_as_i64, value_as_list, value_as_string,
    ParameterResolver, ParameterScope,
};
pub use pipeline::Pipeline;
pub use response::{response_channel, FrameResponse, ResponseReceiver, ResponseSink};
pub use scheduler::GeneratorOptions;
pub use stream::{Stream, StreamOptions, StreamPhase, StreamVariables};
