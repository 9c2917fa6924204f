// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // element implementations
pub mod config;     // definitions, validation, registry
pub mod engine;     // pipelines, streams, frames
pub mod errors;     // error handling
pub mod observability;
pub mod traits;     // element contract
