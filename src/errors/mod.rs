// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod element_map;
mod pipeline;

pub use config::ValidationError;
pub use element_map::ElementMapError;
pub use pipeline::PipelineError;
