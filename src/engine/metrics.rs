// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-frame timing and memory samples.
//!
//! Sampling never fails a frame: when process memory can't be read the
//! memory part of a sample is simply omitted.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// One element invocation on one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSample {
    pub time: Duration,
    /// Resident memory delta in bytes across the invocation
    pub memory: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMetrics {
    pub elements: BTreeMap<String, ElementSample>,
    pub pipeline_time: Option<Duration>,
    pub pipeline_memory: Option<i64>,
    /// Resident memory when the pipeline was created
    pub pipeline_start_memory: Option<u64>,
}

impl FrameMetrics {
    pub fn record(&mut self, element: &str, sample: ElementSample) {
        self.elements.insert(element.to_string(), sample);
    }

    /// Aggregate element samples into pipeline totals; called at delivery.
    pub fn finalize(&mut self, pipeline_start_memory: Option<u64>) {
        self.pipeline_time = Some(self.elements.values().map(|sample| sample.time).sum());

        let memory: Vec<i64> = self
            .elements
            .values()
            .filter_map(|sample| sample.memory)
            .collect();
        self.pipeline_memory = if memory.is_empty() {
            None
        } else {
            Some(memory.iter().sum())
        };

        self.pipeline_start_memory = pipeline_start_memory;
    }
}

/// Measures a single element invocation
pub struct ElementTimer {
    started: Instant,
    start_memory: Option<u64>,
}

impl ElementTimer {
    pub fn start() -> Self {
        Self {
            start_memory: process_memory(),
            started: Instant::now(),
        }
    }

    pub fn finish(self) -> ElementSample {
        let time = self.started.elapsed();
        let memory = match (self.start_memory, process_memory()) {
            (Some(before), Some(after)) => Some(after as i64 - before as i64),
            _ => None,
        };
        ElementSample { time, memory }
    }
}

/// Resident set size of this process in bytes, if the platform exposes it
pub fn process_memory() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kilobytes| kilobytes.parse::<u64>().ok())
        .map(|kilobytes| kilobytes * 1024)
}
