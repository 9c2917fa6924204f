// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-stream response sink.
//!
//! Terminal frame outcomes are pushed into an unbounded channel so delivery
//! never blocks the router. The receiving half can be shared between readers,
//! waits with a timeout, and keeps anything that arrived after a caller gave
//! up available through [`ResponseReceiver::drain`].

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use crate::config::consts::DIAGNOSTIC_KEY;
use crate::engine::metrics::FrameMetrics;
use crate::engine::FrameId;
use crate::errors::PipelineError;
use crate::traits::{StreamEvent, Swag};

/// Terminal outcome of one frame.
#[derive(Debug, Clone)]
pub struct FrameResponse {
    pub stream_id: String,
    pub frame_id: FrameId,
    pub graph_path: String,
    /// `Okay` for delivered swag, `Error` for a diagnostic
    pub event: StreamEvent,
    pub swag: Swag,
    pub metrics: FrameMetrics,
}

impl FrameResponse {
    pub fn is_okay(&self) -> bool {
        self.event == StreamEvent::Okay
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.swag.get(DIAGNOSTIC_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.swag.get(field)
    }
}

/// Sending half handed to a stream at creation.
#[derive(Debug, Clone)]
pub struct ResponseSink {
    sender: UnboundedSender<FrameResponse>,
}

impl ResponseSink {
    /// Returns false when every receiver has been dropped.
    pub fn deliver(&self, response: FrameResponse) -> bool {
        self.sender.send(response).is_ok()
    }
}

/// Receiving half, cloneable so several readers can share one sink.
#[derive(Debug, Clone)]
pub struct ResponseReceiver {
    receiver: Arc<Mutex<UnboundedReceiver<FrameResponse>>>,
}

pub fn response_channel() -> (ResponseSink, ResponseReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        ResponseSink { sender },
        ResponseReceiver {
            receiver: Arc::new(Mutex::new(receiver)),
        },
    )
}

impl ResponseReceiver {
    /// Wait for the next response.
    ///
    /// Returns `None` once every sink is dropped and the channel is empty.
    pub async fn recv(&self) -> Option<FrameResponse> {
        self.receiver.lock().await.recv().await
    }

    /// Wait at most `timeout` for the next response.
    ///
    /// An elapsed window is a [`PipelineError::ResponseTimeout`], distinct
    /// from a delivered ERROR response. A closed channel is reported the
    /// same way because no response can arrive any more.
    pub async fn recv_timeout(&self, timeout: Duration) -> Result<FrameResponse, PipelineError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) | Err(_) => Err(PipelineError::ResponseTimeout(timeout)),
        }
    }

    /// Take every response currently queued without waiting.
    pub async fn drain(&self) -> Vec<FrameResponse> {
        let mut receiver = self.receiver.lock().await;
        let mut drained = Vec::new();
        while let Ok(response) = receiver.try_recv() {
            drained.push(response);
        }
        drained
    }
}
