// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stream: a named execution context for frames.
//!
//! A stream owns its frame id counter, the set of frames in flight, the
//! variables its elements share, and the tokens that stop its work. All
//! bookkeeping that admission, delivery and expiry have to agree on lives
//! behind one short critical section so those three never race; element
//! variables sit behind a separate async lock because elements hold it
//! across awaits.

use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::Parameters;
use crate::engine::branches::BranchSet;
use crate::engine::response::ResponseSink;
use crate::engine::scheduler::GeneratorOptions;
use crate::engine::FrameId;

/// Caller-supplied settings for a new stream.
///
/// # Example
/// ```
/// use streamwood::engine::StreamOptions;
/// use std::time::Duration;
///
/// let options = StreamOptions::new()
///     .graph_path("pe_text")
///     .parameter("pe_1_inc", 2)
///     .grace_time(Duration::from_secs(30));
/// assert_eq!(options.graph_path.as_deref(), Some("pe_text"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Head element for frames that don't choose one; `None` uses the definition default
    pub graph_path: Option<String>,
    /// Stream-scope parameter overrides
    pub parameters: Parameters,
    /// Idle expiry; `None` uses the pipeline's runtime option
    pub grace_time: Option<Duration>,
    pub initial_frame_id: FrameId,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph_path(mut self, graph_path: impl Into<String>) -> Self {
        self.graph_path = Some(graph_path.into());
        self
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn grace_time(mut self, grace_time: Duration) -> Self {
        self.grace_time = Some(grace_time);
        self
    }

    pub fn initial_frame_id(mut self, frame_id: FrameId) -> Self {
        self.initial_frame_id = frame_id;
        self
    }
}

/// Mutable state private to one stream, shared by its elements.
///
/// `values` hold plain data, `branches` hold rejoin barriers keyed by barrier
/// name, and `resources` hold per-stream handles (files, clients) that an
/// element opens in `start_stream` or lazily and releases in `stop_stream`.
#[derive(Default)]
pub struct StreamVariables {
    values: HashMap<String, Value>,
    branches: HashMap<String, BranchSet>,
    resources: HashMap<String, Box<dyn Any + Send>>,
}

impl StreamVariables {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Branch set for `barrier`, created empty on first use
    pub fn branches(&mut self, barrier: &str) -> &mut BranchSet {
        self.branches.entry(barrier.to_string()).or_default()
    }

    pub fn branch_set(&self, barrier: &str) -> Option<&BranchSet> {
        self.branches.get(barrier)
    }

    pub fn insert_resource<T: Any + Send>(&mut self, key: impl Into<String>, resource: T) {
        self.resources.insert(key.into(), Box::new(resource));
    }

    pub fn resource_mut<T: Any + Send>(&mut self, key: &str) -> Option<&mut T> {
        self.resources.get_mut(key)?.downcast_mut::<T>()
    }

    /// Remove a resource, returning it if it has type `T`
    pub fn take_resource<T: Any + Send>(&mut self, key: &str) -> Option<T> {
        let resource = self.resources.remove(key)?;
        resource.downcast::<T>().ok().map(|boxed| *boxed)
    }

    pub fn has_resource(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }
}

impl fmt::Debug for StreamVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamVariables")
            .field("values", &self.values)
            .field("branches", &self.branches)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Lifecycle phase of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// `start_stream` hooks are running
    Starting,
    Live,
    /// Past its grace time, flushing in-flight frames before teardown
    Expiring,
    Destroyed,
}

/// Who is asking to admit a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameOrigin {
    External,
    Element,
    Generator,
}

pub(crate) enum ExpiryCheck {
    NotDue,
    DestroyNow,
    Flushing { idle: Duration, frames_in_flight: usize },
}

struct StreamState {
    phase: StreamPhase,
    next_frame_id: FrameId,
    frames: BTreeSet<FrameId>,
    frames_created: u64,
    last_activity: Instant,
    started: Vec<String>,
    pending_generators: Vec<(String, GeneratorOptions)>,
}

pub struct Stream {
    id: String,
    graph_path: String,
    parameters: Parameters,
    grace_time: Duration,
    created: Instant,
    sink: ResponseSink,
    variables: tokio::sync::Mutex<StreamVariables>,
    state: Mutex<StreamState>,
    start_gate: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
    generation: CancellationToken,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("graph_path", &self.graph_path)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Stream {
    /// `cancel` is the stream's destruction token; generation stops with it.
    pub(crate) fn new(
        id: String,
        graph_path: String,
        parameters: Parameters,
        grace_time: Duration,
        initial_frame_id: FrameId,
        sink: ResponseSink,
        cancel: CancellationToken,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            graph_path,
            parameters,
            grace_time,
            created: now,
            sink,
            variables: tokio::sync::Mutex::new(StreamVariables::default()),
            state: Mutex::new(StreamState {
                phase: StreamPhase::Starting,
                next_frame_id: initial_frame_id,
                frames: BTreeSet::new(),
                frames_created: 0,
                last_activity: now,
                started: Vec::new(),
                pending_generators: Vec::new(),
            }),
            start_gate: tokio::sync::Mutex::new(()),
            generation: cancel.child_token(),
            cancel,
        }
    }

    fn state(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn graph_path(&self) -> &str {
        &self.graph_path
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn grace_time(&self) -> Duration {
        self.grace_time
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    pub fn phase(&self) -> StreamPhase {
        self.state().phase
    }

    pub fn last_activity(&self) -> Instant {
        self.state().last_activity
    }

    /// Ids of frames admitted but not yet delivered, failed or discarded
    pub fn frames_in_flight(&self) -> Vec<FrameId> {
        self.state().frames.iter().copied().collect()
    }

    /// Shared element variables, held under the stream's lock
    pub async fn variables(&self) -> tokio::sync::MutexGuard<'_, StreamVariables> {
        self.variables.lock().await
    }

    pub(crate) fn sink(&self) -> &ResponseSink {
        &self.sink
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn generation_token(&self) -> CancellationToken {
        self.generation.clone()
    }

    pub(crate) fn touch(&self) {
        self.state().last_activity = Instant::now();
    }

    /// Id the next admitted frame will receive
    pub(crate) fn peek_frame_id(&self) -> FrameId {
        self.state().next_frame_id
    }

    /// Allocate the next frame id, or `None` if the stream no longer accepts
    /// frames from `origin`.
    ///
    /// An expiring stream still accepts frames created by its own elements so
    /// fan-outs already underway can finish.
    pub(crate) fn admit_frame(&self, origin: FrameOrigin) -> Option<FrameId> {
        let mut state = self.state();
        let accepted = match state.phase {
            StreamPhase::Starting | StreamPhase::Live => true,
            StreamPhase::Expiring => origin == FrameOrigin::Element,
            StreamPhase::Destroyed => false,
        };
        if !accepted {
            return None;
        }

        let frame_id = state.next_frame_id;
        state.next_frame_id += 1;
        state.frames.insert(frame_id);
        state.frames_created += 1;
        state.last_activity = Instant::now();
        Some(frame_id)
    }

    /// Undo an admission whose frame never reached the work queue
    pub(crate) fn forget_frame(&self, frame_id: FrameId) {
        self.state().frames.remove(&frame_id);
    }

    /// Mark a frame finished. Returns true when an expiring stream has
    /// flushed its last frame and should now be destroyed.
    pub(crate) fn finish_frame(&self, frame_id: FrameId) -> bool {
        let mut state = self.state();
        state.frames.remove(&frame_id);
        state.last_activity = Instant::now();
        state.phase == StreamPhase::Expiring && state.frames.is_empty()
    }

    pub(crate) fn check_expiry(&self, now: Instant) -> ExpiryCheck {
        let mut state = self.state();
        if state.phase != StreamPhase::Live {
            return ExpiryCheck::NotDue;
        }
        let idle = now.saturating_duration_since(state.last_activity);
        if idle < self.grace_time {
            return ExpiryCheck::NotDue;
        }
        if state.frames.is_empty() {
            return ExpiryCheck::DestroyNow;
        }

        state.phase = StreamPhase::Expiring;
        self.generation.cancel();
        ExpiryCheck::Flushing {
            idle,
            frames_in_flight: state.frames.len(),
        }
    }

    /// Transition to `Destroyed`. Only the first caller gets `true`.
    pub(crate) fn mark_destroyed(&self) -> bool {
        let mut state = self.state();
        if state.phase == StreamPhase::Destroyed {
            return false;
        }
        state.phase = StreamPhase::Destroyed;
        state.pending_generators.clear();
        drop(state);
        self.cancel.cancel();
        true
    }

    pub(crate) fn frames_created(&self) -> u64 {
        self.state().frames_created
    }

    /// Serializes `start_stream` hooks so each element starts at most once
    /// per stream.
    pub(crate) async fn start_gate(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.start_gate.lock().await
    }

    pub(crate) fn has_started(&self, element: &str) -> bool {
        self.state().started.iter().any(|started| started == element)
    }

    /// Record that `element`'s `start_stream` ran. Returns false when the
    /// stream was destroyed meanwhile; teardown has then already run without
    /// this element and the caller must stop it.
    pub(crate) fn mark_started(&self, element: &str) -> bool {
        let mut state = self.state();
        if state.phase == StreamPhase::Destroyed {
            return false;
        }
        state.started.push(element.to_string());
        true
    }

    /// Elements whose `start_stream` ran, most recent first
    pub(crate) fn take_started(&self) -> Vec<String> {
        let mut started = std::mem::take(&mut self.state().started);
        started.reverse();
        started
    }

    /// Hold a generator registered during `start_stream` until every
    /// element on the path has started. Returns false once the stream is
    /// past its start phase.
    pub(crate) fn defer_generator(&self, element: &str, options: GeneratorOptions) -> bool {
        let mut state = self.state();
        if state.phase != StreamPhase::Starting {
            return false;
        }
        state.pending_generators.push((element.to_string(), options));
        true
    }

    /// Leave the start phase, returning the generators waiting on it, or
    /// `None` if the stream was destroyed while starting.
    pub(crate) fn finish_starting(&self) -> Option<Vec<(String, GeneratorOptions)>> {
        let mut state = self.state();
        match state.phase {
            StreamPhase::Destroyed => None,
            StreamPhase::Starting => {
                state.phase = StreamPhase::Live;
                Some(std::mem::take(&mut state.pending_generators))
            }
            StreamPhase::Live | StreamPhase::Expiring => {
                Some(std::mem::take(&mut state.pending_generators))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::response::response_channel;
    use serde_json::json;

    fn stream(grace_time: Duration, initial_frame_id: FrameId) -> Stream {
        let (sink, _receiver) = response_channel();
        Stream::new(
            "s".to_string(),
            "pe_0".to_string(),
            Parameters::new(),
            grace_time,
            initial_frame_id,
            sink,
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_frame_ids_are_monotonic_from_initial_id() {
        let stream = stream(Duration::from_secs(60), 5);
        let ids: Vec<_> = (0..3)
            .filter_map(|_| stream.admit_frame(FrameOrigin::External))
            .collect();
        assert_eq!(ids, vec![5, 6, 7]);
        assert_eq!(stream.peek_frame_id(), 8);
        assert_eq!(stream.frames_in_flight(), vec![5, 6, 7]);
    }

    #[test]
    fn test_destroyed_stream_refuses_frames_and_cancels() {
        let stream = stream(Duration::from_secs(60), 0);
        assert!(stream.mark_destroyed());
        assert!(!stream.mark_destroyed());
        assert!(stream.is_cancelled());
        assert!(stream.generation_token().is_cancelled());
        assert_eq!(stream.admit_frame(FrameOrigin::Element), None);
    }

    #[test]
    fn test_idle_stream_without_frames_expires_immediately() {
        let stream = stream(Duration::ZERO, 0);
        stream.finish_starting();
        assert!(matches!(
            stream.check_expiry(Instant::now()),
            ExpiryCheck::DestroyNow
        ));
    }

    #[test]
    fn test_expiring_stream_flushes_element_frames_only() {
        let stream = stream(Duration::ZERO, 0);
        stream.finish_starting();
        let frame_id = stream.admit_frame(FrameOrigin::External).unwrap();

        assert!(matches!(
            stream.check_expiry(Instant::now()),
            ExpiryCheck::Flushing {
                frames_in_flight: 1,
                ..
            }
        ));
        assert_eq!(stream.phase(), StreamPhase::Expiring);
        assert!(stream.generation_token().is_cancelled());
        assert!(!stream.is_cancelled());

        assert_eq!(stream.admit_frame(FrameOrigin::External), None);
        assert_eq!(stream.admit_frame(FrameOrigin::Generator), None);
        let branch = stream.admit_frame(FrameOrigin::Element).unwrap();

        assert!(!stream.finish_frame(frame_id));
        assert!(stream.finish_frame(branch));
    }

    #[test]
    fn test_stream_within_grace_time_is_not_due() {
        let stream = stream(Duration::from_secs(60), 0);
        stream.finish_starting();
        assert!(matches!(
            stream.check_expiry(Instant::now()),
            ExpiryCheck::NotDue
        ));
    }

    #[test]
    fn test_generators_are_deferred_until_started() {
        let stream = stream(Duration::from_secs(60), 0);
        let options = GeneratorOptions::new(2.0);
        assert!(stream.defer_generator("pe_source", options.clone()));

        let pending = stream.finish_starting().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, "pe_source");
        assert!(!stream.defer_generator("pe_source", options));
    }

    #[test]
    fn test_started_elements_stop_in_reverse_order() {
        let stream = stream(Duration::from_secs(60), 0);
        assert!(stream.mark_started("pe_0"));
        assert!(stream.mark_started("pe_1"));
        assert!(stream.has_started("pe_1"));
        assert_eq!(stream.take_started(), vec!["pe_1", "pe_0"]);
        assert!(stream.take_started().is_empty());
    }

    #[test]
    fn test_destroyed_while_starting_refuses_late_starts() {
        let stream = stream(Duration::from_secs(60), 0);
        assert!(stream.mark_started("pe_0"));
        assert!(stream.defer_generator("pe_0", GeneratorOptions::new(1.0)));

        assert!(stream.mark_destroyed());
        assert_eq!(stream.take_started(), vec!["pe_0"]);

        assert!(!stream.mark_started("pe_1"));
        assert!(!stream.has_started("pe_1"));
        assert_eq!(stream.finish_starting(), None);
    }

    #[test]
    fn test_variables_hold_values_and_resources() {
        let mut variables = StreamVariables::default();
        variables.set("count", json!(1));
        variables.insert_resource("handle", String::from("open"));

        assert_eq!(variables.get("count"), Some(&json!(1)));
        assert_eq!(
            variables.resource_mut::<String>("handle").map(|s| s.as_str()),
            Some("open")
        );
        assert_eq!(variables.take_resource::<u32>("handle"), None);
        assert!(!variables.has_resource("handle"));
    }
}
