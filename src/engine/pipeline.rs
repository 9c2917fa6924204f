// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline instance: element map, stream table and event loop.
//!
//! A [`Pipeline`] is built once from a validated definition and owns
//! everything needed to run streams through it. There is no global state;
//! several pipelines can run side by side in one process.
//!
//! ## Event loop
//!
//! Explicit admissions, element-created frames and generator ticks all land
//! in one unbounded work queue. The loop takes work items off the queue and
//! spawns one task per frame; a semaphore sized by `max_concurrency` bounds
//! how many frames are routed at once. The same loop sweeps for streams idle
//! past their grace time.
//!
//! ## Stream expiry
//!
//! An idle stream with no frames in flight is destroyed by the sweep. An idle
//! stream that still has frames in flight is flushed: generation stops and
//! external admission is refused, frames its own elements create are still
//! accepted, and the stream is destroyed when the last frame finishes.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::consts::DIAGNOSTIC_KEY;
use crate::config::{
    unproducible_inputs, validate_definition, DependencyGraph, ElementMap, ElementRegistry,
    GraphDefinition, GraphPath, Parameters, RuntimeOptions, ToolDescriptor,
};
use crate::engine::context::ElementContext;
use crate::engine::frame::{Frame, FrameId};
use crate::engine::metrics::process_memory;
use crate::engine::parameters::ParameterResolver;
use crate::engine::response::{FrameResponse, ResponseSink};
use crate::engine::router::route_frame;
use crate::engine::scheduler::spawn_generator;
use crate::engine::stream::{ExpiryCheck, FrameOrigin, Stream, StreamOptions};
use crate::errors::{PipelineError, ValidationError};
use crate::observability::messages::element::{ElementPanicked, StreamHookFailed};
use crate::observability::messages::engine::{
    FrameAdmitted, PipelineCreated, PipelineTerminated, StreamCreated, StreamDestroyed,
    StreamExpiring,
};
use crate::observability::messages::validation::UnproducibleInput;
use crate::observability::messages::StructuredLog;
use crate::traits::{StreamEvent, Swag};

/// Result of making sure an element has started for a stream.
pub(crate) enum StartOutcome {
    /// Started now with OKAY, or earlier
    Ready,
    /// `start_stream` returned STOP
    Stopped,
    /// `start_stream` returned ERROR with this diagnostic
    Failed(String),
    /// The stream was destroyed before or while the hook ran
    Destroyed,
}

pub(crate) struct WorkItem {
    stream: Arc<Stream>,
    frame: Frame,
}

/// State shared by the pipeline handle, the event loop, frame tasks and
/// generators.
pub(crate) struct PipelineShared {
    pub(crate) name: String,
    pub(crate) definition: Arc<GraphDefinition>,
    pub(crate) elements: ElementMap,
    pub(crate) resolver: ParameterResolver,
    pub(crate) paths: HashMap<String, GraphPath>,
    pub(crate) runtime: RuntimeOptions,
    pub(crate) start_memory: Option<u64>,
    default_graph_path: String,
    streams: Mutex<HashMap<String, Arc<Stream>>>,
    work_tx: UnboundedSender<WorkItem>,
    shutdown: CancellationToken,
}

impl PipelineShared {
    fn streams(&self) -> MutexGuard<'_, HashMap<String, Arc<Stream>>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, stream_id: &str) -> Option<Arc<Stream>> {
        self.streams().get(stream_id).cloned()
    }

    /// Admit a frame into `stream` and queue it for routing.
    ///
    /// The graph path defaults to the stream's own. Required inputs of the
    /// path are checked here so a frame that could never be routed is
    /// rejected synchronously instead of failing later.
    pub(crate) fn admit(
        &self,
        stream: &Arc<Stream>,
        frame_data: Swag,
        graph_path: Option<&str>,
        origin: FrameOrigin,
    ) -> Result<FrameId, PipelineError> {
        if self.shutdown.is_cancelled() {
            return Err(PipelineError::PipelineTerminated(self.name.clone()));
        }

        let head = graph_path.unwrap_or(stream.graph_path());
        let path = self
            .paths
            .get(head)
            .ok_or_else(|| PipelineError::UnknownGraphPath(head.to_string()))?;

        let missing = path.missing_inputs(frame_data.keys());
        if !missing.is_empty() {
            return Err(PipelineError::MissingInputs {
                stream_id: stream.id().to_string(),
                graph_path: head.to_string(),
                missing,
            });
        }

        let frame_id = stream
            .admit_frame(origin)
            .ok_or_else(|| PipelineError::UnknownStream(stream.id().to_string()))?;

        FrameAdmitted {
            stream_id: stream.id(),
            frame_id,
            graph_path: head,
        }
        .log();

        let item = WorkItem {
            stream: stream.clone(),
            frame: Frame::new(frame_id, head, frame_data),
        };
        if self.work_tx.send(item).is_err() {
            stream.forget_frame(frame_id);
            return Err(PipelineError::PipelineTerminated(self.name.clone()));
        }
        Ok(frame_id)
    }

    /// Remove `stream` from the table (if it is still the live entry for its
    /// id) and tear it down.
    pub(crate) async fn destroy(self: &Arc<Self>, stream: &Arc<Stream>, reason: &str) {
        {
            let mut streams = self.streams();
            if streams
                .get(stream.id())
                .is_some_and(|live| Arc::ptr_eq(live, stream))
            {
                streams.remove(stream.id());
            }
        }
        self.teardown(stream, reason).await;
    }

    /// Run `start_stream` for `element_name` unless it already ran for
    /// this stream.
    ///
    /// Hooks run one at a time per stream, whether reached by stream
    /// creation or by the first frame to arrive at the element. An element
    /// whose hook finishes after the stream was torn down is stopped here.
    pub(crate) async fn start_element(
        self: &Arc<Self>,
        stream: &Arc<Stream>,
        element_name: &str,
    ) -> StartOutcome {
        if stream.has_started(element_name) {
            return StartOutcome::Ready;
        }
        let _gate = stream.start_gate().await;
        if stream.has_started(element_name) {
            return StartOutcome::Ready;
        }
        if stream.is_cancelled() {
            return StartOutcome::Destroyed;
        }
        let Some(element) = self.elements.get(element_name) else {
            return StartOutcome::Ready;
        };

        let response = {
            let context = ElementContext::new(self, stream, element_name, None);
            element.start_stream(&context).await
        };

        if !stream.mark_started(element_name) {
            self.stop_element(stream, element_name).await;
            return StartOutcome::Destroyed;
        }

        match response.event {
            StreamEvent::Okay => StartOutcome::Ready,
            StreamEvent::Stop => StartOutcome::Stopped,
            StreamEvent::Error => {
                let diagnostic = response
                    .diagnostic()
                    .unwrap_or("start_stream failed")
                    .to_string();
                StreamHookFailed {
                    element: element_name,
                    stream_id: stream.id(),
                    hook: "start_stream",
                    diagnostic: &diagnostic,
                }
                .log();
                StartOutcome::Failed(diagnostic)
            }
        }
    }

    async fn stop_element(self: &Arc<Self>, stream: &Arc<Stream>, element_name: &str) {
        let Some(element) = self.elements.get(element_name) else {
            return;
        };
        let context = ElementContext::new(self, stream, element_name, None);
        let response = element.stop_stream(&context).await;
        if response.event == StreamEvent::Error {
            StreamHookFailed {
                element: element_name,
                stream_id: stream.id(),
                hook: "stop_stream",
                diagnostic: response.diagnostic().unwrap_or("stop_stream failed"),
            }
            .log();
        }
    }

    /// Cancel the stream's work and run every outstanding `stop_stream`.
    ///
    /// Elements already inside `process_frame` are not interrupted; their
    /// frames are discarded by the router once the element returns.
    async fn teardown(self: &Arc<Self>, stream: &Arc<Stream>, reason: &str) {
        if !stream.mark_destroyed() {
            return;
        }

        for element_name in stream.take_started() {
            self.stop_element(stream, &element_name).await;
        }

        StreamDestroyed {
            stream_id: stream.id(),
            reason,
            frames_created: stream.frames_created(),
        }
        .log();
    }

    async fn sweep_expired(self: &Arc<Self>) {
        let now = Instant::now();
        let streams: Vec<Arc<Stream>> = self.streams().values().cloned().collect();

        for stream in streams {
            match stream.check_expiry(now) {
                ExpiryCheck::NotDue => {}
                ExpiryCheck::DestroyNow => self.destroy(&stream, "expired").await,
                ExpiryCheck::Flushing {
                    idle,
                    frames_in_flight,
                } => StreamExpiring {
                    stream_id: stream.id(),
                    idle,
                    frames_in_flight,
                }
                .log(),
            }
        }
    }

    /// Route one frame on its own task so a panicking element fails only
    /// that frame.
    async fn execute(self: Arc<Self>, item: WorkItem, semaphore: Arc<Semaphore>) {
        let WorkItem { stream, frame } = item;
        let Ok(permit) = semaphore.acquire_owned().await else {
            stream.finish_frame(frame.frame_id);
            return;
        };

        let frame_id = frame.frame_id;
        let graph_path = frame.graph_path.clone();
        let routed = tokio::spawn(route_frame(self.clone(), stream.clone(), frame)).await;

        if let Err(join_error) = routed {
            let reason = if join_error.is_panic() {
                panic_reason(join_error.into_panic())
            } else {
                "frame task cancelled".to_string()
            };
            ElementPanicked {
                stream_id: stream.id(),
                frame_id,
                reason: &reason,
            }
            .log();

            stream.sink().deliver(FrameResponse {
                stream_id: stream.id().to_string(),
                frame_id,
                graph_path,
                event: StreamEvent::Error,
                swag: Swag::from([(
                    DIAGNOSTIC_KEY.to_string(),
                    Value::String(format!("Frame processing panicked: {}", reason)),
                )]),
                metrics: Default::default(),
            });
        }
        drop(permit);

        if stream.finish_frame(frame_id) {
            self.destroy(&stream, "expired").await;
        }
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn run_event_loop(shared: Arc<PipelineShared>, mut work_rx: UnboundedReceiver<WorkItem>) {
    let semaphore = Arc::new(Semaphore::new(shared.runtime.get_max_concurrency()));
    let mut sweep = interval(shared.runtime.get_expiry_check());
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            _ = sweep.tick() => shared.sweep_expired().await,
            item = work_rx.recv() => match item {
                Some(item) => {
                    tokio::spawn(shared.clone().execute(item, semaphore.clone()));
                }
                None => break,
            },
        }
    }

    semaphore.close();
}

/// A running graph built from one definition.
///
/// # Example
/// ```no_run
/// use serde_json::json;
/// use std::time::Duration;
/// use streamwood::config::{load_definition, Parameters};
/// use streamwood::engine::{response_channel, Pipeline, StreamOptions};
/// use streamwood::traits::Swag;
///
/// # async fn demo() -> Result<(), streamwood::errors::PipelineError> {
/// let definition = load_definition("demos/pipeline_increment.yaml")?;
/// let pipeline = Pipeline::new(definition, Parameters::new())?;
/// pipeline.start();
///
/// let (sink, responses) = response_channel();
/// pipeline.create_stream("1", StreamOptions::new(), sink).await?;
/// pipeline.create_frame("1", Swag::from([("a".to_string(), json!(0))]), None)?;
///
/// let response = responses.recv_timeout(Duration::from_secs(1)).await?;
/// assert_eq!(response.get("c"), Some(&json!(2)));
///
/// pipeline.destroy_stream("1").await;
/// pipeline.terminate().await;
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    shared: Arc<PipelineShared>,
    work_rx: Mutex<Option<UnboundedReceiver<WorkItem>>>,
    event_loop: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Pipeline {
    /// Build a pipeline with the built-in element library.
    pub fn new(definition: GraphDefinition, parameters: Parameters) -> Result<Self, PipelineError> {
        Self::with_registry(definition, parameters, &ElementRegistry::new())
    }

    /// Build a pipeline, resolving element bindings through `registry`.
    ///
    /// `parameters` form the pipeline scope together with the definition's
    /// own `parameters`, and win over them on conflict.
    pub fn with_registry(
        definition: GraphDefinition,
        parameters: Parameters,
        registry: &ElementRegistry,
    ) -> Result<Self, PipelineError> {
        validate_definition(&definition).map_err(PipelineError::Validation)?;

        let resolver = ParameterResolver::new(&definition, &parameters);
        let elements =
            ElementMap::from_definition(&definition, registry, resolver.pipeline_parameters())?;

        let graph = DependencyGraph::from_definition(&definition);
        for (element, input) in unproducible_inputs(&definition, &graph) {
            UnproducibleInput {
                element: &element,
                input: &input,
            }
            .log();
        }

        let paths: HashMap<String, GraphPath> = definition
            .element_names()
            .filter_map(|head| {
                GraphPath::resolve(&definition, &graph, head).map(|path| (head.to_string(), path))
            })
            .collect();

        let default_graph_path = definition
            .default_graph_path()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Validation(vec![ValidationError::EmptyDefinition]))?;

        let runtime = definition.runtime.clone();
        PipelineCreated {
            pipeline: &definition.name,
            element_count: elements.len(),
            max_concurrency: runtime.get_max_concurrency(),
        }
        .log();

        let (work_tx, work_rx) = mpsc::unbounded_channel();
        let shared = PipelineShared {
            name: definition.name.clone(),
            definition: Arc::new(definition),
            elements,
            resolver,
            paths,
            runtime,
            start_memory: process_memory(),
            default_graph_path,
            streams: Mutex::new(HashMap::new()),
            work_tx,
            shutdown: CancellationToken::new(),
        };

        Ok(Self {
            shared: Arc::new(shared),
            work_rx: Mutex::new(Some(work_rx)),
            event_loop: tokio::sync::Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn definition(&self) -> &GraphDefinition {
        &self.shared.definition
    }

    pub fn default_graph_path(&self) -> &str {
        &self.shared.default_graph_path
    }

    pub fn graph_path(&self, head: &str) -> Option<&GraphPath> {
        self.shared.paths.get(head)
    }

    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.shared.definition.tools()
    }

    /// Spawn the event loop on the current Tokio runtime.
    ///
    /// Idempotent. Frames admitted before `start` wait in the work queue.
    pub fn start(&self) {
        let work_rx = self
            .work_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(work_rx) = work_rx else {
            return;
        };

        let handle = tokio::spawn(run_event_loop(self.shared.clone(), work_rx));
        match self.event_loop.try_lock() {
            Ok(mut event_loop) => *event_loop = Some(handle),
            Err(_) => tracing::warn!(pipeline = %self.shared.name, "Event loop handle is busy"),
        }
    }

    /// Start if needed and run until [`terminate`](Self::terminate) is called.
    pub async fn run(&self) {
        self.start();
        if !self.join_event_loop().await {
            self.shared.shutdown.cancelled().await;
        }
    }

    /// Wait for the event loop task, logging a panic or cancellation.
    /// Returns false when another caller already holds the handle.
    async fn join_event_loop(&self) -> bool {
        let handle = self.event_loop.lock().await.take();
        let Some(handle) = handle else {
            return false;
        };
        if let Err(error) = handle.await {
            tracing::error!(pipeline = %self.shared.name, error = %error, "Event loop failed");
        }
        true
    }

    /// Stop the event loop and destroy every live stream.
    pub async fn terminate(&self) {
        self.shared.shutdown.cancel();

        let streams: Vec<Arc<Stream>> = self.shared.streams().drain().map(|(_, s)| s).collect();
        let destroyed_streams = streams.len();
        for stream in &streams {
            self.shared.teardown(stream, "terminated").await;
        }

        self.join_event_loop().await;

        PipelineTerminated {
            pipeline: &self.shared.name,
            destroyed_streams,
        }
        .log();
    }

    /// Admit a new stream and run `start_stream` for every element on its
    /// graph path, in path order. Elements off that path start when the
    /// first frame reaches them.
    ///
    /// If any hook returns ERROR the elements already started are stopped,
    /// the stream is removed, and `StreamStartFailed` is returned. A STOP
    /// from a hook only cancels generation registered by that element. A
    /// stream destroyed before its hooks finish yields `UnknownStream`, with
    /// every element that did start stopped again.
    pub async fn create_stream(
        &self,
        stream_id: impl Into<String>,
        options: StreamOptions,
        sink: ResponseSink,
    ) -> Result<(), PipelineError> {
        let shared = &self.shared;
        if shared.shutdown.is_cancelled() {
            return Err(PipelineError::PipelineTerminated(shared.name.clone()));
        }

        let stream_id = stream_id.into();
        let graph_path = options
            .graph_path
            .unwrap_or_else(|| shared.default_graph_path.clone());
        let path = shared
            .paths
            .get(&graph_path)
            .ok_or_else(|| PipelineError::UnknownGraphPath(graph_path.clone()))?;

        let stream = Arc::new(Stream::new(
            stream_id.clone(),
            graph_path.clone(),
            options.parameters,
            options
                .grace_time
                .unwrap_or_else(|| shared.runtime.get_grace_time()),
            options.initial_frame_id,
            sink,
            shared.shutdown.child_token(),
        ));

        {
            let mut streams = shared.streams();
            if streams.contains_key(&stream_id) {
                return Err(PipelineError::DuplicateStream(stream_id));
            }
            streams.insert(stream_id.clone(), stream.clone());
        }

        StreamCreated {
            pipeline: &shared.name,
            stream_id: &stream_id,
            graph_path: &graph_path,
            grace_time: stream.grace_time(),
        }
        .log();

        let mut stopped = Vec::new();
        for element_name in &path.elements {
            match shared.start_element(&stream, element_name).await {
                StartOutcome::Ready => {}
                StartOutcome::Stopped => stopped.push(element_name.clone()),
                StartOutcome::Failed(diagnostic) => {
                    shared.destroy(&stream, "start_failed").await;
                    return Err(PipelineError::StreamStartFailed {
                        stream_id,
                        element: element_name.clone(),
                        diagnostic,
                    });
                }
                StartOutcome::Destroyed => return Err(PipelineError::UnknownStream(stream_id)),
            }
        }

        let Some(generators) = stream.finish_starting() else {
            return Err(PipelineError::UnknownStream(stream_id));
        };
        for (element, generator) in generators {
            if !stopped.contains(&element) {
                spawn_generator(shared.clone(), stream.clone(), element, generator);
            }
        }
        Ok(())
    }

    /// Admit one frame into a live stream.
    pub fn create_frame(
        &self,
        stream_id: &str,
        frame_data: Swag,
        graph_path: Option<&str>,
    ) -> Result<FrameId, PipelineError> {
        let stream = self
            .shared
            .lookup(stream_id)
            .ok_or_else(|| PipelineError::UnknownStream(stream_id.to_string()))?;
        self.shared
            .admit(&stream, frame_data, graph_path, FrameOrigin::External)
    }

    /// Destroy a stream, running its `stop_stream` hooks.
    ///
    /// Returns false, and changes nothing, when no stream with this id is
    /// live. Destroying twice is therefore harmless.
    pub async fn destroy_stream(&self, stream_id: &str) -> bool {
        let removed = self.shared.streams().remove(stream_id);
        let Some(stream) = removed else {
            return false;
        };
        self.shared.teardown(&stream, "requested").await;
        true
    }

    pub fn stream(&self, stream_id: &str) -> Option<Arc<Stream>> {
        self.shared.lookup(stream_id)
    }

    pub fn stream_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.shared.streams().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}
