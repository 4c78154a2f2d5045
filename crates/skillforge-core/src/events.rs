//! Event emission: stamping, middleware, and sinks.
//!
//! Stages hand raw `(agent, stage, message, payload)` tuples to an
//! [`Emitter`]. The sink stamps each one with a sequence number and a
//! non-decreasing timestamp, runs it through the [`MiddlewareChain`]
//! left to right, and delivers it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::{stage, Event, EventKind, RawEvent, TraceId};
use crate::metrics::METRICS;

/// A pure event transform.
pub trait EventMiddleware: Send + Sync {
    fn apply(&self, event: Event) -> Event;
}

impl<F> EventMiddleware for F
where
    F: Fn(Event) -> Event + Send + Sync,
{
    fn apply(&self, event: Event) -> Event {
        self(event)
    }
}

/// Normalizes the stage (trimmed, lowercase, `info` when blank) and derives
/// the kind when none is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinMiddleware;

impl EventMiddleware for BuiltinMiddleware {
    fn apply(&self, mut event: Event) -> Event {
        let normalized = event.stage.trim().to_lowercase();
        event.stage = if normalized.is_empty() {
            "info".to_string()
        } else {
            normalized
        };
        if event.kind.is_none() {
            event.kind = Some(EventKind::for_stage(&event.stage));
        }
        event
    }
}

/// Marks `done`-stage events terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalMiddleware;

impl EventMiddleware for TerminalMiddleware {
    fn apply(&self, mut event: Event) -> Event {
        if event.stage == stage::DONE {
            event.terminal = Some(true);
        }
        event
    }
}

/// Ordered middleware list, applied left to right.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stages: Vec<Arc<dyn EventMiddleware>>,
}

impl MiddlewareChain {
    /// Empty chain; events pass through unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// `[BuiltinMiddleware, TerminalMiddleware]`.
    pub fn standard() -> Self {
        Self::new().with(BuiltinMiddleware).with(TerminalMiddleware)
    }

    pub fn with(mut self, middleware: impl EventMiddleware + 'static) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn apply(&self, event: Event) -> Event {
        self.stages.iter().fold(event, |event, m| m.apply(event))
    }
}

/// Assigns sequence numbers and non-decreasing timestamps, then applies the
/// middleware chain.
struct Stamper {
    chain: MiddlewareChain,
    next_seq: AtomicU64,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl Stamper {
    fn new(chain: MiddlewareChain) -> Self {
        Self {
            chain,
            next_seq: AtomicU64::new(0),
            last: Mutex::new(None),
        }
    }

    fn stamp(&self, raw: RawEvent) -> Event {
        let timestamp = {
            let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
            let now = Utc::now();
            let ts = match *last {
                Some(prev) if prev > now => prev,
                _ => now,
            };
            *last = Some(ts);
            ts
        };
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        METRICS.inc_events_emitted();
        self.chain.apply(Event::from_raw(raw, seq, timestamp))
    }
}

/// Destination for run events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: RawEvent);

    /// True once nobody is listening any more.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Item carried by the run channel.
#[derive(Debug)]
pub(crate) enum Envelope {
    Event(Event),
    End,
}

/// Sink backed by a bounded channel. `emit` waits while the channel is full.
pub(crate) struct ChannelSink {
    tx: mpsc::Sender<Envelope>,
    stamper: Stamper,
}

impl ChannelSink {
    pub(crate) fn new(tx: mpsc::Sender<Envelope>, chain: MiddlewareChain) -> Self {
        Self {
            tx,
            stamper: Stamper::new(chain),
        }
    }

    /// Deliver the end-of-stream marker.
    pub(crate) async fn finish(&self) {
        if self.tx.send(Envelope::End).await.is_err() {
            debug!("stream consumer gone before end marker");
        }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: RawEvent) {
        let event = self.stamper.stamp(event);
        if self.tx.send(Envelope::Event(event)).await.is_err() {
            debug!("stream consumer gone; event dropped");
        }
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// In-memory sink that keeps every event.
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
    stamper: Stamper,
}

impl RecordingSink {
    /// Records through the standard middleware chain.
    pub fn new() -> Self {
        Self::with_chain(MiddlewareChain::standard())
    }

    pub fn with_chain(chain: MiddlewareChain) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            stamper: Stamper::new(chain),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: RawEvent) {
        let event = self.stamper.stamp(event);
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event);
    }
}

/// A sink bound to one run's trace id. Stages emit through this.
#[derive(Clone)]
pub struct Emitter<'a> {
    sink: &'a dyn EventSink,
    trace_id: TraceId,
}

impl<'a> Emitter<'a> {
    pub fn new(sink: &'a dyn EventSink, trace_id: TraceId) -> Self {
        Self { sink, trace_id }
    }

    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// The consumer has gone away; the run should stop doing work.
    pub fn is_cancelled(&self) -> bool {
        self.sink.is_closed()
    }

    pub async fn emit(&self, agent: &str, stage: &str, message: impl Into<String>, payload: Value) {
        self.sink
            .emit(RawEvent {
                trace_id: self.trace_id.clone(),
                agent: agent.to_string(),
                stage: stage.to_string(),
                message: message.into(),
                payload: RawEvent::payload_from(payload),
            })
            .await;
    }

    /// Shorthand emitter for a single agent.
    pub fn agent(&self, agent: &'static str) -> AgentEmitter<'_, 'a> {
        AgentEmitter {
            emitter: self,
            agent,
        }
    }
}

/// [`Emitter`] with the agent name filled in.
pub struct AgentEmitter<'e, 'a> {
    emitter: &'e Emitter<'a>,
    agent: &'static str,
}

impl AgentEmitter<'_, '_> {
    pub async fn plan(&self, message: impl Into<String>) {
        self.emitter
            .emit(self.agent, stage::PLAN, message, Value::Null)
            .await;
    }

    pub async fn action(&self, message: impl Into<String>) {
        self.emitter
            .emit(self.agent, stage::ACTION, message, Value::Null)
            .await;
    }

    pub async fn action_with(&self, message: impl Into<String>, payload: Value) {
        self.emitter
            .emit(self.agent, stage::ACTION, message, payload)
            .await;
    }

    pub async fn observe(&self, message: impl Into<String>, payload: Value) {
        self.emitter
            .emit(self.agent, stage::OBSERVATION, message, payload)
            .await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.emitter
            .emit(self.agent, stage::ERROR, message, Value::Null)
            .await;
    }
}
