//! Agent service: one orchestrator run exposed as a live event stream.
//!
//! [`AgentService::stream`] spawns the run as its own task. The task only
//! pushes events, followed by an end marker, into a bounded channel; the
//! returned [`EventStream`] yields events until that marker. The last event
//! is always a `done`-stage event carrying the run's [`AgentOutput`], even
//! when the run panics. Dropping the stream aborts the task at its next
//! suspension point, so an abandoned run emits nothing further and never
//! persists.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{FutureExt, Stream};
use serde_json::{json, Map};
use skillforge_store::SkillStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ForgeConfig;
use crate::domain::{stage, AgentOutput, Event, RawEvent, SourceSet, TraceId};
use crate::events::{ChannelSink, Envelope, EventSink, MiddlewareChain};
use crate::obs;
use crate::orchestrator::Orchestrator;
use crate::tooling::ToolFacade;

const DEFAULT_BUFFER: usize = 64;

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs orchestrations and streams their events.
#[derive(Clone)]
pub struct AgentService {
    orchestrator: Orchestrator,
    tools: Arc<dyn ToolFacade>,
    buffer: usize,
}

impl AgentService {
    pub fn new(orchestrator: Orchestrator, tools: Arc<dyn ToolFacade>) -> Self {
        Self {
            orchestrator,
            tools,
            buffer: DEFAULT_BUFFER,
        }
    }

    pub fn from_config(
        config: &ForgeConfig,
        tools: Arc<dyn ToolFacade>,
        store: Arc<dyn SkillStore>,
    ) -> Self {
        Self::new(Orchestrator::from_config(config, store), tools).with_buffer(config.stream_buffer)
    }

    /// Channel capacity; at least 1.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Start a run and return its event stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn stream(
        &self,
        task: impl Into<String>,
        sources: SourceSet,
        middlewares: MiddlewareChain,
        max_rounds: u32,
    ) -> EventStream {
        let (tx, rx) = mpsc::channel(self.buffer);
        let orchestrator = self.orchestrator.clone().with_max_rounds(max_rounds);
        let tools = self.tools.clone();
        let task = task.into();
        let trace_id = TraceId::new();

        let handle = tokio::spawn(async move {
            let sink = ChannelSink::new(tx, middlewares);
            let run = orchestrator.run_with_trace(
                trace_id.clone(),
                &task,
                &sources,
                tools.as_ref(),
                &sink,
            );
            let output = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(output) => output,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    obs::emit_run_aborted(trace_id.as_str(), &reason);
                    AgentOutput::fail(
                        trace_id.as_str(),
                        Map::new(),
                        vec![format!("Workflow aborted: {reason}")],
                    )
                }
            };

            let mut payload = Map::new();
            payload.insert("result".into(), json!(output));
            sink.emit(RawEvent {
                trace_id,
                agent: Orchestrator::NAME.to_string(),
                stage: stage::DONE.to_string(),
                message: format!("Workflow completed: {}", output.status),
                payload,
            })
            .await;
            sink.finish().await;
        });

        EventStream {
            rx,
            task: handle,
            finished: false,
        }
    }
}

/// Single-pass stream of one run's events.
///
/// Ends after the run's end marker. Dropping it cancels the run.
pub struct EventStream {
    rx: mpsc::Receiver<Envelope>,
    task: JoinHandle<()>,
    finished: bool,
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(Envelope::Event(event))) => Poll::Ready(Some(event)),
            Poll::Ready(Some(Envelope::End)) | Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
