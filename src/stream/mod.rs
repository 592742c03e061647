//! Streamed runs: ordered run events delivered over a bounded channel.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agent::Agent;
use crate::context::RunId;
use crate::error::RociError;
use crate::runner::RunResult;
use crate::types::{InputItem, RunItem, TextStreamDelta};

/// Semantic role of a generated item in the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunItemEventName {
    MessageOutputCreated,
    ToolCalled,
    ToolOutput,
    HandoffRequested,
    HandoffOccurred,
    ReasoningItemCreated,
}

impl RunItemEventName {
    pub fn for_item(item: &RunItem) -> Self {
        match item {
            RunItem::MessageOutput { .. } => Self::MessageOutputCreated,
            RunItem::ToolCall { .. } => Self::ToolCalled,
            RunItem::ToolCallOutput { .. } => Self::ToolOutput,
            RunItem::HandoffCall { .. } => Self::HandoffRequested,
            RunItem::HandoffOutput { .. } => Self::HandoffOccurred,
            RunItem::Reasoning { .. } => Self::ReasoningItemCreated,
        }
    }
}

/// Payload of a run event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// One raw event of the in-flight model call.
    RawResponse {
        data: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        delta: Option<TextStreamDelta>,
    },
    /// An item was added to the run.
    RunItem {
        name: RunItemEventName,
        item: RunItem,
    },
    /// The current agent changed (or the run started with it).
    AgentUpdated { agent: String },
}

/// Envelope for streaming run events.
#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    pub run_id: RunId,
    /// Strictly increasing within a run, starting at 1.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event: StreamEvent,
}

pub(crate) type EventSender = mpsc::Sender<Result<RunEvent, RociError>>;

/// Producer side of a streamed run, owned by the control task.
pub(crate) struct EventEmitter {
    run_id: RunId,
    seq: u64,
    tx: EventSender,
    cancel: CancellationToken,
}

impl EventEmitter {
    pub(crate) fn new(run_id: RunId, tx: EventSender, cancel: CancellationToken) -> Self {
        Self {
            run_id,
            seq: 0,
            tx,
            cancel,
        }
    }

    /// Send one event, waiting for channel capacity. A gone consumer cancels
    /// the run.
    pub(crate) async fn emit(&mut self, event: StreamEvent) -> Result<(), RociError> {
        if self.cancel.is_cancelled() {
            return Err(RociError::Canceled);
        }
        self.seq += 1;
        let envelope = RunEvent {
            run_id: self.run_id,
            seq: self.seq,
            timestamp: Utc::now(),
            event,
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RociError::Canceled),
            sent = self.tx.send(Ok(envelope)) => sent.map_err(|_| {
                warn!(run_id = %self.run_id, "stream consumer dropped, canceling run");
                self.cancel.cancel();
                RociError::Canceled
            }),
        }
    }

    /// Deliver the error that ended the run.
    pub(crate) async fn fail(&self, err: RociError) {
        if self.tx.send(Err(err)).await.is_err() {
            warn!(run_id = %self.run_id, "stream consumer dropped before run error was delivered");
        }
    }
}

/// Progress of a streamed run visible to the consumer.
#[derive(Debug)]
pub(crate) struct StreamProgress {
    pub current_agent: Arc<Agent>,
    pub input: Vec<InputItem>,
    pub new_items: Vec<RunItem>,
    pub result: Option<RunResult>,
    pub complete: bool,
}

pub(crate) type SharedProgress = Arc<Mutex<StreamProgress>>;

pub(crate) fn lock(progress: &SharedProgress) -> std::sync::MutexGuard<'_, StreamProgress> {
    progress.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A run in progress, returned by
/// [`Runner::run_streamed`](crate::runner::Runner::run_streamed).
///
/// Events are consumed once through [`RunResultStreaming::stream_events`].
/// An `Err` item is the last one and carries the error that ended the run.
#[derive(Debug)]
pub struct RunResultStreaming {
    run_id: RunId,
    events: ReceiverStream<Result<RunEvent, RociError>>,
    progress: SharedProgress,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RunResultStreaming {
    pub(crate) fn new(
        run_id: RunId,
        rx: mpsc::Receiver<Result<RunEvent, RociError>>,
        progress: SharedProgress,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            run_id,
            events: ReceiverStream::new(rx),
            progress,
            cancel,
            task: Some(task),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The live event stream, in production order.
    pub fn stream_events(&mut self) -> impl Stream<Item = Result<RunEvent, RociError>> + '_ {
        &mut self.events
    }

    pub fn current_agent(&self) -> Arc<Agent> {
        Arc::clone(&lock(&self.progress).current_agent)
    }

    /// Whether the run has finished, successfully or not.
    pub fn is_complete(&self) -> bool {
        lock(&self.progress).complete
    }

    /// Stop the run. No further model calls are made and undelivered events
    /// are dropped.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        let rx = self.events.as_mut();
        rx.close();
        while rx.try_recv().is_ok() {}
    }

    /// Final output once the run completed successfully.
    pub fn final_output(&self) -> Option<serde_json::Value> {
        lock(&self.progress)
            .result
            .as_ref()
            .map(|r| r.final_output.clone())
    }

    /// Completed result, if the run finished successfully.
    pub fn result(&self) -> Option<RunResult> {
        lock(&self.progress).result.clone()
    }

    /// Input plus the items generated so far.
    pub fn to_input_list(&self) -> Vec<InputItem> {
        let progress = lock(&self.progress);
        progress
            .input
            .iter()
            .cloned()
            .chain(progress.new_items.iter().map(RunItem::to_input_item))
            .collect()
    }

    /// Wait for the control task to exit.
    ///
    /// Drain or cancel the stream first; the task blocks while the event
    /// channel is full.
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(run_id = %self.run_id, error = %err, "streamed run task failed");
            }
        }
    }
}

impl Drop for RunResultStreaming {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
