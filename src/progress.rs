//! # Progress Channel Module
//!
//! One request, one stream. Progress notifications and exactly one terminal
//! event (`research` or `error`) travel over a single ordered queue that the
//! HTTP layer drains into newline-delimited JSON.
//!
//! There are two handles onto the queue:
//! - [`ProgressChannel`] is owned by the orchestrator. It is the only handle
//!   that can emit the terminal event, and dropping it closes the stream.
//! - [`ProgressEmitter`] is the write-only handle given to strategies. It
//!   holds a weak sender, so a strategy can never keep the stream open past
//!   the terminal event.
//!
//! The queue is unbounded: `emit` never waits on the caller reading.

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tracing::{debug, warn};

use crate::artifact::ResearchArtifact;

/// Error message used when a channel is dropped without a terminal event.
pub const UNTERMINATED_MESSAGE: &str = "research ended without producing a result";

// =============================================================================
// EVENTS
// =============================================================================
/// Stage of a research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Searching,
    Downloading,
    Processing,
    Analyzing,
    Complete,
}

/// `current` of `total` work items done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCount {
    pub current: u32,
    pub total: u32,
}

/// A progress notification. Ephemeral: forwarded immediately, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressCount>,
}

impl ProgressEvent {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, current: u32, total: u32) -> Self {
        self.progress = Some(ProgressCount { current, total });
        self
    }
}

/// One line of the response body.
///
/// Externally tagged, so the wire form is `{"status": {...}}`,
/// `{"research": {...}}` or `{"error": "..."}`. Clients tell the kinds apart
/// by the top-level key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEvent {
    Status(ProgressEvent),
    Research(ResearchArtifact),
    Error(String),
}

impl StreamEvent {
    /// `research` and `error` end a request; `status` does not.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Status(_))
    }

    /// Encode as one newline-terminated JSON line.
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode stream event");
            serde_json::json!({ "error": format!("failed to encode event: {e}") }).to_string()
        });
        line.push('\n');
        line
    }
}

// =============================================================================
// PROGRESS CHANNEL
// =============================================================================
/// The orchestrator's handle onto one request's stream.
///
/// The terminal event is emitted by consuming the channel ([`complete`] or
/// [`fail`]), so it can only happen once. If the channel is dropped on any
/// other path, including a panicking strategy, `Drop` emits an `error` event
/// before the stream closes.
///
/// [`complete`]: ProgressChannel::complete
/// [`fail`]: ProgressChannel::fail
pub struct ProgressChannel {
    tx: Option<UnboundedSender<StreamEvent>>,
}

impl ProgressChannel {
    /// Open a channel and the receiving end the transport drains.
    pub fn open() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, EventReceiver { rx })
    }

    /// Append a progress event to the stream.
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            send(tx, StreamEvent::Status(event));
        }
    }

    /// A write-only progress handle for a strategy.
    pub fn emitter(&self) -> ProgressEmitter {
        ProgressEmitter {
            tx: self.tx.as_ref().map(UnboundedSender::downgrade),
        }
    }

    /// Whether the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, UnboundedSender::is_closed)
    }

    /// Emit the `research` event, then a `complete` status, then close.
    pub fn complete(mut self, artifact: ResearchArtifact) {
        if let Some(tx) = self.tx.take() {
            send(&tx, StreamEvent::Research(artifact));
            send(
                &tx,
                StreamEvent::Status(ProgressEvent::new(Stage::Complete, "Research complete")),
            );
        }
    }

    /// Emit the `error` event, then close.
    pub fn fail(mut self, message: impl Into<String>) {
        if let Some(tx) = self.tx.take() {
            send(&tx, StreamEvent::Error(non_empty_message(message.into())));
        }
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            warn!("Progress channel dropped without a terminal event");
            send(&tx, StreamEvent::Error(UNTERMINATED_MESSAGE.to_string()));
        }
    }
}

fn send(tx: &UnboundedSender<StreamEvent>, event: StreamEvent) {
    debug!(event = ?event_kind(&event), "Emitting stream event");
    // A closed receiver means the caller disconnected; the run continues.
    let _ = tx.send(event);
}

fn event_kind(event: &StreamEvent) -> &'static str {
    match event {
        StreamEvent::Status(_) => "status",
        StreamEvent::Research(_) => "research",
        StreamEvent::Error(_) => "error",
    }
}

fn non_empty_message(message: String) -> String {
    if message.trim().is_empty() {
        "research failed".to_string()
    } else {
        message
    }
}

// =============================================================================
// PROGRESS EMITTER
// =============================================================================
/// Write-only progress sink handed to a strategy at construction.
///
/// Events emitted after the channel has closed are discarded.
#[derive(Clone, Default)]
pub struct ProgressEmitter {
    tx: Option<WeakUnboundedSender<StreamEvent>>,
}

impl ProgressEmitter {
    /// An emitter that discards everything.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = self.tx.as_ref().and_then(WeakUnboundedSender::upgrade) {
            send(&tx, StreamEvent::Status(event));
        }
    }

    /// True once the stream is closed or the caller stopped reading.
    ///
    /// Strategies may treat this as a cooperative stop point.
    pub fn is_closed(&self) -> bool {
        match self.tx.as_ref().and_then(WeakUnboundedSender::upgrade) {
            Some(tx) => tx.is_closed(),
            None => true,
        }
    }
}

// =============================================================================
// RECEIVER
// =============================================================================
/// Receiving end of a request's stream.
pub struct EventReceiver {
    rx: UnboundedReceiver<StreamEvent>,
}

impl EventReceiver {
    /// Next event, or `None` once the channel is closed and drained.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drain every remaining event.
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }

    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> + Send + 'static {
        stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }
}
