// Progress reporting module
//
// Stages report what they do through a ProgressReporter, which logs every
// event with tracing and forwards it to an EventSink. The sink is either a
// plain Vec (tests, synchronous callers) or the bounded channel feeding the
// consumer of a spawned job.

use crate::metrics::Metrics;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Category of a [`ProgressEvent`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A pipeline stage has started
    Step,
    /// A sub-action inside a stage
    Action,
    Success,
    /// Non-fatal problem; does not change the job outcome
    Warning,
    /// Error report that precedes a terminal failure, or a non-fatal
    /// per-item error inside a best-effort stage
    Error,
    /// Terminal: the job produced an output archive
    Done,
    /// Terminal: the job failed
    Failed,
}

impl EventKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Step => "step",
            Self::Action => "action",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One entry in a job's progress stream.
///
/// A job yields a finite sequence of non-terminal events followed by exactly
/// one terminal event ([`EventKind::Done`] or [`EventKind::Failed`]).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub kind: EventKind,
    pub text: String,
    /// Structured record carried by terminal events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ProgressEvent {
    pub fn new(kind: EventKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            payload: None,
        }
    }

    /// Terminal success event referencing the output archive
    pub fn done(output_name: &str) -> Self {
        Self {
            kind: EventKind::Done,
            text: format!("Created {}", output_name),
            payload: Some(json!({
                "url": format!("/download/{}", output_name),
                "filename": output_name,
            })),
        }
    }

    /// Terminal failure event carrying the fatal message
    pub fn failed(message: &str) -> Self {
        Self {
            kind: EventKind::Failed,
            text: message.to_string(),
            payload: Some(json!({ "message": format!("FATAL ERROR: {}", message) })),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Human-readable line with the category marker
    pub fn to_line(&self) -> String {
        match self.kind {
            EventKind::Step => format!("[STEP] {}", self.text),
            EventKind::Action => format!("  -> {}", self.text),
            EventKind::Success => format!("     ✅ SUCCESS: {}", self.text),
            EventKind::Warning => format!("     ⚠️ WARNING: {}", self.text),
            EventKind::Error => format!("     ❌ ERROR: {}", self.text),
            EventKind::Done | EventKind::Failed => self.payload_json(),
        }
    }

    /// Server-Sent-Events frame; terminal records carry an `event:` name
    pub fn to_sse(&self) -> String {
        match self.kind {
            EventKind::Done => format!("event: done\ndata: {}\n\n", self.payload_json()),
            EventKind::Failed => format!("event: error\ndata: {}\n\n", self.payload_json()),
            _ => format!("data: {}\n\n", self.to_line()),
        }
    }

    fn payload_json(&self) -> String {
        self.payload
            .as_ref()
            .map_or_else(|| self.text.clone(), serde_json::Value::to_string)
    }
}

/// Consumer of progress events, in production order
pub trait EventSink {
    fn emit(&mut self, event: ProgressEvent);
}

impl EventSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// Sink that forwards events into a bounded tokio channel.
///
/// `emit` blocks while the channel is full, so it must run on a blocking
/// thread (the orchestrator runs jobs under `spawn_blocking`). A consumer that
/// goes away does not stop the job; remaining events are dropped and counted.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressEvent>,
    metrics: Arc<Metrics>,
    disconnected: bool,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>, metrics: Arc<Metrics>) -> Self {
        Self {
            tx,
            metrics,
            disconnected: false,
        }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: ProgressEvent) {
        if self.disconnected {
            self.metrics.record_event_dropped();
            return;
        }
        match self.tx.blocking_send(event) {
            Ok(()) => self.metrics.record_event_emitted(),
            Err(_) => {
                tracing::debug!("Progress consumer disconnected; dropping remaining events");
                self.disconnected = true;
                self.metrics.record_event_dropped();
            }
        }
    }
}

/// Stage-facing helper: logs each event and forwards it to the sink.
///
/// Warnings and errors are remembered so the job report can list them.
pub struct ProgressReporter<'a> {
    sink: &'a mut dyn EventSink,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a mut dyn EventSink) -> Self {
        Self {
            sink,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn step(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(kind = "step", "{}", text);
        self.sink.emit(ProgressEvent::new(EventKind::Step, text));
    }

    pub fn action(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(kind = "action", "{}", text);
        self.sink.emit(ProgressEvent::new(EventKind::Action, text));
    }

    pub fn success(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(kind = "success", "{}", text);
        self.sink.emit(ProgressEvent::new(EventKind::Success, text));
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!(kind = "warning", "{}", text);
        self.warnings.push(text.clone());
        self.sink.emit(ProgressEvent::new(EventKind::Warning, text));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::error!(kind = "error", "{}", text);
        self.errors.push(text.clone());
        self.sink.emit(ProgressEvent::new(EventKind::Error, text));
    }

    /// Emit a terminal event; only the orchestrator calls this
    pub(crate) fn terminal(&mut self, event: ProgressEvent) {
        debug_assert!(event.is_terminal());
        self.sink.emit(event);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}
