use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Frames buffered per run before the transport applies backpressure.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// One frame of the run's event stream. Wire format is newline-delimited
/// JSON, one frame per line, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Status { message: String },
    Trace { trace: TraceFrame },
    Content { text: String },
    Error { message: String },
    Done,
}

/// Structured intermediate data attached to a `trace` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub step: String,
    pub data: serde_json::Value,
}

impl StreamEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    pub fn trace(step: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Trace {
            trace: TraceFrame {
                step: step.into(),
                data,
            },
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize as one NDJSON line, trailing newline included.
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| {
            "{\"type\":\"error\",\"message\":\"unserializable frame\"}".to_string()
        });
        line.push('\n');
        line
    }
}

/// Bounded frame channel for one run: the pipeline writes typed frames, a
/// transport adapter drains the receiver and serializes them.
pub fn channel() -> (EventSink, mpsc::Receiver<StreamEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (EventSink { tx }, rx)
}

/// Sending half of a run's frame channel. A dropped receiver does not abort
/// the run; frames to a closed channel are discarded.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    pub async fn emit(&self, event: StreamEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("event receiver dropped, discarding frame");
        }
    }
}
