//! Progress events for streamed generations.
//!
//! `StreamEvent` is what a UI observer receives while a reply is being
//! generated: fragments for progressive display, then either `done` or
//! `error`. Events are informational only; the turn log is the source of truth.

use nextstep_core::FailureKind;
use nextstep_core::provider::Usage;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted while a reply streams in.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Partial text from the model.
    Fragment { content: String },

    /// The reply was committed to the log.
    Done {
        conversation_id: String,
        usage: Option<Usage>,
    },

    /// Generation failed; nothing was committed.
    Error { message: String, kind: FailureKind },
}

impl StreamEvent {
    /// SSE-style event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Fragment { .. } => "fragment",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// Where progress events go. A closed receiver is not an error.
pub type EventSink = UnboundedSender<StreamEvent>;

pub(crate) fn emit(observer: Option<&EventSink>, event: StreamEvent) {
    if let Some(sink) = observer {
        let _ = sink.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_fragment() {
        let event = StreamEvent::Fragment {
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"fragment""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn event_serialization_error_kind() {
        let event = StreamEvent::Error {
            message: "quota".into(),
            kind: FailureKind::Quota,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""kind":"quota""#));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            StreamEvent::Fragment {
                content: "x".into()
            }
            .event_type(),
            "fragment"
        );
        assert_eq!(
            StreamEvent::Done {
                conversation_id: "x".into(),
                usage: None
            }
            .event_type(),
            "done"
        );
        assert_eq!(
            StreamEvent::Error {
                message: "x".into(),
                kind: FailureKind::Transport
            }
            .event_type(),
            "error"
        );
    }

    #[test]
    fn emit_tolerates_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        emit(
            Some(&tx),
            StreamEvent::Fragment {
                content: "lost".into(),
            },
        );
        emit(None, StreamEvent::Fragment { content: "x".into() });
    }
}
