use std::pin::Pin;

use serde::Serialize;

use crate::error::Error;

/// A boxed async stream, used for provider streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Raw events read off an outbound provider stream, before any
/// interpretation of the payload.
#[derive(Debug)]
pub enum ProviderEvent {
    /// One server-sent-event `data:` payload.
    Data(String),
    /// The provider closed the body.
    Closed,
    /// The connection failed, timed out, or answered with a non-success
    /// status. Always the last event of the stream.
    Failed(Error),
}

/// One incremental unit of model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamFragment {
    pub content: String,
}

/// What a relay session delivers downstream.
///
/// Zero or more `Fragment`s are followed by exactly one terminal event
/// (`Done` or `Error`); nothing follows a terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Fragment(StreamFragment),
    Done,
    Error { message: String },
}

impl RelayEvent {
    pub fn fragment(text: impl Into<String>) -> Self {
        RelayEvent::Fragment(StreamFragment { content: text.into() })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayEvent::Done | RelayEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(!RelayEvent::fragment("a").is_terminal());
        assert!(RelayEvent::Done.is_terminal());
        assert!(RelayEvent::Error { message: "x".into() }.is_terminal());
    }

    #[test]
    fn fragment_envelope_keeps_newlines_inside_one_string() {
        let frag = StreamFragment { content: "line one\nline two".into() };
        let json = serde_json::to_string(&frag).unwrap();
        assert_eq!(json, r#"{"content":"line one\nline two"}"#);
        assert!(!json.contains('\n'));
    }
}
