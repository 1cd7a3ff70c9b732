//! Relay session → SSE response.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_core::Stream;

use iw_domain::stream::RelayEvent;
use iw_providers::RelayHandle;

/// Wire text of one relay event.
///
/// Fragments are JSON so embedded newlines survive SSE framing; error
/// text is flattened to one line because SSE data cannot hold `\r`.
pub fn frame_data(event: &RelayEvent) -> String {
    match event {
        RelayEvent::Fragment(fragment) => {
            serde_json::json!({ "content": fragment.content }).to_string()
        }
        RelayEvent::Done => "[DONE]".to_string(),
        RelayEvent::Error { message } => {
            format!("[ERROR] {}", message.replace(['\r', '\n'], " "))
        }
    }
}

/// Drains the handle until its terminal event. Dropping the response
/// drops the handle, which the relay pump sees as a disconnect.
pub fn relay_sse(mut handle: RelayHandle) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        while let Some(event) = handle.recv().await {
            let terminal = event.is_terminal();
            yield Ok(Event::default().data(frame_data(&event)));
            if terminal {
                break;
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}
