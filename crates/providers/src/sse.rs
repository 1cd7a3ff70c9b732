//! Server-sent-event framing for provider streams.
//!
//! - [`drain_data_lines`] pulls complete `data:` payloads from a buffer
//! - [`sse_event_stream`] turns a streaming `reqwest::Response` into
//!   [`ProviderEvent`]s, bounding every chunk read by the read timeout

use std::time::Duration;

use iw_domain::error::Error;
use iw_domain::stream::{BoxStream, ProviderEvent};

/// Extract complete `data:` payloads from an SSE buffer.
///
/// Events are delimited by a blank line. Only `data:` lines are kept;
/// `event:`, `id:` and `retry:` are dropped. Consumed bytes are removed
/// and a trailing partial event stays in the buffer.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

/// Move the valid UTF-8 prefix of `pending` into `buffer`.
///
/// A multi-byte character split across two chunks stays in `pending`
/// until the rest arrives. Genuinely invalid bytes are replaced.
pub(crate) fn decode_into(pending: &mut Vec<u8>, buffer: &mut String) {
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => {
            buffer.push_str(&String::from_utf8_lossy(pending).replace("\r\n", "\n"));
            pending.clear();
            return;
        }
    };
    let text = String::from_utf8_lossy(&pending[..valid]).replace("\r\n", "\n");
    buffer.push_str(&text);
    pending.drain(..valid);
}

/// Build a [`BoxStream`] of provider events from a successful streaming
/// response.
///
/// The stream yields one `Data` per payload and ends with exactly one
/// `Closed` or `Failed`. A trailing partial event is flushed when the
/// body closes.
pub(crate) fn sse_event_stream(
    response: reqwest::Response,
    read_timeout: Duration,
) -> BoxStream<'static, ProviderEvent> {
    let stream = async_stream::stream! {
        let mut response = response;
        let mut pending: Vec<u8> = Vec::new();
        let mut buffer = String::new();

        loop {
            match tokio::time::timeout(read_timeout, response.chunk()).await {
                Ok(Ok(Some(bytes))) => {
                    pending.extend_from_slice(&bytes);
                    decode_into(&mut pending, &mut buffer);
                    for data in drain_data_lines(&mut buffer) {
                        yield ProviderEvent::Data(data);
                    }
                }
                Ok(Ok(None)) => {
                    if !pending.is_empty() {
                        buffer.push_str(&String::from_utf8_lossy(&pending));
                        pending.clear();
                    }
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                        for data in drain_data_lines(&mut buffer) {
                            yield ProviderEvent::Data(data);
                        }
                    }
                    yield ProviderEvent::Closed;
                    break;
                }
                Ok(Err(e)) => {
                    yield ProviderEvent::Failed(Error::from(e));
                    break;
                }
                Err(_) => {
                    yield ProviderEvent::Failed(Error::Timeout(format!(
                        "no data from provider within {}s",
                        read_timeout.as_secs()
                    )));
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
