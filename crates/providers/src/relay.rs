//! Streaming relay: one provider stream in, one ordered event channel out.
//!
//! Every session is driven by a single pump task. The task owns the
//! provider stream and the channel sender, so fragments leave in arrival
//! order and dropping either end releases the other.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use iw_domain::error::{Error, Result};
use iw_domain::message::ChatMessage;
use iw_domain::stream::{BoxStream, ProviderEvent, RelayEvent};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::http::HttpTransport;
use crate::request::{CompletionRequest, ProviderSettings};

#[derive(Debug, Clone, Copy)]
pub struct RelayParams {
    pub temperature: f64,
    pub max_tokens: u32,
    /// Per-chunk read timeout on the provider leg.
    pub read_timeout: Duration,
    /// Whole-session deadline, covering provider waits and a full
    /// downstream buffer alike.
    pub session_timeout: Duration,
}

/// Consumer side of a relay session.
///
/// Dropping `events` is a client disconnect; the pump notices and
/// releases the provider connection.
pub struct RelayHandle {
    pub events: mpsc::Receiver<RelayEvent>,
    cancel: CancellationToken,
}

impl RelayHandle {
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.events.recv().await
    }

    /// Stop the session without emitting anything further.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RelayEngine {
    transport: Arc<dyn HttpTransport>,
    settings: ProviderSettings,
    buffer: usize,
}

impl RelayEngine {
    pub fn new(transport: Arc<dyn HttpTransport>, settings: ProviderSettings, buffer: usize) -> Self {
        Self {
            transport,
            settings,
            buffer: buffer.max(1),
        }
    }

    /// Start a relay session. The system prompt is injected ahead of
    /// `history`. Must be called inside a tokio runtime.
    pub fn relay(
        &self,
        system_prompt: &str,
        history: Vec<ChatMessage>,
        params: RelayParams,
    ) -> Result<RelayHandle> {
        let turns = history.len();
        let mut messages = Vec::with_capacity(turns + 1);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(history);

        let request = CompletionRequest::new(
            &self.settings.model,
            messages,
            true,
            params.temperature,
            params.max_tokens,
        );
        let call = self.settings.call(&request, params.read_timeout)?;

        let (tx, rx) = mpsc::channel(self.buffer);
        let cancel = CancellationToken::new();
        let provider = self.transport.open_stream(call);

        let session = RelaySession {
            sink: tx,
            cancel: cancel.clone(),
            deadline: Instant::now() + params.session_timeout,
            session_timeout: params.session_timeout,
            outcome: None,
            fragments: 0,
        };

        let session_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("relay", session = %session_id, model = %request.model, turns);
        tokio::spawn(session.run(provider).instrument(span));

        Ok(RelayHandle { events: rx, cancel })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Frame interpretation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    Done,
    Fragment(String),
    Skip,
    Malformed(String),
}

/// Classify one provider `data:` payload. `[DONE]` is checked before any
/// JSON parsing.
pub(crate) fn interpret_frame(payload: &str) -> Frame {
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Frame::Done;
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(json) => match json.pointer("/choices/0/delta/content").and_then(Value::as_str) {
            Some(text) => Frame::Fragment(text.to_string()),
            None => Frame::Skip,
        },
        Err(e) => Frame::Malformed(e.to_string()),
    }
}

/// Text shown to the end user when the provider leg fails.
pub fn relay_error_message(err: &Error) -> String {
    match err {
        Error::Provider { status, body } => format!("AI 服务返回错误: {status} {body}"),
        Error::Timeout(_) => "AI 服务响应超时".into(),
        Error::MalformedResponse(reason) => format!("AI 服务返回了无法解析的数据: {reason}"),
        other => format!("AI 服务调用失败: {other}"),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    ProviderFailed,
    TimedOut,
    Disconnected,
    Cancelled,
}

impl Outcome {
    fn from_error(err: &Error) -> Self {
        match err {
            Error::ClientDisconnected => Outcome::Disconnected,
            _ => Outcome::ProviderFailed,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Completed => "completed",
            Outcome::ProviderFailed => "provider_failed",
            Outcome::TimedOut => "timed_out",
            Outcome::Disconnected => "disconnected",
            Outcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

enum Step {
    Cancelled,
    Disconnected,
    Expired,
    Provider(Option<ProviderEvent>),
}

enum Delivery {
    Sent,
    Disconnected,
    Expired,
    Cancelled,
}

struct RelaySession {
    sink: mpsc::Sender<RelayEvent>,
    cancel: CancellationToken,
    deadline: Instant,
    session_timeout: Duration,
    /// Set exactly once; the first terminal condition wins.
    outcome: Option<Outcome>,
    fragments: usize,
}

impl RelaySession {
    async fn run(mut self, mut provider: BoxStream<'static, ProviderEvent>) {
        let expiry = tokio::time::sleep_until(self.deadline);
        tokio::pin!(expiry);

        while self.outcome.is_none() {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Cancelled,
                _ = self.sink.closed() => Step::Disconnected,
                _ = &mut expiry => Step::Expired,
                event = provider.next() => Step::Provider(event),
            };

            match step {
                Step::Cancelled => self.finish(Outcome::Cancelled, None).await,
                Step::Disconnected => self.fail(Error::ClientDisconnected).await,
                Step::Expired => self.expire(),
                Step::Provider(Some(ProviderEvent::Data(payload))) => self.on_frame(&payload).await,
                Step::Provider(Some(ProviderEvent::Closed)) | Step::Provider(None) => {
                    tracing::warn!(fragments = self.fragments, "provider closed stream without [DONE]");
                    self.finish(Outcome::Completed, Some(RelayEvent::Done)).await;
                }
                Step::Provider(Some(ProviderEvent::Failed(err))) => self.fail(err).await,
            }
        }

        drop(provider);
        if let Some(outcome) = self.outcome {
            tracing::info!(%outcome, fragments = self.fragments, "relay session closed");
        }
    }

    async fn on_frame(&mut self, payload: &str) {
        match interpret_frame(payload) {
            Frame::Done => self.finish(Outcome::Completed, Some(RelayEvent::Done)).await,
            Frame::Fragment(text) => match self.send(RelayEvent::fragment(text)).await {
                Delivery::Sent => self.fragments += 1,
                Delivery::Disconnected => self.fail(Error::ClientDisconnected).await,
                Delivery::Cancelled => self.finish(Outcome::Cancelled, None).await,
                Delivery::Expired => self.expire(),
            },
            Frame::Skip => {}
            Frame::Malformed(reason) => self.fail(Error::MalformedResponse(reason)).await,
        }
    }

    /// Push one event, waiting for buffer room no longer than the session
    /// deadline allows.
    async fn send(&self, event: RelayEvent) -> Delivery {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Delivery::Cancelled,
            res = tokio::time::timeout_at(self.deadline, self.sink.send(event)) => match res {
                Ok(Ok(())) => Delivery::Sent,
                Ok(Err(_)) => Delivery::Disconnected,
                Err(_) => Delivery::Expired,
            },
        }
    }

    /// End the session on a failure. A departed client gets nothing;
    /// anyone else gets one error frame.
    async fn fail(&mut self, err: Error) {
        let outcome = Outcome::from_error(&err);
        if let Error::ClientDisconnected = err {
            tracing::debug!(reason = %err, fragments = self.fragments, "relay abandoned");
            self.finish(outcome, None).await;
            return;
        }
        tracing::warn!(error = %err, fragments = self.fragments, "provider stream failed");
        let message = relay_error_message(&err);
        self.finish(outcome, Some(RelayEvent::Error { message })).await;
    }

    /// Record the terminal outcome and deliver its final event. A second
    /// call is a no-op.
    async fn finish(&mut self, outcome: Outcome, last: Option<RelayEvent>) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);

        if let Some(event) = last {
            if let Delivery::Expired = self.send(event).await {
                tracing::warn!("downstream buffer full at deadline, terminal event dropped");
                self.outcome = Some(Outcome::TimedOut);
            }
        }
    }

    fn expire(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(Outcome::TimedOut);
        let secs = self.session_timeout.as_secs();
        tracing::warn!(timeout_secs = secs, fragments = self.fragments, "relay session timed out");

        // Best effort: a stalled consumer may have left no room.
        let _ = self.sink.try_send(RelayEvent::Error {
            message: format!("AI 响应超时（{secs}秒）"),
        });
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, Step as S};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn settings() -> ProviderSettings {
        ProviderSettings {
            api_url: "https://llm.test/chat/completions".into(),
            model: "deepseek-chat".into(),
            api_key: Some("sk-test".into()),
        }
    }

    fn params(session_ms: u64) -> RelayParams {
        RelayParams {
            temperature: 0.7,
            max_tokens: 2048,
            read_timeout: Duration::from_secs(120),
            session_timeout: Duration::from_millis(session_ms),
        }
    }

    fn delta(text: &str) -> String {
        json!({"choices": [{"delta": {"content": text}}]}).to_string()
    }

    async fn drain(mut handle: RelayHandle) -> Vec<RelayEvent> {
        let mut out = Vec::new();
        while let Some(ev) = handle.recv().await {
            out.push(ev);
        }
        out
    }

    fn engine(transport: Arc<ScriptedTransport>, buffer: usize) -> RelayEngine {
        RelayEngine::new(transport, settings(), buffer)
    }

    #[test]
    fn done_sentinel_checked_before_json() {
        assert_eq!(interpret_frame("[DONE]"), Frame::Done);
        assert_eq!(interpret_frame("  [DONE] "), Frame::Done);
    }

    #[test]
    fn frame_without_delta_content_is_skipped() {
        let role_only = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        let null_content = r#"{"choices":[{"delta":{"content":null}}]}"#;
        let usage_only = r#"{"choices":[],"usage":{"total_tokens":9}}"#;
        assert_eq!(interpret_frame(role_only), Frame::Skip);
        assert_eq!(interpret_frame(null_content), Frame::Skip);
        assert_eq!(interpret_frame(usage_only), Frame::Skip);
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(interpret_frame("{not json"), Frame::Malformed(_)));
    }

    #[test]
    fn provider_error_message_carries_status_and_body() {
        let msg = relay_error_message(&Error::Provider { status: 402, body: "Insufficient Balance".into() });
        assert_eq!(msg, "AI 服务返回错误: 402 Insufficient Balance");
    }

    #[test]
    fn only_client_disconnect_ends_quietly() {
        assert_eq!(Outcome::from_error(&Error::ClientDisconnected), Outcome::Disconnected);
        assert_eq!(
            Outcome::from_error(&Error::Timeout("read".into())),
            Outcome::ProviderFailed
        );
        assert_eq!(
            Outcome::from_error(&Error::MalformedResponse("eof".into())),
            Outcome::ProviderFailed
        );
    }

    #[tokio::test]
    async fn fragments_then_done_in_order() {
        let transport = Arc::new(ScriptedTransport::with_stream(vec![
            S::Data(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#.into()),
            S::Data(delta("你好")),
            S::Data(delta("，世界\n")),
            S::Data("[DONE]".into()),
            S::Closed,
        ]));
        let handle = engine(transport.clone(), 8)
            .relay("sys", vec![ChatMessage::user("hi")], params(5_000))
            .unwrap();

        let events = drain(handle).await;
        assert_eq!(
            events,
            vec![
                RelayEvent::fragment("你好"),
                RelayEvent::fragment("，世界\n"),
                RelayEvent::Done,
            ]
        );

        let calls = transport.calls.lock();
        assert_eq!(calls[0].body["stream"], json!(true));
        assert_eq!(calls[0].body["messages"][0]["role"], json!("system"));
        assert_eq!(calls[0].body["messages"][1]["content"], json!("hi"));
    }

    #[tokio::test]
    async fn frames_after_done_have_no_effect() {
        let transport = Arc::new(ScriptedTransport::with_stream(vec![
            S::Data(delta("F1")),
            S::Data("[DONE]".into()),
            S::Data(delta("F2")),
            S::Fail(Error::Http("reset".into())),
        ]));
        let handle = engine(transport, 8).relay("sys", vec![], params(5_000)).unwrap();

        let events = drain(handle).await;
        assert_eq!(events, vec![RelayEvent::fragment("F1"), RelayEvent::Done]);
    }

    #[tokio::test]
    async fn provider_failure_becomes_single_error() {
        let transport = Arc::new(ScriptedTransport::with_stream(vec![S::Fail(Error::Provider {
            status: 401,
            body: "invalid key".into(),
        })]));
        let handle = engine(transport, 8).relay("sys", vec![], params(5_000)).unwrap();

        let events = drain(handle).await;
        assert_eq!(
            events,
            vec![RelayEvent::Error { message: "AI 服务返回错误: 401 invalid key".into() }]
        );
    }

    #[tokio::test]
    async fn malformed_frame_terminates_with_error() {
        let transport = Arc::new(ScriptedTransport::with_stream(vec![
            S::Data(delta("ok")),
            S::Data("{garbage".into()),
            S::Data(delta("never")),
        ]));
        let handle = engine(transport, 8).relay("sys", vec![], params(5_000)).unwrap();

        let events = drain(handle).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], RelayEvent::fragment("ok"));
        assert!(matches!(events[1], RelayEvent::Error { .. }));
    }

    #[tokio::test]
    async fn close_without_done_still_completes() {
        let transport = Arc::new(ScriptedTransport::with_stream(vec![S::Data(delta("a")), S::Closed]));
        let handle = engine(transport, 8).relay("sys", vec![], params(5_000)).unwrap();

        assert_eq!(drain(handle).await, vec![RelayEvent::fragment("a"), RelayEvent::Done]);
    }

    #[tokio::test]
    async fn stalled_provider_hits_session_deadline() {
        let transport = Arc::new(ScriptedTransport::with_stream(vec![
            S::Data(delta("a")),
            S::Stall(Duration::from_secs(30)),
            S::Data("[DONE]".into()),
        ]));
        let handle = engine(transport, 8).relay("sys", vec![], params(100)).unwrap();

        let events = tokio::time::timeout(Duration::from_secs(5), drain(handle))
            .await
            .expect("session must end at its deadline");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], RelayEvent::fragment("a"));
        assert!(matches!(&events[1], RelayEvent::Error { message } if message.contains("超时")));
    }

    #[tokio::test]
    async fn dropping_receiver_releases_provider_stream() {
        let transport = Arc::new(ScriptedTransport::with_stream(vec![
            S::Data(delta("a")),
            S::Stall(Duration::from_secs(30)),
            S::Data(delta("b")),
        ]));
        let released = transport.released.clone();
        let mut handle = engine(transport, 8).relay("sys", vec![], params(60_000)).unwrap();

        assert_eq!(handle.recv().await, Some(RelayEvent::fragment("a")));
        drop(handle);

        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while !released.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "provider stream was not dropped");
    }

    #[tokio::test]
    async fn cancel_stops_delivery_silently() {
        let transport = Arc::new(ScriptedTransport::with_stream(vec![
            S::Data(delta("a")),
            S::Stall(Duration::from_secs(30)),
            S::Data(delta("b")),
        ]));
        let mut handle = engine(transport, 8).relay("sys", vec![], params(60_000)).unwrap();

        assert_eq!(handle.recv().await, Some(RelayEvent::fragment("a")));
        handle.cancel();
        let rest = tokio::time::timeout(Duration::from_secs(5), handle.recv()).await.unwrap();
        assert_eq!(rest, None);
    }

    #[tokio::test]
    async fn full_buffer_is_bounded_by_deadline() {
        let transport = Arc::new(ScriptedTransport::with_stream(vec![
            S::Data(delta("1")),
            S::Data(delta("2")),
            S::Data(delta("3")),
            S::Data("[DONE]".into()),
        ]));
        let mut handle = engine(transport, 1).relay("sys", vec![], params(100)).unwrap();

        // Nobody reads until the deadline has passed.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(handle.recv().await, Some(RelayEvent::fragment("1")));
        let tail = tokio::time::timeout(Duration::from_secs(5), handle.recv()).await.unwrap();
        assert_eq!(tail, None);
    }

    #[tokio::test]
    async fn second_terminal_signal_is_a_noop() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut session = RelaySession {
            sink: tx,
            cancel: CancellationToken::new(),
            deadline: Instant::now() + Duration::from_secs(5),
            session_timeout: Duration::from_secs(5),
            outcome: None,
            fragments: 0,
        };

        session.finish(Outcome::Completed, Some(RelayEvent::Done)).await;
        session
            .finish(Outcome::ProviderFailed, Some(RelayEvent::Error { message: "late".into() }))
            .await;
        session.expire();
        drop(session);

        assert_eq!(rx.recv().await, Some(RelayEvent::Done));
        assert_eq!(rx.recv().await, None);
    }
}
