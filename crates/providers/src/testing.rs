//! Scripted transport used by the engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use iw_domain::error::{Error, Result};
use iw_domain::stream::{BoxStream, ProviderEvent};
use parking_lot::Mutex;

use crate::http::{HttpCall, HttpReply, HttpTransport};

/// One scripted stream step.
pub(crate) enum Step {
    Data(String),
    Closed,
    Fail(Error),
    /// Sleep before the next step.
    Stall(Duration),
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpReply>>>,
    streams: Mutex<VecDeque<Vec<Step>>>,
    pub(crate) calls: Mutex<Vec<HttpCall>>,
    /// Set once a stream handed out by `open_stream` has been dropped.
    pub(crate) released: Arc<AtomicBool>,
}

struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub(crate) fn with_reply(status: u16, body: &str) -> Self {
        let t = Self::default();
        t.replies.lock().push_back(Ok(HttpReply { status, body: body.into() }));
        t
    }

    pub(crate) fn with_stream(steps: Vec<Step>) -> Self {
        let t = Self::default();
        t.streams.lock().push_back(steps);
        t
    }

    pub(crate) fn replies_push(&self, reply: Result<HttpReply>) {
        self.replies.lock().push_back(reply);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn call_once(&self, call: HttpCall) -> Result<HttpReply> {
        self.calls.lock().push(call);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Http("no scripted reply".into())))
    }

    fn open_stream(&self, call: HttpCall) -> BoxStream<'static, ProviderEvent> {
        self.calls.lock().push(call);
        let steps = self.streams.lock().pop_front().unwrap_or_default();
        let flag = ReleaseFlag(self.released.clone());
        Box::pin(async_stream::stream! {
            let _flag = flag;
            for step in steps {
                match step {
                    Step::Data(d) => yield ProviderEvent::Data(d),
                    Step::Closed => yield ProviderEvent::Closed,
                    Step::Fail(e) => yield ProviderEvent::Failed(e),
                    Step::Stall(d) => tokio::time::sleep(d).await,
                }
            }
        })
    }
}
