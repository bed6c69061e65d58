//! Scripted in-memory transport for tests.
//!
//! Rules are matched in insertion order against the dialled URL; the first
//! match decides the reply. Every call is recorded, matched or not.

use crate::client::http::{HttpResponse, HttpTransport, RequestSpec};
use crate::errors::{TransportError, TransportErrorKind};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// What the mock does for a matching URL.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this status and body.
    Respond {
        /// HTTP status.
        status: u16,
        /// Body bytes.
        body: Vec<u8>,
    },
    /// Fail at the transport level.
    Fail(TransportErrorKind),
    /// Never answer; the caller's timeout decides.
    Hang,
    /// Wait, then behave like the inner reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    /// Respond with a status and a text body.
    pub fn json(status: u16, body: &str) -> Self {
        Self::Respond {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    /// Connection refused.
    pub fn connect_error() -> Self {
        Self::Fail(TransportErrorKind::Connect)
    }

    /// Timed out.
    pub fn timeout_error() -> Self {
        Self::Fail(TransportErrorKind::Timeout)
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Prefix(String),
    Suffix(String),
}

impl Matcher {
    fn matches(&self, url: &str) -> bool {
        match self {
            Matcher::Prefix(p) => url.starts_with(p.as_str()),
            Matcher::Suffix(s) => url.ends_with(s.as_str()),
        }
    }
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Dialled URL.
    pub url: String,
    /// Request as sent.
    pub request: RequestSpec,
}

/// Transport that replays scripted replies and records calls.
#[derive(Debug, Default)]
pub struct MockTransport {
    rules: Mutex<Vec<(Matcher, MockReply)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    /// Empty script: every URL fails to connect.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply for URLs starting with `prefix`.
    pub fn on_prefix(self, prefix: &str, reply: MockReply) -> Self {
        self.push(Matcher::Prefix(prefix.to_string()), reply);
        self
    }

    /// Reply for URLs ending with `suffix`.
    pub fn on_suffix(self, suffix: &str, reply: MockReply) -> Self {
        self.push(Matcher::Suffix(suffix.to_string()), reply);
        self
    }

    /// Replace the reply for an existing suffix rule, or add one.
    pub fn set_suffix(&self, suffix: &str, reply: MockReply) {
        let mut rules = self.rules.lock().expect("mock rules lock");
        rules.retain(|(m, _)| !matches!(m, Matcher::Suffix(s) if s == suffix));
        rules.insert(0, (Matcher::Suffix(suffix.to_string()), reply));
    }

    fn push(&self, matcher: Matcher, reply: MockReply) {
        self.rules
            .lock()
            .expect("mock rules lock")
            .push((matcher, reply));
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock calls lock").clone()
    }

    /// Dialled URLs, oldest first.
    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.url).collect()
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock").len()
    }

    /// Calls whose URL ends with `suffix`.
    pub fn calls_to(&self, suffix: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.url.ends_with(suffix))
            .collect()
    }

    fn reply_for(&self, url: &str) -> MockReply {
        self.rules
            .lock()
            .expect("mock rules lock")
            .iter()
            .find(|(m, _)| m.matches(url))
            .map(|(_, r)| r.clone())
            .unwrap_or_else(MockReply::connect_error)
    }
}

async fn play(reply: MockReply, url: &str) -> Result<HttpResponse, TransportError> {
    let mut reply = reply;
    loop {
        match reply {
            MockReply::Respond { status, body } => return Ok(HttpResponse { status, body }),
            MockReply::Fail(kind) => {
                return Err(TransportError::new(kind, format!("scripted failure for {}", url)))
            }
            MockReply::Hang => std::future::pending::<()>().await,
            MockReply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(
        &self,
        url: &str,
        request: &RequestSpec,
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.calls
            .lock()
            .expect("mock calls lock")
            .push(RecordedCall {
                url: url.to_string(),
                request: request.clone(),
            });
        let reply = self.reply_for(url);
        play(reply, url).await
    }
}
