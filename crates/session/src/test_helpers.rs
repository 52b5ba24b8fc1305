//! Shared test providers for session, flow, and desk tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use nextstep_core::{ChunkReceiver, GenerationRequest, Provider, ProviderError, StreamChunk};
use tokio::sync::{Notify, mpsc};

/// One scripted outcome for a single `stream` call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Stream these fragments, then finish normally.
    Fragments(Vec<String>),
    /// Fail before the first fragment.
    Fail(ProviderError),
    /// Stream these fragments, then fail.
    FailMidStream(Vec<String>, ProviderError),
}

impl Reply {
    pub fn fragments(parts: &[&str]) -> Self {
        Self::Fragments(parts.iter().map(|p| p.to_string()).collect())
    }

    pub fn text(text: &str) -> Self {
        Self::Fragments(vec![text.to_string()])
    }
}

/// A provider that answers each call with the next scripted reply.
///
/// Once the script is exhausted it reports `NotConfigured`.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

fn prefilled(fragments: Vec<String>, tail: Result<StreamChunk, ProviderError>) -> ChunkReceiver {
    let (tx, rx) = mpsc::channel(fragments.len() + 1);
    for fragment in fragments {
        let _ = tx.try_send(Ok(StreamChunk::text(fragment)));
    }
    let _ = tx.try_send(tail);
    rx
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: GenerationRequest) -> Result<ChunkReceiver, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Fragments(parts)) => Ok(prefilled(parts, Ok(StreamChunk::done(None)))),
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::FailMidStream(parts, e)) => Ok(prefilled(parts, Err(e))),
            None => Err(ProviderError::NotConfigured("script exhausted".into())),
        }
    }
}

/// A provider that blocks inside `stream` until released.
///
/// `entered` fires once a call is in flight, so a test can issue a second
/// call while the first still holds the session.
pub struct GatedProvider {
    pub entered: Notify,
    pub release: Notify,
    reply: String,
    calls: AtomicUsize,
}

impl GatedProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            entered: Notify::new(),
            release: Notify::new(),
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for GatedProvider {
    fn name(&self) -> &str {
        "gated"
    }

    async fn stream(&self, _request: GenerationRequest) -> Result<ChunkReceiver, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(prefilled(
            vec![self.reply.clone()],
            Ok(StreamChunk::done(None)),
        ))
    }
}

/// A provider whose stream sends one fragment and then never finishes.
///
/// `closed` reports whether the consumer dropped its receiver.
pub struct HangingProvider {
    sender: Mutex<Option<mpsc::Sender<Result<StreamChunk, ProviderError>>>>,
}

impl HangingProvider {
    pub fn new() -> Self {
        Self {
            sender: Mutex::new(None),
        }
    }

    pub fn closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.is_closed())
    }
}

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn stream(&self, _request: GenerationRequest) -> Result<ChunkReceiver, ProviderError> {
        let (tx, rx) = mpsc::channel(4);
        let _ = tx.try_send(Ok(StreamChunk::text("thinking")));
        *self.sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}
