//! Model gateway: one streamed generation per call, as ordered text fragments.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use nextstep_core::provider::Usage;
use nextstep_core::{GenerationConfig, GenerationRequest, Provider, ProviderError, StreamChunk, Turn};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::stream_event::{EventSink, StreamEvent, emit};

/// Fronts a [`Provider`] for a fixed model.
///
/// Each call is independent; the gateway holds no conversation state.
pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    model: String,
}

/// The fully accumulated text of one generation.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Start a generation and return its fragments lazily.
    ///
    /// Failures before the first fragment are returned here; failures after
    /// arrive as the stream's terminal item.
    pub async fn stream_generate(
        &self,
        turns: Vec<Turn>,
        config: &GenerationConfig,
    ) -> Result<FragmentStream, ProviderError> {
        let request = GenerationRequest::new(&self.model, turns, config);
        debug!(
            provider = self.provider.name(),
            model = %self.model,
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Starting generation"
        );

        match self.provider.stream(request).await {
            Ok(rx) => Ok(FragmentStream::new(ReceiverStream::new(rx))),
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Generation failed to start");
                Err(e)
            }
        }
    }

    /// Run a generation to completion, forwarding fragments to `observer`.
    pub async fn generate(
        &self,
        turns: Vec<Turn>,
        config: &GenerationConfig,
        observer: Option<&EventSink>,
    ) -> Result<Completion, ProviderError> {
        self.stream_generate(turns, config)
            .await?
            .accumulate(observer)
            .await
    }
}

/// Lazy, finite sequence of text fragments from one generation.
///
/// Yields `Ok(fragment)` in arrival order, then ends. A failure mid-stream is
/// yielded once as `Err` and the stream ends after it. Dropping the stream
/// abandons the generation.
pub struct FragmentStream {
    inner: ReceiverStream<Result<StreamChunk, ProviderError>>,
    usage: Option<Usage>,
    finished: bool,
}

impl FragmentStream {
    fn new(inner: ReceiverStream<Result<StreamChunk, ProviderError>>) -> Self {
        Self {
            inner,
            usage: None,
            finished: false,
        }
    }

    /// Usage reported by the provider, available once the stream has ended.
    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// Drain the stream into one string. Partial text is discarded on error.
    pub async fn accumulate(
        mut self,
        observer: Option<&EventSink>,
    ) -> Result<Completion, ProviderError> {
        let mut text = String::new();
        while let Some(item) = self.next().await {
            let fragment = item?;
            emit(
                observer,
                StreamEvent::Fragment {
                    content: fragment.clone(),
                },
            );
            text.push_str(&fragment);
        }
        Ok(Completion {
            text,
            usage: self.usage.take(),
        })
    }
}

impl Stream for FragmentStream {
    type Item = Result<String, ProviderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(ProviderError::StreamInterrupted(
                        "stream closed before completion".into(),
                    ))));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Some(Ok(chunk))) => {
                    if chunk.done {
                        this.finished = true;
                        this.usage = chunk.usage;
                        if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                            return Poll::Ready(Some(Ok(content)));
                        }
                        return Poll::Ready(None);
                    }
                    match chunk.content {
                        Some(content) if !content.is_empty() => {
                            return Poll::Ready(Some(Ok(content)));
                        }
                        _ => continue,
                    }
                }
            }
        }
    }
}
