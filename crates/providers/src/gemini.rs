//! Gemini provider implementation.
//!
//! Talks to the `streamGenerateContent` endpoint of the Generative Language
//! API with `alt=sse`, so each `data:` line carries one partial
//! `GenerateContentResponse`.
//!
//! Supports:
//! - Streaming text generation with a system instruction
//! - Sampling controls (temperature, top_p)
//! - Google Search grounding as an optional tool

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use nextstep_core::error::ProviderError;
use nextstep_core::message::{Role, Turn};
use nextstep_core::provider::*;
use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Default base URL of the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A Gemini LLM provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider against `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "gemini".into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create a provider for the public endpoint (convenience constructor).
    pub fn public(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(DEFAULT_BASE_URL, api_key, Duration::from_secs(120))
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        )
    }

    /// The model's half of the dialogue is called "model" on the wire.
    fn wire_role(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }

    /// Convert our turns to Gemini `contents`.
    fn to_api_contents(turns: &[Turn]) -> Vec<ApiContent> {
        turns
            .iter()
            .map(|t| ApiContent {
                role: Some(Self::wire_role(t.role()).into()),
                parts: vec![ApiPart {
                    text: t.text().to_string(),
                }],
            })
            .collect()
    }

    fn to_api_tools(tools: &[Tool]) -> Vec<ApiTool> {
        tools
            .iter()
            .map(|tool| match tool {
                Tool::WebSearch => ApiTool {
                    google_search: Some(serde_json::json!({})),
                },
            })
            .collect()
    }

    fn build_body(request: &GenerationRequest) -> ApiRequest {
        let system_instruction = if request.system_instruction.trim().is_empty() {
            None
        } else {
            Some(ApiContent {
                role: None,
                parts: vec![ApiPart {
                    text: request.system_instruction.clone(),
                }],
            })
        };

        ApiRequest {
            contents: Self::to_api_contents(&request.turns),
            system_instruction,
            generation_config: ApiGenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
            },
            tools: Self::to_api_tools(&request.tools),
        }
    }
}

#[async_trait]
impl nextstep_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: GenerationRequest) -> Result<ChunkReceiver, ProviderError> {
        let url = self.stream_url(&request.model);
        let body = Self::build_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Provider streaming error");
            return Err(map_http_error(status, &error_body, retry_after));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Spawn task to read the SSE byte stream and parse chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut state = SseState::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let err = if e.is_timeout() {
                            ProviderError::Timeout(e.to_string())
                        } else {
                            ProviderError::StreamInterrupted(e.to_string())
                        };
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                };

                buffer.extend_from_slice(&bytes);

                // Process complete lines; a multi-byte char may straddle chunks,
                // so decode only whole lines.
                while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                    if !forward_line(&raw, &mut state, &tx, &provider_name).await {
                        return;
                    }
                }
            }

            // A final line without a trailing newline still counts.
            if !buffer.is_empty() && !forward_line(&buffer, &mut state, &tx, &provider_name).await
            {
                return;
            }

            let last = if state.finished {
                Ok(StreamChunk::done(state.usage))
            } else {
                warn!(provider = %provider_name, "Stream ended without a finish reason");
                Err(ProviderError::StreamInterrupted(
                    "connection closed before the response finished".into(),
                ))
            };
            let _ = tx.send(last).await;
        });

        Ok(rx)
    }
}

/// Build a Gemini provider from application configuration.
pub fn build_from_config(
    config: &nextstep_config::AppConfig,
) -> Result<GeminiProvider, ProviderError> {
    if !config.has_api_key() {
        return Err(ProviderError::NotConfigured("GEMINI_API_KEY missing".into()));
    }

    GeminiProvider::new(
        &config.api_url,
        config.api_key.clone().unwrap_or_default(),
        Duration::from_secs(config.request_timeout_secs),
    )
}

/// What the SSE reader has seen so far.
#[derive(Debug, Default)]
struct SseState {
    usage: Option<Usage>,
    finished: bool,
}

/// Parse one raw SSE line and forward its text. `false` means the reader
/// must stop: the receiver is gone or the provider reported an error.
async fn forward_line(
    raw: &[u8],
    state: &mut SseState,
    tx: &tokio::sync::mpsc::Sender<Result<StreamChunk, ProviderError>>,
    provider_name: &str,
) -> bool {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);

    // Skip empty lines and SSE comments
    if line.is_empty() || line.starts_with(':') {
        return true;
    }

    let Some(data) = line.strip_prefix("data:") else {
        return true;
    };

    match parse_event(data.trim()) {
        Ok(Some(event)) => {
            if event.usage.is_some() {
                state.usage = event.usage;
            }
            state.finished |= event.finished;
            if !event.text.is_empty() && tx.send(Ok(StreamChunk::text(event.text))).await.is_err()
            {
                trace!(provider = %provider_name, "Receiver dropped, abandoning stream");
                return false;
            }
            true
        }
        Ok(None) => {
            trace!(provider = %provider_name, data = %data, "Ignoring unparseable SSE chunk");
            true
        }
        Err(e) => {
            warn!(provider = %provider_name, error = %e, "Provider reported an in-stream error");
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// One decoded SSE event.
#[derive(Debug, Default)]
struct ParsedEvent {
    text: String,
    usage: Option<Usage>,
    /// The first candidate carried a `finishReason`.
    finished: bool,
}

/// Decode one `data:` payload.
///
/// `Ok(None)` for payloads that are not a response at all.
fn parse_event(data: &str) -> Result<Option<ParsedEvent>, ProviderError> {
    if let Ok(wrapper) = serde_json::from_str::<ErrorWrapper>(data) {
        return Err(error_from_body(&wrapper.error, None));
    }

    let Ok(resp) = serde_json::from_str::<StreamResponse>(data) else {
        return Ok(None);
    };

    let finished = resp
        .candidates
        .first()
        .is_some_and(|c| c.finish_reason.is_some());

    let text = resp
        .candidates
        .iter()
        .take(1)
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .filter(|p| !p.thought)
        .filter_map(|p| p.text.as_deref())
        .collect::<String>();

    let usage = resp.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    Ok(Some(ParsedEvent {
        text,
        usage,
        finished,
    }))
}

fn map_http_error(status: StatusCode, body: &str, retry_after: Option<Duration>) -> ProviderError {
    if let Ok(wrapper) = serde_json::from_str::<ErrorWrapper>(body) {
        let mut body_err = wrapper.error;
        body_err.code.get_or_insert(status.as_u16());
        return error_from_body(&body_err, retry_after);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after_secs: retry_after.map(|d| d.as_secs()).unwrap_or(5),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message: body.to_string(),
        },
    }
}

fn error_from_body(err: &ErrorBody, retry_after: Option<Duration>) -> ProviderError {
    let status_text = err.status.clone().unwrap_or_default();
    let message = err.message.clone().unwrap_or_default();

    if status_text == "RESOURCE_EXHAUSTED" {
        return ProviderError::QuotaExhausted(message);
    }

    match err.code {
        Some(429) => ProviderError::RateLimited {
            retry_after_secs: retry_after.map(|d| d.as_secs()).unwrap_or(5),
        },
        Some(401) | Some(403) => ProviderError::AuthenticationFailed(message),
        Some(code) => ProviderError::ApiError {
            status_code: code,
            message: if status_text.is_empty() {
                message
            } else {
                format!("{status_text}: {message}")
            },
        },
        None => ProviderError::StreamInterrupted(format!("{status_text}: {message}")),
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    generation_config: ApiGenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<serde_json::Value>,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamResponse {
    #[serde(default)]
    candidates: Vec<StreamCandidate>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamCandidate {
    #[serde(default)]
    content: Option<StreamContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamContent {
    #[serde(default)]
    parts: Vec<StreamPart>,
}

#[derive(Debug, Deserialize)]
struct StreamPart {
    #[serde(default)]
    text: Option<String>,
    /// Thought summaries are never part of the answer.
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}
