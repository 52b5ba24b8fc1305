//! Provider trait — the abstraction over the hosted generation service.
//!
//! A Provider knows how to send role-tagged turns to an LLM and stream the
//! reply back as text fragments. Credentials and the HTTP client belong to
//! the implementation; callers only see [`GenerationRequest`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ProviderError, Result};
use crate::message::Turn;

/// Optional provider capabilities attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Web-search grounding. Only the resource-search use case enables it.
    WebSearch,
}

/// Per-use-case generation settings.
///
/// Exactly these four fields exist; there is no free-form option bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationConfig {
    system_instruction: String,
    temperature: f32,
    top_p: f32,
    tools: Vec<Tool>,
}

impl GenerationConfig {
    /// Build a validated configuration.
    ///
    /// `temperature` must lie in `[0.0, 2.0]` and `top_p` in `(0.0, 1.0]`.
    pub fn new(system_instruction: impl Into<String>, temperature: f32, top_p: f32) -> Result<Self> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(Error::Config {
                message: format!("temperature must be between 0.0 and 2.0, got {temperature}"),
            });
        }
        if !(top_p > 0.0 && top_p <= 1.0) {
            return Err(Error::Config {
                message: format!("top_p must be in (0.0, 1.0], got {top_p}"),
            });
        }
        Ok(Self {
            system_instruction: system_instruction.into(),
            temperature,
            top_p,
            tools: Vec::new(),
        })
    }

    /// Attach a provider capability.
    pub fn with_tool(mut self, tool: Tool) -> Self {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }

    /// Same settings, different system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn top_p(&self) -> f32 {
        self.top_p
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }
}

/// One outbound generation call. Derived per call, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// The model identifier (e.g. "gemini-3-flash-preview")
    pub model: String,

    /// Ordered, bounded turns; the last one is the user's
    pub turns: Vec<Turn>,

    /// Persona and behavioral constraints
    pub system_instruction: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling cutoff
    pub top_p: f32,

    /// Enabled capabilities
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, turns: Vec<Turn>, config: &GenerationConfig) -> Self {
        Self {
            model: model.into(),
            turns,
            system_instruction: config.system_instruction.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            tools: config.tools.clone(),
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial text delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            done: false,
            usage: None,
        }
    }

    pub fn done(usage: Option<Usage>) -> Self {
        Self {
            content: None,
            done: true,
            usage,
        }
    }
}

/// Receiving half of a streamed generation.
pub type ChunkReceiver =
    tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The outbound model collaborator.
///
/// Dropping the returned receiver abandons the stream; implementations must
/// stop producing when the send side fails.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a request and get a stream of response chunks.
    async fn stream(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_config_accepts_presets() {
        let chat = GenerationConfig::new("be helpful", 0.9, 0.95).unwrap();
        assert!((chat.temperature() - 0.9).abs() < f32::EPSILON);
        assert!(chat.tools().is_empty());

        let search = GenerationConfig::new("curate", 0.35, 0.95)
            .unwrap()
            .with_tool(Tool::WebSearch)
            .with_tool(Tool::WebSearch);
        assert_eq!(search.tools(), &[Tool::WebSearch]);
    }

    #[test]
    fn generation_config_rejects_out_of_range() {
        assert!(matches!(
            GenerationConfig::new("x", 2.5, 0.95),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            GenerationConfig::new("x", 0.5, 0.0),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            GenerationConfig::new("x", 0.5, 1.5),
            Err(Error::Config { .. })
        ));
        assert!(GenerationConfig::new("x", f32::NAN, 0.5).is_err());
    }

    #[test]
    fn request_copies_config_fields() {
        let config = GenerationConfig::new("persona", 0.35, 0.9)
            .unwrap()
            .with_tool(Tool::WebSearch);
        let req = GenerationRequest::new("gemini-test", vec![Turn::user("hi").unwrap()], &config);
        assert_eq!(req.model, "gemini-test");
        assert_eq!(req.system_instruction, "persona");
        assert_eq!(req.tools, vec![Tool::WebSearch]);
        assert_eq!(req.turns.len(), 1);
    }

    #[test]
    fn stream_chunk_constructors() {
        let chunk = StreamChunk::text("Hel");
        assert_eq!(chunk.content.as_deref(), Some("Hel"));
        assert!(!chunk.done);
        assert!(StreamChunk::done(None).done);
    }
}
