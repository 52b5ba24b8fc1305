//! Turn and Conversation domain types.
//!
//! These are the value objects that flow through the whole system:
//! the UI submits text → a session appends a user `Turn` → the gateway streams
//! a reply → the session appends an assistant `Turn`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a turn. There is no third role: system instructions travel
/// separately on the request, never inside the turn log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The student
    User,
    /// The model
    Assistant,
}

impl Role {
    /// Normalize a free-form role label.
    ///
    /// `"assistant"` (any case, surrounding whitespace ignored) is the
    /// assistant; every other label, including `"system"`, is the user.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("assistant") {
            Self::Assistant
        } else {
            Self::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single role-tagged message. Immutable once created, never blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    id: String,
    role: Role,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a turn, trimming the text. Blank text is rejected.
    pub fn new(role: Role, text: impl AsRef<str>) -> Result<Self> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} turn text must not be empty",
                role.as_str()
            )));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Create a new user turn.
    pub fn user(text: impl AsRef<str>) -> Result<Self> {
        Self::new(Role::User, text)
    }

    /// Create a new assistant turn.
    pub fn assistant(text: impl AsRef<str>) -> Result<Self> {
        Self::new(Role::Assistant, text)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A turn as the UI layer hands it over: a free-form role label and raw text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledTurn {
    #[serde(default = "default_label")]
    pub role: String,

    #[serde(default)]
    pub content: String,
}

fn default_label() -> String {
    "user".into()
}

impl LabeledTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Normalize into a [`Turn`]; `None` when the content is blank.
    pub fn to_turn(&self) -> Option<Turn> {
        Turn::new(Role::from_label(&self.role), &self.content).ok()
    }
}

/// An ordered, append-only log of turns.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    turns: Vec<Turn>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last turn was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a conversation whose first turn is an assistant greeting.
    pub fn with_greeting(id: ConversationId, greeting: &str) -> Result<Self> {
        let mut conv = Self::new(id);
        conv.push(Turn::assistant(greeting)?);
        Ok(conv)
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.updated_at = Utc::now();
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Get the total token count estimate (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.turns.iter().map(|t| t.text.len() / 4).sum()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(ConversationId::new())
    }
}
