//! Conversation turns and their grounding.

use serde::{Deserialize, Serialize};

use whisperer_context_files::ScoredFragment;

/// Who wrote a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Provenance entry sent ahead of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
}

/// A fragment that grounded an answer, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingRef {
    pub source: String,
    pub text: String,
}

impl From<&ScoredFragment> for GroundingRef {
    fn from(scored: &ScoredFragment) -> Self {
        Self {
            source: scored.fragment.source.clone(),
            text: scored.fragment.text.clone(),
        }
    }
}

/// One message in a conversation.
///
/// A user turn is complete on creation. An assistant turn starts empty and
/// streaming; while streaming its content only grows, and [`finish`] freezes
/// it.
///
/// [`finish`]: ConversationTurn::finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    grounding: Vec<GroundingRef>,
    #[serde(default)]
    streaming: bool,
}

impl ConversationTurn {
    /// A complete user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            grounding: Vec::new(),
            streaming: false,
        }
    }

    /// An empty assistant turn, streaming, grounded on `grounding`.
    pub fn assistant(grounding: Vec<GroundingRef>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            grounding,
            streaming: true,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn grounding(&self) -> &[GroundingRef] {
        &self.grounding
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Replace the content with `full_text`.
    ///
    /// Accepted only while streaming and only when `full_text` extends the
    /// current content. Returns whether the update was applied.
    pub fn apply_update(&mut self, full_text: &str) -> bool {
        if !self.streaming || !full_text.starts_with(self.content.as_str()) {
            return false;
        }
        self.content.clear();
        self.content.push_str(full_text);
        true
    }

    /// Stop streaming. Later updates are ignored.
    pub fn finish(&mut self) {
        self.streaming = false;
    }
}

/// Ordered turns of one chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::user(content));
    }

    /// Append a streaming assistant turn and return it for updates.
    pub fn begin_assistant(&mut self, grounding: Vec<GroundingRef>) -> &mut ConversationTurn {
        self.turns.push(ConversationTurn::assistant(grounding));
        let last = self.turns.len() - 1;
        &mut self.turns[last]
    }

    /// Content of the most recent user turn.
    pub fn last_question(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(ConversationTurn::content)
    }
}

impl From<Vec<ConversationTurn>> for Conversation {
    fn from(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }
}
