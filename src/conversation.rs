//! In-memory conversation history for one chat session.

use thiserror::Error;

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Violations of the user/assistant alternation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("the previous prompt has not been answered yet")]
    ReplyPending,
    #[error("there is no prompt awaiting a reply")]
    NoPendingPrompt,
}

/// Append-only, insertion-ordered sequence of turns.
///
/// Turns alternate strictly, starting with a user turn. Dropping the store
/// ends the session; nothing is persisted.
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// True when the last turn is a user turn still waiting for its reply.
    pub fn awaiting_reply(&self) -> bool {
        matches!(self.turns.last(), Some(t) if t.role == Role::User)
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> Result<(), ConversationError> {
        if self.awaiting_reply() {
            return Err(ConversationError::ReplyPending);
        }
        self.turns.push(Turn {
            role: Role::User,
            content: content.into(),
        });
        Ok(())
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> Result<(), ConversationError> {
        if !self.awaiting_reply() {
            return Err(ConversationError::NoPendingPrompt);
        }
        self.turns.push(Turn {
            role: Role::Assistant,
            content: content.into(),
        });
        Ok(())
    }
}
