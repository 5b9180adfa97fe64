//! Conversation transcript
//!
//! Ordered list of turns, owned by the runtime. Transient turns are progress
//! indicators and are never sent to the completion service.

use crate::llm::{concat_text, LlmMessage, MessageContent, MessageRole};

pub const GREETING: &str = concat!(
    "Hello! I'm your AI assistant with real-time web search. ",
    "I can help you with current news, trends, products, and any up-to-date information. ",
    "How can I help you today?"
);

/// One entry in the transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: MessageRole,
    pub content: MessageContent,
    pub transient: bool,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::text(text),
            transient: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::text(text),
            transient: false,
        }
    }

    /// Assistant turn that only exists while a round is in flight
    pub fn marker(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::text(text),
            transient: true,
        }
    }

    /// Display text: the text itself, or the concatenated text blocks
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => concat_text(blocks),
        }
    }

    pub fn to_message(&self) -> LlmMessage {
        LlmMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    greeting: String,
    turns: Vec<Turn>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(GREETING)
    }
}

impl Transcript {
    pub fn new(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            turns: vec![Turn::assistant(greeting.clone())],
            greeting,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn durable(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| !t.transient)
    }

    pub fn has_transient(&self) -> bool {
        self.turns.iter().any(|t| t.transient)
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop every transient turn, returning how many were removed
    pub fn remove_transient(&mut self) -> usize {
        let before = self.turns.len();
        self.turns.retain(|t| !t.transient);
        before - self.turns.len()
    }

    /// Back to the greeting-only transcript
    pub fn reset(&mut self) {
        self.turns.clear();
        self.turns.push(Turn::assistant(self.greeting.clone()));
    }

    /// Durable turns in wire shape, oldest first
    pub fn to_messages(&self) -> Vec<LlmMessage> {
        self.durable().map(Turn::to_message).collect()
    }

    /// Durable turns alternate roles, starting with the assistant greeting
    pub fn is_alternating(&self) -> bool {
        self.durable().enumerate().all(|(i, turn)| {
            let expected = if i % 2 == 0 {
                MessageRole::Assistant
            } else {
                MessageRole::User
            };
            turn.role == expected
        })
    }
}
