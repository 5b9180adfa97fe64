//! Orchestrator state types

use crate::llm::{CompletionRequest, ToolDeclaration, TransportError, DEFAULT_WEB_SEARCH_VERSION};
use crate::state_machine::classify::ToolInvocation;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Orchestrator state. At most one round is in flight.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ChatState {
    /// No call in flight, ready for a user turn
    #[default]
    Idle,

    /// First completion call outstanding
    AwaitingFirstResponse {
        /// The request in flight; the continuation is built from it
        request: CompletionRequest,
    },

    /// Continuation call outstanding, carrying tool results
    AwaitingContinuation {
        /// Invocations answered by the continuation
        invocations: Vec<ToolInvocation>,
    },
}

impl ChatState {
    pub fn is_busy(&self) -> bool {
        !matches!(self, ChatState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::AwaitingFirstResponse { .. } => "awaiting_first_response",
            ChatState::AwaitingContinuation { .. } => "awaiting_continuation",
        }
    }
}

/// How a round ended. Every round ends back in `Idle`.
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// Text from the service became the assistant turn
    Completed { searched: bool },
    /// A fixed fallback string became the assistant turn
    Recovered(RoundError),
}

#[derive(Debug, Clone, Error)]
pub enum RoundError {
    #[error("completion call failed: {0}")]
    Transport(#[from] TransportError),
    #[error("completion contained no text")]
    EmptyCompletion { searched: bool },
}

/// Request settings shared by every round (immutable configuration)
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub model: String,
    pub max_tokens: u32,
    pub web_search_version: String,
}

impl Default for ChatContext {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL, DEFAULT_MAX_TOKENS)
    }
}

impl ChatContext {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            web_search_version: DEFAULT_WEB_SEARCH_VERSION.to_string(),
        }
    }

    pub fn with_web_search_version(mut self, version: impl Into<String>) -> Self {
        self.web_search_version = version.into();
        self
    }

    /// Tool declarations for a round
    pub fn tools(&self, search_enabled: bool) -> Vec<ToolDeclaration> {
        if search_enabled {
            vec![ToolDeclaration::web_search(&self.web_search_version)]
        } else {
            vec![]
        }
    }
}
