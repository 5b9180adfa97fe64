//! Events that drive the orchestrator

use crate::llm::{CompletionResponse, TransportError};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserTurn {
        text: String,
        /// Search toggle as read when the round starts
        search_enabled: bool,
    },
    Reset,

    // Completion events
    CompletionReceived {
        response: CompletionResponse,
    },
    CompletionFailed {
        error: TransportError,
    },
}
