//! Effects produced by state transitions

use super::state::RoundOutcome;
use crate::llm::CompletionRequest;
use crate::transcript::Turn;

/// Effects to be executed, in order, after a state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append a turn to the transcript
    AppendTurn { turn: Turn },

    /// Drop every transient turn from the transcript
    RemoveTransient,

    /// Restore the greeting-only transcript
    ResetTranscript,

    /// Make a completion call; its settlement is fed back as an event
    RequestCompletion { request: CompletionRequest },

    /// The round is over
    RoundFinished { outcome: RoundOutcome },
}

impl Effect {
    pub fn append(turn: Turn) -> Self {
        Effect::AppendTurn { turn }
    }

    pub fn request(request: CompletionRequest) -> Self {
        Effect::RequestCompletion { request }
    }

    pub fn finished(outcome: RoundOutcome) -> Self {
        Effect::RoundFinished { outcome }
    }
}
