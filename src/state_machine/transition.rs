//! Pure state transition function

use super::classify::{classify, Classification, ToolInvocation};
use super::continuation::build_continuation;
use super::state::{RoundError, RoundOutcome};
use super::{ChatContext, ChatState, Effect, Event};
use crate::llm::{CompletionRequest, CompletionResponse, TransportError};
use crate::transcript::{Transcript, Turn};
use thiserror::Error;

pub const SEARCHING_MARKER: &str = "🔍 Searching the web for the latest information...";
pub const EMPTY_REPLY_FALLBACK: &str =
    "I received your message but had trouble generating a response. Please try again.";
pub const EMPTY_SEARCH_FALLBACK: &str =
    "I found some information, but had trouble formatting the response. Please try again.";
pub const TRANSPORT_APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("A round is already in flight, input ignored")]
    AgentBusy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function: same inputs, same outputs, no I/O. The
/// transcript is read to build requests; changes to it are returned as
/// effects.
pub fn transition(
    state: &ChatState,
    context: &ChatContext,
    transcript: &Transcript,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User input
        // ============================================================
        (_, Event::UserTurn { text, .. }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        // Idle + UserTurn -> AwaitingFirstResponse
        (ChatState::Idle, Event::UserTurn { text, search_enabled }) => {
            let user_turn = Turn::user(text);
            let mut messages = transcript.to_messages();
            messages.push(user_turn.to_message());

            let request = CompletionRequest {
                model: context.model.clone(),
                max_tokens: context.max_tokens,
                messages,
                tools: context.tools(search_enabled),
            };

            Ok(TransitionResult::new(ChatState::AwaitingFirstResponse {
                request: request.clone(),
            })
            .with_effect(Effect::append(user_turn))
            .with_effect(Effect::request(request)))
        }

        (ChatState::Idle, Event::Reset) => {
            Ok(TransitionResult::new(ChatState::Idle).with_effect(Effect::ResetTranscript))
        }

        // No queueing: input during a round is dropped
        (
            ChatState::AwaitingFirstResponse { .. } | ChatState::AwaitingContinuation { .. },
            Event::UserTurn { .. } | Event::Reset,
        ) => Err(TransitionError::AgentBusy),

        // ============================================================
        // First response
        // ============================================================
        (ChatState::AwaitingFirstResponse { request }, Event::CompletionReceived { response }) => {
            match classify(&response) {
                Classification::Final { text } => Ok(finish_round(text, false)),
                Classification::PendingTool { invocations } => {
                    let names: Vec<&str> =
                        invocations.iter().map(|inv| inv.name.as_str()).collect();
                    tracing::info!(tools = ?names, "Service requested tool use");
                    let continuation = build_continuation(request, &response, &invocations);
                    Ok(TransitionResult::new(ChatState::AwaitingContinuation { invocations })
                        .with_effect(Effect::append(Turn::marker(SEARCHING_MARKER)))
                        .with_effect(Effect::request(continuation)))
                }
            }
        }

        // ============================================================
        // Continuation response
        // ============================================================

        // Exactly one continuation: whatever comes back ends the round
        (
            ChatState::AwaitingContinuation { invocations },
            Event::CompletionReceived { response },
        ) => Ok(finish_continuation(invocations, &response)),

        // ============================================================
        // Transport failure
        // ============================================================
        (
            ChatState::AwaitingFirstResponse { .. } | ChatState::AwaitingContinuation { .. },
            Event::CompletionFailed { error },
        ) => Ok(fail_round(error)),

        (
            ChatState::Idle,
            event @ (Event::CompletionReceived { .. } | Event::CompletionFailed { .. }),
        ) => Err(TransitionError::InvalidTransition(format!(
            "completion settled while idle: {event:?}"
        ))),
    }
}

fn finish_continuation(
    answered: &[ToolInvocation],
    response: &CompletionResponse,
) -> TransitionResult {
    if let Classification::PendingTool { invocations } = classify(response) {
        tracing::warn!(
            answered = answered.len(),
            pending = invocations.len(),
            "Continuation asked for more tools; ending round with its text"
        );
    }

    TransitionResult::new(ChatState::Idle)
        .with_effect(Effect::RemoveTransient)
        .with_effects(finish_round(response.text(), true).effects)
}

/// Record the assistant's answer, or the fallback when it has no text
fn finish_round(text: String, searched: bool) -> TransitionResult {
    let (turn, outcome) = if text.is_empty() {
        let fallback = if searched {
            EMPTY_SEARCH_FALLBACK
        } else {
            EMPTY_REPLY_FALLBACK
        };
        (
            Turn::assistant(fallback),
            RoundOutcome::Recovered(RoundError::EmptyCompletion { searched }),
        )
    } else {
        (Turn::assistant(text), RoundOutcome::Completed { searched })
    };

    TransitionResult::new(ChatState::Idle)
        .with_effect(Effect::append(turn))
        .with_effect(Effect::finished(outcome))
}

fn fail_round(error: TransportError) -> TransitionResult {
    TransitionResult::new(ChatState::Idle)
        .with_effect(Effect::RemoveTransient)
        .with_effect(Effect::append(Turn::assistant(TRANSPORT_APOLOGY)))
        .with_effect(Effect::finished(RoundOutcome::Recovered(RoundError::Transport(error))))
}
