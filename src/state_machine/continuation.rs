//! Continuation request synthesis

use super::classify::ToolInvocation;
use crate::llm::{CompletionRequest, CompletionResponse, ContentBlock, LlmMessage, MessageContent};

/// Tool result reported for every invocation. The search itself runs on the
/// service side; this client only acknowledges it.
pub const TOOL_RESULT_ACK: &str = "Search completed successfully";

/// Build the follow-up request for a pending-tool response.
///
/// `first` already ends with the user's turn. The result appends the
/// assistant response verbatim and a user turn holding one tool result per
/// invocation, in invocation order. Model, token budget and tools carry over
/// unchanged. `invocations` must not be empty.
pub fn build_continuation(
    first: &CompletionRequest,
    response: &CompletionResponse,
    invocations: &[ToolInvocation],
) -> CompletionRequest {
    let tool_results = invocations
        .iter()
        .map(|inv| ContentBlock::tool_result(inv.id.clone(), TOOL_RESULT_ACK))
        .collect();

    let mut messages = Vec::with_capacity(first.messages.len() + 2);
    messages.extend(first.messages.iter().cloned());
    messages.push(LlmMessage::assistant(MessageContent::Blocks(response.content.clone())));
    messages.push(LlmMessage::user(MessageContent::Blocks(tool_results)));

    CompletionRequest {
        model: first.model.clone(),
        max_tokens: first.max_tokens,
        messages,
        tools: first.tools.clone(),
    }
}
