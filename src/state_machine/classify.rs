//! Tool-use detection

use crate::llm::{CompletionResponse, StopReason};

/// A tool call the service is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The response is the answer
    Final { text: String },
    /// The service stopped for tool results. Never empty.
    PendingTool { invocations: Vec<ToolInvocation> },
}

/// Classify a response.
///
/// Only a `tool_use` stop reason together with at least one `tool_use` block
/// is pending; a `tool_use` stop with no invocation block is final so the
/// round cannot wait on nothing.
pub fn classify(response: &CompletionResponse) -> Classification {
    if response.stop_reason == StopReason::ToolUse {
        let invocations: Vec<ToolInvocation> = response
            .tool_uses()
            .into_iter()
            .map(|(id, name)| ToolInvocation {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();

        if !invocations.is_empty() {
            return Classification::PendingTool { invocations };
        }
    }

    Classification::Final {
        text: response.text(),
    }
}
