//! Common types for completion requests and responses

use serde_json::Value;

/// Completion request sent to the relay
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<LlmMessage>,
    /// Empty disables tool use for the request
    pub tools: Vec<ToolDeclaration>,
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl LlmMessage {
    pub fn user(content: MessageContent) -> Self {
        Self {
            role: MessageRole::User,
            content,
        }
    }

    pub fn assistant(content: MessageContent) -> Self {
        Self {
            role: MessageRole::Assistant,
            content,
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Message payload: plain text, or the block sequence of a tool-use exchange
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    pub fn text(s: impl Into<String>) -> Self {
        MessageContent::Text(s.into())
    }
}

/// Content block in a message
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
        /// Citation payload attached by the service, echoed back untouched
        citations: Option<Value>,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    /// Block type this client does not interpret (server-side search
    /// activity and the like). Kept verbatim so it can be sent back.
    Opaque { kind: String, raw: Value },
}

impl ContentBlock {
    #[cfg(test)]
    pub fn text(s: impl Into<String>) -> Self {
        ContentBlock::Text {
            text: s.into(),
            citations: None,
        }
    }

    #[cfg(test)]
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
        }
    }

    /// Wire `type` tag for this block
    pub fn kind(&self) -> &str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::ToolUse { .. } => "tool_use",
            ContentBlock::ToolResult { .. } => "tool_result",
            ContentBlock::Opaque { kind, .. } => kind,
        }
    }
}

/// Concatenate the text blocks in order, without separators. Other block
/// types contribute nothing.
pub fn concat_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Tool declaration passed through to the service unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDeclaration {
    /// Versioned tool type, e.g. `web_search_20250305`
    pub kind: String,
    pub name: String,
}

pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";
pub const DEFAULT_WEB_SEARCH_VERSION: &str = "20250305";

impl ToolDeclaration {
    pub fn web_search(version: &str) -> Self {
        Self {
            kind: format!("web_search_{version}"),
            name: WEB_SEARCH_TOOL_NAME.to_string(),
        }
    }
}

/// Why the service stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    /// The service wants tool results before it continues
    ToolUse,
    MaxTokens,
    StopSequence,
    Other(String),
}

impl StopReason {
    /// A missing stop reason is treated as a finished turn.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            None | Some("end_turn") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            Some(other) => StopReason::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::ToolUse => "tool_use",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::Other(s) => s,
        }
    }
}

/// Completion response
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl CompletionResponse {
    pub fn text(&self) -> String {
        concat_text(&self.content)
    }

    /// Extract `(id, name)` for every tool use request, in block order
    pub fn tool_uses(&self) -> Vec<(&str, &str)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, .. } => Some((id.as_str(), name.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Usage statistics
#[allow(clippy::struct_field_names)] // tokens suffix is meaningful
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
