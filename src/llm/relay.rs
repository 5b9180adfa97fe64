//! HTTP relay client
//!
//! The relay fronts the completion service: it takes the request body as-is
//! and answers with the service's message JSON.

use super::types::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmMessage, MessageContent, StopReason,
    Usage,
};
use super::{CompletionClient, TransportError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Completion client backed by the chat relay endpoint
pub struct RelayClient {
    client: Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        // No request timeout: a call runs until it settles.
        let client = Client::builder()
            .user_agent(concat!("searchchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for RelayClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, TransportError> {
        let body = translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    TransportError::network(format!("Connection failed: {e}"))
                } else {
                    TransportError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read response: {e}")))?;

        decode_response(status, &body)
    }
}

fn translate_request(request: &CompletionRequest) -> RelayRequest {
    RelayRequest {
        model: request.model.clone(),
        max_tokens: request.max_tokens,
        messages: request.messages.iter().map(translate_message).collect(),
        tools: request
            .tools
            .iter()
            .map(|t| RelayTool {
                kind: t.kind.clone(),
                name: t.name.clone(),
            })
            .collect(),
    }
}

fn translate_message(msg: &LlmMessage) -> RelayMessage {
    let content = match &msg.content {
        MessageContent::Text(text) => RelayContent::Text(text.clone()),
        MessageContent::Blocks(blocks) => {
            RelayContent::Blocks(blocks.iter().map(translate_block).collect())
        }
    };

    RelayMessage {
        role: msg.role.as_str().to_string(),
        content,
    }
}

fn translate_block(block: &ContentBlock) -> RelayBlock {
    match block {
        ContentBlock::Text { text, citations } => RelayBlock::Known(RelayContentBlock::Text {
            text: text.clone(),
            citations: citations.clone(),
        }),
        ContentBlock::ToolUse { id, name, input } => RelayBlock::Known(RelayContentBlock::ToolUse {
            id: id.clone(),
            name: name.clone(),
            input: input.clone(),
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
        } => RelayBlock::Known(RelayContentBlock::ToolResult {
            tool_use_id: tool_use_id.clone(),
            content: content.clone(),
        }),
        ContentBlock::Opaque { raw, .. } => RelayBlock::Raw(raw.clone()),
    }
}

/// Map a relay reply to a response, or to the transport error it represents
fn decode_response(status: StatusCode, body: &str) -> Result<CompletionResponse, TransportError> {
    if !status.is_success() {
        return Err(classify_error(status, body));
    }

    let relay_response: RelayResponse = serde_json::from_str(body).map_err(|e| {
        TransportError::decode(format!("Failed to parse response: {e} - body: {body}"))
    })?;

    normalize_response(relay_response)
}

fn normalize_response(resp: RelayResponse) -> Result<CompletionResponse, TransportError> {
    let content = resp
        .content
        .into_iter()
        .map(normalize_block)
        .collect::<Result<Vec<_>, _>>()?;

    let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
    });

    Ok(CompletionResponse {
        content,
        stop_reason: StopReason::from_wire(resp.stop_reason.as_deref()),
        usage,
    })
}

fn normalize_block(raw: Value) -> Result<ContentBlock, TransportError> {
    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| TransportError::decode(format!("Content block without a type: {raw}")))?
        .to_string();

    if !matches!(kind.as_str(), "text" | "tool_use" | "tool_result") {
        return Ok(ContentBlock::Opaque { kind, raw });
    }

    let block: RelayContentBlock = serde_json::from_value(raw)
        .map_err(|e| TransportError::decode(format!("Malformed {kind} block: {e}")))?;

    Ok(match block {
        RelayContentBlock::Text { text, citations } => ContentBlock::Text { text, citations },
        RelayContentBlock::ToolUse { id, name, input } => ContentBlock::ToolUse { id, name, input },
        RelayContentBlock::ToolResult {
            tool_use_id,
            content,
        } => ContentBlock::ToolResult {
            tool_use_id,
            content,
        },
    })
}

fn classify_error(status: StatusCode, body: &str) -> TransportError {
    match status.as_u16() {
        401 | 403 => TransportError::auth(format!("Authentication failed: {body}")),
        429 => TransportError::rate_limit(format!("Rate limited: {body}")),
        400 => TransportError::invalid_request(format!("Invalid request: {body}")),
        500..=599 => TransportError::server_error(format!("Server error: {body}")),
        _ => TransportError::unknown(format!("HTTP {status}: {body}")),
    }
}

// Relay wire types

#[derive(Debug, Serialize)]
struct RelayRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<RelayMessage>,
    tools: Vec<RelayTool>,
}

#[derive(Debug, Serialize)]
struct RelayMessage {
    role: String,
    content: RelayContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RelayContent {
    Text(String),
    Blocks(Vec<RelayBlock>),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RelayBlock {
    Known(RelayContentBlock),
    Raw(Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RelayContentBlock {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        citations: Option<Value>,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default = "empty_input")]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

fn empty_input() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Serialize)]
struct RelayTool {
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    content: Vec<Value>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<RelayUsage>,
}

#[allow(clippy::struct_field_names)] // tokens suffix is meaningful
#[derive(Debug, Deserialize)]
struct RelayUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}
