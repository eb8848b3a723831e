//! Caller-side response envelope

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::request::{
    ContentPart, FunctionCallItem, FunctionCallOutputItem, InputItem, ItemStatus, MessageContent, MessageItem,
    ReasoningConfig, ReasoningContent, ReasoningItem, ResponsesRequest, Role, TextConfig, ToolChoice, ToolDeclaration,
};

/// Response envelope returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseObject {
    pub id: String,
    /// Always `response`
    pub object: String,
    /// Unix timestamp in seconds
    pub created_at: u64,
    pub model: String,
    pub status: ResponseStatus,
    pub output: Vec<OutputItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<ResponseUsage>,
    #[serde(default)]
    pub error: Option<ResponseError>,
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,

    // Echoed request parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolDeclaration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

impl ResponseObject {
    /// Fresh in-progress envelope echoing the request parameters
    pub fn in_progress(id: &str, created_at: u64, request: &ResponsesRequest) -> Self {
        Self {
            id: id.to_owned(),
            object: "response".to_owned(),
            created_at,
            model: request.model.clone(),
            status: ResponseStatus::InProgress,
            output: Vec::new(),
            usage: None,
            error: None,
            incomplete_details: None,
            instructions: request.instructions.clone(),
            tools: request.tools.clone().unwrap_or_default(),
            tool_choice: request.tool_choice.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: request.max_output_tokens,
            text: request.text.clone(),
            reasoning: request.reasoning.clone(),
            parallel_tool_calls: request.parallel_tool_calls,
            store: request.store,
            user: request.user.clone(),
            metadata: request.metadata.clone(),
            previous_response_id: request.previous_response_id.clone(),
        }
    }

    /// Function calls in the output, in order
    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCallItem> {
        self.output.iter().filter_map(|item| match item {
            OutputItem::FunctionCall(call) => Some(call),
            _ => None,
        })
    }

    /// Concatenated text of every message item
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Message(message) => Some(message.text()),
                _ => None,
            })
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        self.status != ResponseStatus::InProgress
    }
}

/// Overall response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    InProgress,
    Completed,
    Incomplete,
    Failed,
}

impl ResponseStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Failed => "failed",
        }
    }
}

/// Output item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message(OutputMessage),
    Reasoning(ReasoningItem),
    FunctionCall(FunctionCallItem),
    FunctionCallOutput(FunctionCallOutputItem),
}

impl OutputItem {
    /// Reasoning item holding `text`
    pub fn reasoning(id: String, text: String) -> Self {
        Self::Reasoning(ReasoningItem {
            id: Some(id),
            summary: Vec::new(),
            content: vec![ReasoningContent::ReasoningText { text }],
        })
    }

    /// Completed assistant message holding `text`
    pub fn message(id: String, text: String) -> Self {
        Self::Message(OutputMessage {
            id,
            role: Role::Assistant,
            status: ItemStatus::Completed,
            content: vec![ContentPart::output_text(text)],
        })
    }

    pub fn function_call_id(&self) -> Option<&str> {
        match self {
            Self::FunctionCall(call) => Some(&call.call_id),
            _ => None,
        }
    }
}

impl From<OutputItem> for InputItem {
    fn from(item: OutputItem) -> Self {
        match item {
            OutputItem::Message(message) => Self::Message(MessageItem {
                id: Some(message.id),
                role: message.role,
                content: MessageContent::Parts(message.content),
                status: Some(message.status),
            }),
            OutputItem::Reasoning(reasoning) => Self::Reasoning(reasoning),
            OutputItem::FunctionCall(call) => Self::FunctionCall(call),
            OutputItem::FunctionCallOutput(output) => Self::FunctionCallOutput(output),
        }
    }
}

/// Assistant message output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMessage {
    pub id: String,
    pub role: Role,
    pub status: ItemStatus,
    pub content: Vec<ContentPart>,
}

impl OutputMessage {
    pub fn text(&self) -> String {
        self.content.iter().filter_map(ContentPart::text).collect()
    }
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    #[serde(default)]
    pub output_tokens_details: OutputTokensDetails,
}

impl ResponseUsage {
    /// Add another iteration's usage
    pub fn accumulate(&mut self, other: &Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        self.output_tokens_details.reasoning_tokens += other.output_tokens_details.reasoning_tokens;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTokensDetails {
    pub reasoning_tokens: u32,
}

/// Failure payload on a failed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: String,
    pub message: String,
}

/// Why a response stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteDetails {
    pub reason: IncompleteReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    MaxOutputTokens,
    ContentFilter,
}
