//! Server-sent events of a streamed response

use serde::Serialize;

use super::request::ContentPart;
use super::response::{OutputItem, ResponseObject, ResponseStatus};

/// One event on the wire, numbered in emission order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    pub sequence_number: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Event payloads, tagged with their wire name
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum EventKind {
    #[serde(rename = "response.created")]
    Created { response: ResponseObject },

    #[serde(rename = "response.in_progress")]
    InProgress { response: ResponseObject },

    #[serde(rename = "response.output_item.added")]
    OutputItemAdded { output_index: usize, item: OutputItem },

    #[serde(rename = "response.output_item.done")]
    OutputItemDone { output_index: usize, item: OutputItem },

    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {
        item_id: String,
        output_index: usize,
        content_index: usize,
        part: ContentPart,
    },

    #[serde(rename = "response.content_part.done")]
    ContentPartDone {
        item_id: String,
        output_index: usize,
        content_index: usize,
        part: ContentPart,
    },

    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        item_id: String,
        output_index: usize,
        content_index: usize,
        delta: String,
    },

    #[serde(rename = "response.output_text.done")]
    OutputTextDone {
        item_id: String,
        output_index: usize,
        content_index: usize,
        text: String,
    },

    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {
        item_id: String,
        output_index: usize,
        delta: String,
    },

    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        item_id: String,
        output_index: usize,
        arguments: String,
    },

    #[serde(rename = "response.completed")]
    Completed { response: ResponseObject },

    #[serde(rename = "response.incomplete")]
    Incomplete { response: ResponseObject },

    #[serde(rename = "response.failed")]
    Failed { response: ResponseObject },

    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl EventKind {
    /// Terminal event matching the envelope's status
    pub fn terminal(response: ResponseObject) -> Self {
        match response.status {
            ResponseStatus::Completed => Self::Completed { response },
            ResponseStatus::Incomplete => Self::Incomplete { response },
            ResponseStatus::Failed => Self::Failed { response },
            ResponseStatus::InProgress => Self::InProgress { response },
        }
    }

    /// Wire name, used as the SSE `event:` field
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "response.created",
            Self::InProgress { .. } => "response.in_progress",
            Self::OutputItemAdded { .. } => "response.output_item.added",
            Self::OutputItemDone { .. } => "response.output_item.done",
            Self::ContentPartAdded { .. } => "response.content_part.added",
            Self::ContentPartDone { .. } => "response.content_part.done",
            Self::OutputTextDelta { .. } => "response.output_text.delta",
            Self::OutputTextDone { .. } => "response.output_text.done",
            Self::FunctionCallArgumentsDelta { .. } => "response.function_call_arguments.delta",
            Self::FunctionCallArgumentsDone { .. } => "response.function_call_arguments.done",
            Self::Completed { .. } => "response.completed",
            Self::Incomplete { .. } => "response.incomplete",
            Self::Failed { .. } => "response.failed",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends the stream
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Incomplete { .. } | Self::Failed { .. } | Self::Error { .. }
        )
    }
}
