//! Chat completion result -> response envelope

use axon_llm::protocol::chat::{ChatCompletionResponse, ChatUsage, FinishReason};

use super::reasoning::split_reasoning;
use crate::ids;
use crate::protocol::{
    FunctionCallItem, IncompleteDetails, IncompleteReason, ItemStatus, OutputItem, OutputTokensDetails,
    ResponseError, ResponseObject, ResponseStatus, ResponseUsage, ResponsesRequest,
};

/// Convert one completed provider result into the caller's envelope
pub fn to_envelope(
    completion: &ChatCompletionResponse,
    request: &ResponsesRequest,
    response_id: &str,
    created_at: u64,
) -> ResponseObject {
    let mut envelope = ResponseObject::in_progress(response_id, created_at, request);

    for choice in &completion.choices {
        let message = &choice.message;

        if let Some(reasoning) = message.reasoning_content.as_deref().map(str::trim)
            && !reasoning.is_empty()
        {
            envelope
                .output
                .push(OutputItem::reasoning(ids::reasoning_id(), reasoning.to_owned()));
        }

        if let Some(content) = &message.content {
            let split = split_reasoning(content);
            envelope.output.extend(
                split
                    .reasoning
                    .into_iter()
                    .map(|text| OutputItem::reasoning(ids::reasoning_id(), text)),
            );
            if !split.text.trim().is_empty() {
                envelope.output.push(OutputItem::message(ids::message_id(), split.text));
            }
        }

        for call in message.tool_calls.iter().flatten() {
            envelope.output.push(OutputItem::FunctionCall(FunctionCallItem {
                id: Some(ids::function_call_id()),
                call_id: call.id.clone(),
                name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
                status: Some(ItemStatus::Completed),
            }));
        }
    }

    let finished = |reason| completion.choices.iter().any(|c| c.finish_reason == Some(reason));

    if finished(FinishReason::ContentFilter) {
        envelope.status = ResponseStatus::Failed;
        envelope.error = Some(ResponseError {
            code: "server_error".to_owned(),
            message: "the response was blocked by the provider's content filter".to_owned(),
        });
        envelope.incomplete_details = Some(IncompleteDetails {
            reason: IncompleteReason::ContentFilter,
        });
    } else if finished(FinishReason::Length) {
        envelope.status = ResponseStatus::Incomplete;
        envelope.incomplete_details = Some(IncompleteDetails {
            reason: IncompleteReason::MaxOutputTokens,
        });
    } else {
        envelope.status = ResponseStatus::Completed;
    }

    envelope.usage = completion.usage.as_ref().map(usage_from_chat);

    envelope
}

/// Map provider token counts to response usage
pub fn usage_from_chat(usage: &ChatUsage) -> ResponseUsage {
    ResponseUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
        output_tokens_details: OutputTokensDetails {
            reasoning_tokens: usage
                .completion_tokens_details
                .map(|details| details.reasoning_tokens)
                .unwrap_or_default(),
        },
    }
}
