//! Chat completion chunks -> response stream events
//!
//! A [`StreamAggregator`] lives for exactly one provider stream. It turns
//! each chunk into the caller-facing events it implies and keeps the
//! per-output-index buffers needed to close messages and function calls
//! once the provider finishes. It does no I/O: the gateway feeds it chunks
//! and forwards what it returns.
//!
//! Calls to tools the gateway runs itself are "internal": their argument
//! deltas are buffered but never forwarded, since the caller will see the
//! executed result instead.
//!
//! Output indices are allocated when an item is first seen and never change.
//! When a choice finishes with `tool_calls`, its message is moved to the
//! front of the iteration's output, so a message streamed after its calls
//! keeps a higher `output_index` than the calls while preceding them in the
//! final envelope. Callers that rebuild the output from events should order
//! by the envelope, not by `output_index`.

use std::collections::{BTreeMap, HashSet};

use axon_llm::protocol::chat::{ChatCompletionChunk, ChatStreamToolCall, FinishReason};
use axon_tools::ToolRegistry;
use serde_json::{Map, Value};

use crate::convert::usage_from_chat;
use crate::ids;
use crate::protocol::{
    ContentPart, EventKind, FunctionCallItem, IncompleteReason, ItemStatus, OutputItem, OutputMessage,
    ReasoningContent, ReasoningItem, ResponseObject, ResponseUsage, Role,
};

/// How an iteration's stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationEnd {
    Completed,
    Incomplete(IncompleteReason),
    /// The model called at least one internal tool; resolve these calls
    ToolCalls(Vec<FunctionCallItem>),
}

/// Outcome of one fully consumed provider stream
#[derive(Debug, Clone, PartialEq)]
pub struct IterationResult {
    /// Items produced by this iteration, in presentation order
    pub output: Vec<OutputItem>,
    pub usage: Option<ResponseUsage>,
    /// First output index not yet allocated
    pub next_index: usize,
    pub end: IterationEnd,
}

struct TextBuffer {
    output_index: usize,
    item_id: String,
    fragments: Vec<String>,
}

struct ReasoningBuffer {
    output_index: usize,
    item_id: String,
    text: String,
}

struct CallBuffer {
    output_index: usize,
    item_id: String,
    call_id: String,
    name: String,
    arguments: String,
    internal: bool,
    done: bool,
}

/// Per-iteration stream state machine
pub struct StreamAggregator<'a> {
    tools: &'a dyn ToolRegistry,
    envelope: ResponseObject,
    next_index: usize,
    in_progress_emitted: bool,
    text: BTreeMap<u32, TextBuffer>,
    reasoning: BTreeMap<u32, ReasoningBuffer>,
    calls: BTreeMap<(u32, u32), CallBuffer>,
    internal: HashSet<String>,
    output: Vec<OutputItem>,
    finished_choices: HashSet<u32>,
    finish: Option<FinishReason>,
    usage: Option<ResponseUsage>,
}

impl<'a> StreamAggregator<'a> {
    /// `envelope` is the in-progress envelope announced to the caller;
    /// output indices are allocated from `first_index`
    pub fn new(tools: &'a dyn ToolRegistry, envelope: ResponseObject, first_index: usize) -> Self {
        Self {
            tools,
            envelope,
            next_index: first_index,
            in_progress_emitted: false,
            text: BTreeMap::new(),
            reasoning: BTreeMap::new(),
            calls: BTreeMap::new(),
            internal: HashSet::new(),
            output: Vec::new(),
            finished_choices: HashSet::new(),
            finish: None,
            usage: None,
        }
    }

    /// Event announcing the iteration
    pub fn created(&self) -> EventKind {
        EventKind::Created {
            response: self.envelope.clone(),
        }
    }

    /// Consume one chunk
    pub fn ingest(&mut self, chunk: &ChatCompletionChunk) -> Vec<EventKind> {
        let mut events = Vec::new();

        if let Some(usage) = &chunk.usage {
            self.usage = Some(usage_from_chat(usage));
        }

        if chunk.choices.is_empty() {
            return events;
        }

        if !self.in_progress_emitted {
            self.in_progress_emitted = true;
            events.push(EventKind::InProgress {
                response: self.envelope.clone(),
            });
        }

        for choice in &chunk.choices {
            if self.finished_choices.contains(&choice.index) {
                continue;
            }

            let delta = &choice.delta;

            if let Some(text) = delta.reasoning_content.as_deref()
                && !text.is_empty()
            {
                self.push_reasoning(choice.index, text, &mut events);
            }

            if let Some(text) = delta.content.as_deref()
                && !text.is_empty()
            {
                self.push_text(choice.index, text, &mut events);
            }

            for call in delta.tool_calls.iter().flatten() {
                self.push_call(choice.index, call, &mut events);
            }

            if let Some(reason) = choice.finish_reason {
                self.finish_choice(choice.index, reason, &mut events);
            }
        }

        events
    }

    /// Close the iteration once the provider stream is exhausted
    ///
    /// Choices still open are finished as if the provider had sent `stop`.
    pub fn finish(mut self) -> (Vec<EventKind>, IterationResult) {
        let mut events = Vec::new();

        for choice in self.open_choices() {
            self.finish_choice(choice, FinishReason::Stop, &mut events);
        }

        let end = match self.finish.unwrap_or(FinishReason::Stop) {
            FinishReason::Length => IterationEnd::Incomplete(IncompleteReason::MaxOutputTokens),
            FinishReason::ContentFilter => IterationEnd::Incomplete(IncompleteReason::ContentFilter),
            FinishReason::ToolCalls | FinishReason::FunctionCall if !self.internal.is_empty() => {
                IterationEnd::ToolCalls(
                    self.output
                        .iter()
                        .filter_map(|item| match item {
                            OutputItem::FunctionCall(call) => Some(call.clone()),
                            _ => None,
                        })
                        .collect(),
                )
            }
            _ => IterationEnd::Completed,
        };

        let result = IterationResult {
            output: self.output,
            usage: self.usage,
            next_index: self.next_index,
            end,
        };

        (events, result)
    }

    /// Best-effort `done` events for everything still buffered, used when
    /// the provider stream fails
    pub fn abort(mut self) -> Vec<EventKind> {
        let mut events = Vec::new();

        for choice in self.open_choices() {
            for call in self.calls.range_mut((choice, 0)..=(choice, u32::MAX)).map(|(_, call)| call) {
                if !call.done {
                    complete_call(call, &mut self.output, &mut events);
                }
            }
            self.flush_choice(choice, &mut events);
        }

        events
    }

    fn open_choices(&self) -> Vec<u32> {
        let mut choices: Vec<u32> = self
            .text
            .keys()
            .chain(self.reasoning.keys())
            .copied()
            .chain(self.calls.keys().map(|(choice, _)| *choice))
            .filter(|choice| !self.finished_choices.contains(choice))
            .collect();
        choices.sort_unstable();
        choices.dedup();
        choices
    }

    fn allocate_index(next_index: &mut usize) -> usize {
        let index = *next_index;
        *next_index += 1;
        index
    }

    fn push_text(&mut self, choice: u32, text: &str, events: &mut Vec<EventKind>) {
        let buffer = self.text.entry(choice).or_insert_with(|| {
            let output_index = Self::allocate_index(&mut self.next_index);
            let item_id = ids::message_id();

            events.push(EventKind::OutputItemAdded {
                output_index,
                item: OutputItem::Message(OutputMessage {
                    id: item_id.clone(),
                    role: Role::Assistant,
                    status: ItemStatus::InProgress,
                    content: Vec::new(),
                }),
            });
            events.push(EventKind::ContentPartAdded {
                item_id: item_id.clone(),
                output_index,
                content_index: 0,
                part: ContentPart::output_text(""),
            });

            TextBuffer {
                output_index,
                item_id,
                fragments: Vec::new(),
            }
        });

        buffer.fragments.push(text.to_owned());
        events.push(EventKind::OutputTextDelta {
            item_id: buffer.item_id.clone(),
            output_index: buffer.output_index,
            content_index: 0,
            delta: text.to_owned(),
        });
    }

    fn push_reasoning(&mut self, choice: u32, text: &str, events: &mut Vec<EventKind>) {
        let buffer = self.reasoning.entry(choice).or_insert_with(|| {
            let output_index = Self::allocate_index(&mut self.next_index);
            let item_id = ids::reasoning_id();

            events.push(EventKind::OutputItemAdded {
                output_index,
                item: OutputItem::Reasoning(ReasoningItem {
                    id: Some(item_id.clone()),
                    summary: Vec::new(),
                    content: Vec::new(),
                }),
            });

            ReasoningBuffer {
                output_index,
                item_id,
                text: String::new(),
            }
        });

        buffer.text.push_str(text);
    }

    fn push_call(&mut self, choice: u32, call: &ChatStreamToolCall, events: &mut Vec<EventKind>) {
        let function = call.function.as_ref();
        let fragment = function.and_then(|f| f.arguments.as_deref()).unwrap_or_default();
        let key = (choice, call.index);

        if !self.calls.contains_key(&key) {
            let Some(name) = function.and_then(|f| f.name.as_deref()).filter(|name| !name.is_empty()) else {
                tracing::debug!(choice, index = call.index, "dropping tool call fragment that precedes its name");
                return;
            };

            let output_index = Self::allocate_index(&mut self.next_index);
            let item_id = ids::function_call_id();
            let call_id = call.id.clone().unwrap_or_else(ids::call_id);
            let internal = self.tools.lookup(name).is_some();

            if internal {
                self.internal.insert(call_id.clone());
            }

            events.push(EventKind::OutputItemAdded {
                output_index,
                item: OutputItem::FunctionCall(FunctionCallItem {
                    id: Some(item_id.clone()),
                    call_id: call_id.clone(),
                    name: name.to_owned(),
                    arguments: String::new(),
                    status: Some(ItemStatus::InProgress),
                }),
            });

            self.calls.insert(
                key,
                CallBuffer {
                    output_index,
                    item_id,
                    call_id,
                    name: name.to_owned(),
                    arguments: String::new(),
                    internal,
                    done: false,
                },
            );
        }

        let Some(buffer) = self.calls.get_mut(&key) else {
            return;
        };

        if buffer.done {
            if !fragment.is_empty() {
                tracing::debug!(call_id = %buffer.call_id, "ignoring arguments after the call completed");
            }
            return;
        }

        if !fragment.is_empty() {
            buffer.arguments.push_str(fragment);
            if !buffer.internal {
                events.push(EventKind::FunctionCallArgumentsDelta {
                    item_id: buffer.item_id.clone(),
                    output_index: buffer.output_index,
                    delta: fragment.to_owned(),
                });
            }
        }

        if arguments_complete(&buffer.arguments) {
            complete_call(buffer, &mut self.output, events);
        }
    }

    fn finish_choice(&mut self, choice: u32, reason: FinishReason, events: &mut Vec<EventKind>) {
        self.finished_choices.insert(choice);

        for call in self.calls.range_mut((choice, 0)..=(choice, u32::MAX)).map(|(_, call)| call) {
            if !call.done {
                complete_call(call, &mut self.output, events);
            }
        }

        let flushed = self.flush_choice(choice, events);

        if matches!(reason, FinishReason::ToolCalls | FinishReason::FunctionCall) {
            // Text preceding the calls is presented before them
            self.output.splice(0..0, flushed);
        } else {
            self.output.extend(flushed);
        }

        self.finish = Some(match self.finish {
            Some(current) if severity(current) >= severity(reason) => current,
            _ => reason,
        });
    }

    /// Close the reasoning and text buffers of a choice, returning their items
    fn flush_choice(&mut self, choice: u32, events: &mut Vec<EventKind>) -> Vec<OutputItem> {
        let mut items = Vec::new();

        if let Some(buffer) = self.reasoning.remove(&choice) {
            let item = OutputItem::Reasoning(ReasoningItem {
                id: Some(buffer.item_id),
                summary: Vec::new(),
                content: vec![ReasoningContent::ReasoningText {
                    text: buffer.text.trim().to_owned(),
                }],
            });
            events.push(EventKind::OutputItemDone {
                output_index: buffer.output_index,
                item: item.clone(),
            });
            items.push(item);
        }

        if let Some(buffer) = self.text.remove(&choice) {
            let text = buffer.fragments.concat();

            events.push(EventKind::OutputTextDone {
                item_id: buffer.item_id.clone(),
                output_index: buffer.output_index,
                content_index: 0,
                text: text.clone(),
            });
            events.push(EventKind::ContentPartDone {
                item_id: buffer.item_id.clone(),
                output_index: buffer.output_index,
                content_index: 0,
                part: ContentPart::output_text(text.clone()),
            });

            let item = OutputItem::message(buffer.item_id, text);
            events.push(EventKind::OutputItemDone {
                output_index: buffer.output_index,
                item: item.clone(),
            });
            items.push(item);
        }

        items
    }
}

/// Arguments are complete once they form a JSON object
fn arguments_complete(arguments: &str) -> bool {
    !arguments.is_empty() && serde_json::from_str::<Map<String, Value>>(arguments).is_ok()
}

fn complete_call(call: &mut CallBuffer, output: &mut Vec<OutputItem>, events: &mut Vec<EventKind>) {
    call.done = true;

    if !call.internal {
        events.push(EventKind::FunctionCallArgumentsDone {
            item_id: call.item_id.clone(),
            output_index: call.output_index,
            arguments: call.arguments.clone(),
        });
    }

    let item = OutputItem::FunctionCall(FunctionCallItem {
        id: Some(call.item_id.clone()),
        call_id: call.call_id.clone(),
        name: call.name.clone(),
        arguments: call.arguments.clone(),
        status: Some(ItemStatus::Completed),
    });

    events.push(EventKind::OutputItemDone {
        output_index: call.output_index,
        item: item.clone(),
    });

    if !output.iter().any(|existing| existing.function_call_id() == Some(&call.call_id)) {
        output.push(item);
    }
}

/// Precedence of finish reasons when several choices disagree
const fn severity(reason: FinishReason) -> u8 {
    match reason {
        FinishReason::ContentFilter => 3,
        FinishReason::Length => 2,
        FinishReason::ToolCalls | FinishReason::FunctionCall => 1,
        FinishReason::Stop | FinishReason::Other => 0,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axon_tools::{FnTool, Registry};
    use serde_json::json;

    use super::*;
    use crate::protocol::{ResponseStatus, ResponsesRequest};

    fn registry() -> Registry {
        Registry::new().with_native(Arc::new(FnTool::new(
            "get_weather",
            "Current weather",
            json!({"type": "object"}),
            |_| async { Ok("sunny".to_owned()) },
        )))
    }

    fn envelope() -> ResponseObject {
        let request: ResponsesRequest = serde_json::from_value(json!({"model": "gpt-4o", "input": "hi"})).unwrap();
        ResponseObject::in_progress("resp_1", 1, &request)
    }

    fn chunk(delta: Value, finish_reason: Option<&str>) -> ChatCompletionChunk {
        serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1,
            "model": "gpt-4o",
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
        }))
        .unwrap()
    }

    fn usage_chunk() -> ChatCompletionChunk {
        serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1,
            "model": "gpt-4o",
            "choices": [],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        }))
        .unwrap()
    }

    fn names(events: &[EventKind]) -> Vec<&'static str> {
        events.iter().map(EventKind::name).collect()
    }

    #[test]
    fn text_stream_completes_with_one_message() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);
        assert!(matches!(
            aggregator.created(),
            EventKind::Created { response } if response.status == ResponseStatus::InProgress
        ));

        let mut events = aggregator.ingest(&chunk(json!({"role": "assistant", "content": "Hi"}), None));
        events.extend(aggregator.ingest(&chunk(json!({"content": " there"}), None)));
        events.extend(aggregator.ingest(&chunk(json!({}), Some("stop"))));
        events.extend(aggregator.ingest(&usage_chunk()));
        let (tail, result) = aggregator.finish();

        assert!(tail.is_empty());
        assert_eq!(
            names(&events),
            [
                "response.in_progress",
                "response.output_item.added",
                "response.content_part.added",
                "response.output_text.delta",
                "response.output_text.delta",
                "response.output_text.done",
                "response.content_part.done",
                "response.output_item.done",
            ]
        );
        assert_eq!(result.end, IterationEnd::Completed);
        assert_eq!(result.output.len(), 1);
        let OutputItem::Message(message) = &result.output[0] else {
            panic!("expected message");
        };
        assert_eq!(message.text(), "Hi there");
        assert_eq!(result.usage.unwrap().total_tokens, 7);
        assert_eq!(result.next_index, 1);
    }

    #[test]
    fn in_progress_is_emitted_once() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        let first = aggregator.ingest(&chunk(json!({"content": "a"}), None));
        let second = aggregator.ingest(&chunk(json!({"content": "b"}), None));

        assert_eq!(first.iter().filter(|e| e.name() == "response.in_progress").count(), 1);
        assert!(second.iter().all(|e| e.name() != "response.in_progress"));
    }

    #[test]
    fn length_on_first_chunk_is_incomplete() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        let events = aggregator.ingest(&chunk(json!({"content": "Once upon"}), Some("length")));
        let (_, result) = aggregator.finish();

        assert!(events.iter().any(|e| e.name() == "response.output_text.done"));
        assert_eq!(result.end, IterationEnd::Incomplete(IncompleteReason::MaxOutputTokens));
        assert_eq!(result.output.len(), 1);
    }

    #[test]
    fn content_filter_is_incomplete() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        aggregator.ingest(&chunk(json!({}), Some("content_filter")));
        let (_, result) = aggregator.finish();

        assert_eq!(result.end, IterationEnd::Incomplete(IncompleteReason::ContentFilter));
        assert!(result.output.is_empty());
    }

    #[test]
    fn registered_call_with_complete_arguments_is_accumulated_immediately() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        let events = aggregator.ingest(&chunk(
            json!({"tool_calls": [{"index": 0, "id": "call_1", "type": "function",
                "function": {"name": "get_weather", "arguments": "{}"}}]}),
            None,
        ));

        assert_eq!(names(&events), ["response.in_progress", "response.output_item.added", "response.output_item.done"]);
        assert_eq!(aggregator.output.len(), 1);
        assert_eq!(aggregator.output[0].function_call_id(), Some("call_1"));

        let events = aggregator.ingest(&chunk(json!({}), Some("tool_calls")));
        assert!(events.is_empty());

        let (_, result) = aggregator.finish();
        let IterationEnd::ToolCalls(calls) = result.end else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments, "{}");
    }

    #[test]
    fn external_call_arguments_are_forwarded() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        let mut events = aggregator.ingest(&chunk(
            json!({"tool_calls": [{"index": 0, "id": "call_7", "function": {"name": "send_email", "arguments": ""}}]}),
            None,
        ));
        events.extend(aggregator.ingest(&chunk(
            json!({"tool_calls": [{"index": 0, "function": {"arguments": "{\"to\":"}}]}),
            None,
        )));
        events.extend(aggregator.ingest(&chunk(
            json!({"tool_calls": [{"index": 0, "function": {"arguments": "\"bob\"}"}}]}),
            None,
        )));

        assert_eq!(
            names(&events),
            [
                "response.in_progress",
                "response.output_item.added",
                "response.function_call_arguments.delta",
                "response.function_call_arguments.delta",
                "response.function_call_arguments.done",
                "response.output_item.done",
            ]
        );
        let EventKind::FunctionCallArgumentsDone { arguments, .. } = &events[4] else {
            panic!("expected arguments done");
        };
        assert_eq!(arguments, "{\"to\":\"bob\"}");

        aggregator.ingest(&chunk(json!({}), Some("tool_calls")));
        let (_, result) = aggregator.finish();

        // No internal call, so the caller resolves it
        assert_eq!(result.end, IterationEnd::Completed);
        assert_eq!(result.output.len(), 1);
    }

    #[test]
    fn internal_argument_deltas_are_suppressed() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        let mut events = aggregator.ingest(&chunk(
            json!({"tool_calls": [{"index": 0, "id": "call_1", "function": {"name": "get_weather", "arguments": "{\"ci"}}]}),
            None,
        ));
        events.extend(aggregator.ingest(&chunk(
            json!({"tool_calls": [{"index": 0, "function": {"arguments": "ty\":\"Paris\"}"}}]}),
            Some("tool_calls"),
        )));

        assert!(events.iter().all(|e| !matches!(
            e,
            EventKind::FunctionCallArgumentsDelta { .. } | EventKind::FunctionCallArgumentsDone { .. }
        )));
        let (_, result) = aggregator.finish();
        let IterationEnd::ToolCalls(calls) = result.end else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].arguments, "{\"city\":\"Paris\"}");
    }

    #[test]
    fn text_before_tool_calls_is_prepended() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        aggregator.ingest(&chunk(
            json!({"tool_calls": [{"index": 0, "id": "call_1", "function": {"name": "get_weather", "arguments": "{}"}}]}),
            None,
        ));
        aggregator.ingest(&chunk(json!({"content": "Checking the weather"}), None));
        let events = aggregator.ingest(&chunk(json!({}), Some("tool_calls")));
        let (_, result) = aggregator.finish();

        assert!(matches!(result.output[0], OutputItem::Message(_)));
        assert!(matches!(result.output[1], OutputItem::FunctionCall(_)));

        // The message keeps the index it was announced with
        let message_index = events.iter().find_map(|event| match event {
            EventKind::OutputItemDone {
                output_index,
                item: OutputItem::Message(_),
            } => Some(*output_index),
            _ => None,
        });
        assert_eq!(message_index, Some(1));
        assert_eq!(result.next_index, 2);
    }

    #[test]
    fn open_calls_close_when_the_choice_finishes() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        aggregator.ingest(&chunk(
            json!({"tool_calls": [{"index": 0, "id": "call_1", "function": {"name": "get_weather", "arguments": "{\"city\""}}]}),
            None,
        ));
        assert!(aggregator.output.is_empty());

        let events = aggregator.ingest(&chunk(json!({}), Some("tool_calls")));
        assert_eq!(names(&events), ["response.output_item.done"]);

        let (_, result) = aggregator.finish();
        assert!(matches!(result.end, IterationEnd::ToolCalls(_)));
    }

    #[test]
    fn duplicate_call_ids_are_appended_once() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        aggregator.ingest(&chunk(
            json!({"tool_calls": [
                {"index": 0, "id": "call_1", "function": {"name": "get_weather", "arguments": "{}"}},
                {"index": 1, "id": "call_1", "function": {"name": "get_weather", "arguments": "{}"}}
            ]}),
            Some("tool_calls"),
        ));
        let (_, result) = aggregator.finish();

        assert_eq!(result.output.len(), 1);
        assert_eq!(result.next_index, 2);
    }

    #[test]
    fn stream_without_finish_reason_is_stop() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        aggregator.ingest(&chunk(json!({"content": "cut short"}), None));
        let (tail, result) = aggregator.finish();

        assert_eq!(
            names(&tail),
            [
                "response.output_text.done",
                "response.content_part.done",
                "response.output_item.done",
            ]
        );
        assert_eq!(result.end, IterationEnd::Completed);
        assert_eq!(result.output.len(), 1);
    }

    #[test]
    fn indices_continue_after_previous_iterations() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 3);

        let events = aggregator.ingest(&chunk(json!({"content": "done"}), Some("stop")));

        assert!(matches!(events[1], EventKind::OutputItemAdded { output_index: 3, .. }));
        let (_, result) = aggregator.finish();
        assert_eq!(result.next_index, 4);
    }

    #[test]
    fn reasoning_deltas_become_a_reasoning_item() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        aggregator.ingest(&chunk(json!({"reasoning_content": "think "}), None));
        aggregator.ingest(&chunk(json!({"reasoning_content": "hard"}), None));
        aggregator.ingest(&chunk(json!({"content": "42"}), Some("stop")));
        let (_, result) = aggregator.finish();

        assert_eq!(result.output.len(), 2);
        let OutputItem::Reasoning(reasoning) = &result.output[0] else {
            panic!("expected reasoning");
        };
        assert_eq!(
            reasoning.content,
            [ReasoningContent::ReasoningText {
                text: "think hard".to_owned()
            }]
        );
    }

    #[test]
    fn abort_flushes_buffered_text() {
        let tools = registry();
        let mut aggregator = StreamAggregator::new(&tools, envelope(), 0);

        aggregator.ingest(&chunk(json!({"content": "partial"}), None));
        let events = aggregator.abort();

        let EventKind::OutputTextDone { text, .. } = &events[0] else {
            panic!("expected text done");
        };
        assert_eq!(text, "partial");
        assert_eq!(events.last().map(EventKind::name), Some("response.output_item.done"));
    }
}
