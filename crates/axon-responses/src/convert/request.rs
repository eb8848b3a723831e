//! Response request -> chat completion request

use axon_llm::protocol::chat::{
    ChatCompletionRequest, ChatContent, ChatContentPart, ChatFunction, ChatMessage, ChatTool, ChatToolCall,
    ChatFunctionCall, FileRef, ImageUrl, JsonSchemaFormat, ResponseFormat, StreamOptions,
};
use serde_json::{Value, json};

use crate::error::ResponsesError;
use crate::protocol::{
    ContentPart, InputItem, MessageContent, MessageItem, ResponseInput, ResponsesRequest, Role, TextFormat, ToolChoice,
    ToolChoiceMode, ToolDeclaration,
};

/// Build the provider request for one iteration
pub fn to_chat_request(request: &ResponsesRequest, stream: bool) -> Result<ChatCompletionRequest, ResponsesError> {
    let messages = match &request.input {
        ResponseInput::Text(text) => {
            let mut messages = Vec::with_capacity(2);
            if let Some(instructions) = &request.instructions {
                messages.push(ChatMessage::text("system", instructions));
            }
            messages.push(ChatMessage::text("user", text.as_str()));
            messages
        }
        ResponseInput::Items(items) => convert_items(items, request.instructions.as_deref())?,
        ResponseInput::Other(_) => {
            return Err(ResponsesError::invalid("input must be a string or a list of items"));
        }
    };

    let tools = match &request.tools {
        Some(tools) if !tools.is_empty() => Some(tools.iter().map(convert_tool).collect::<Result<Vec<_>, _>>()?),
        _ => None,
    };

    let tool_choice = request.tool_choice.as_ref().map(convert_tool_choice).transpose()?;

    let response_format = request
        .text
        .as_ref()
        .and_then(|text| text.format.as_ref())
        .map(convert_text_format);

    Ok(ChatCompletionRequest {
        model: request.model.clone(),
        messages,
        temperature: request.temperature,
        top_p: request.top_p,
        max_tokens: request.max_output_tokens,
        stream: stream.then_some(true),
        stream_options: stream.then_some(StreamOptions { include_usage: true }),
        tools,
        tool_choice,
        parallel_tool_calls: request.parallel_tool_calls,
        response_format,
        reasoning_effort: request.reasoning.as_ref().and_then(|r| r.effort.clone()),
        user: request.user.clone(),
    })
}

/// Add function declarations for tools the gateway can run itself
pub fn advertise_tools(chat: &mut ChatCompletionRequest, handles: &[axon_tools::ToolHandle]) {
    if handles.is_empty() {
        return;
    }

    let tools = chat.tools.get_or_insert_with(Vec::new);
    for handle in handles {
        if tools.iter().any(|tool| tool.function.name == handle.name) {
            continue;
        }
        tools.push(function_tool(
            &handle.name,
            Some(handle.description.clone()),
            Some(handle.parameters.clone()),
            None,
        ));
    }
}

fn convert_items(items: &[InputItem], instructions: Option<&str>) -> Result<Vec<ChatMessage>, ResponsesError> {
    if let Some(position) = items
        .iter()
        .skip(1)
        .position(|item| item.role().is_some_and(Role::is_instruction))
    {
        return Err(ResponsesError::invalid(format!(
            "system and developer messages must be the first input item, found one at index {}",
            position + 1
        )));
    }

    let mut messages = Vec::with_capacity(items.len() + 1);

    let has_instruction_message = items
        .first()
        .and_then(InputItem::role)
        .is_some_and(Role::is_instruction);

    if !has_instruction_message && let Some(instructions) = instructions {
        messages.push(ChatMessage::text("system", instructions));
    }

    for item in items {
        match item {
            InputItem::Message(message) | InputItem::BareMessage(message) => messages.push(convert_message(message)?),
            InputItem::FunctionCall(call) => messages.push(ChatMessage {
                role: "assistant".to_owned(),
                content: None,
                tool_calls: Some(vec![ChatToolCall {
                    id: call.call_id.clone(),
                    tool_type: "function".to_owned(),
                    function: ChatFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                }]),
                tool_call_id: None,
            }),
            InputItem::FunctionCallOutput(output) => messages.push(ChatMessage {
                role: "tool".to_owned(),
                content: Some(ChatContent::Text(output.output.clone())),
                tool_calls: None,
                tool_call_id: Some(output.call_id.clone()),
            }),
            InputItem::Reasoning(_) => {}
        }
    }

    Ok(messages)
}

fn convert_message(message: &MessageItem) -> Result<ChatMessage, ResponsesError> {
    match message.role {
        Role::User => Ok(ChatMessage {
            role: "user".to_owned(),
            content: Some(convert_content(&message.content)?),
            tool_calls: None,
            tool_call_id: None,
        }),
        Role::Assistant => Ok(ChatMessage::text("assistant", flatten_text(&message.content))),
        // Developer instructions travel as the provider's system role
        Role::System | Role::Developer => Ok(ChatMessage::text("system", flatten_text(&message.content))),
        Role::Tool => {
            let call_id = message
                .id
                .clone()
                .ok_or_else(|| ResponsesError::invalid("tool messages require an id naming the tool call"))?;

            Ok(ChatMessage {
                role: "tool".to_owned(),
                content: Some(ChatContent::Text(flatten_text(&message.content))),
                tool_calls: None,
                tool_call_id: Some(call_id),
            })
        }
    }
}

fn convert_content(content: &MessageContent) -> Result<ChatContent, ResponsesError> {
    match content {
        MessageContent::Text(text) => Ok(ChatContent::Text(text.clone())),
        MessageContent::Parts(parts) => parts
            .iter()
            .map(convert_part)
            .collect::<Result<Vec<_>, _>>()
            .map(ChatContent::Parts),
    }
}

fn convert_part(part: &ContentPart) -> Result<ChatContentPart, ResponsesError> {
    match part {
        ContentPart::InputText { text } | ContentPart::OutputText { text, .. } => {
            Ok(ChatContentPart::Text { text: text.clone() })
        }
        ContentPart::Refusal { refusal } => Ok(ChatContentPart::Text { text: refusal.clone() }),
        ContentPart::InputImage {
            image_url: Some(url),
            detail,
            ..
        } => Ok(ChatContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.clone(),
                detail: detail.clone(),
            },
        }),
        ContentPart::InputImage {
            image_url: None,
            file_id: Some(file_id),
            ..
        } => Ok(ChatContentPart::File {
            file: FileRef {
                file_id: Some(file_id.clone()),
                file_data: None,
                filename: None,
            },
        }),
        ContentPart::InputImage { .. } => Err(ResponsesError::invalid("input_image requires image_url or file_id")),
        ContentPart::InputFile {
            file_id,
            file_data,
            filename,
        } => Ok(ChatContentPart::File {
            file: FileRef {
                file_id: file_id.clone(),
                file_data: file_data.clone(),
                filename: filename.clone(),
            },
        }),
    }
}

fn flatten_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts.iter().filter_map(ContentPart::text).collect(),
    }
}

fn convert_tool(tool: &ToolDeclaration) -> Result<ChatTool, ResponsesError> {
    match tool {
        ToolDeclaration::Function(function) => Ok(function_tool(
            &function.name,
            function.description.clone(),
            function.parameters.clone(),
            function.strict,
        )),
        ToolDeclaration::WebSearch(_) | ToolDeclaration::WebSearchPreview(_) => Ok(hosted_tool(
            "web_search",
            "Search the web for current information",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string", "description": "Search query"}},
                "required": ["query"]
            }),
        )),
        ToolDeclaration::FileSearch(_) => Ok(hosted_tool(
            "file_search",
            "Search the caller's uploaded files",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string", "description": "Search query"}},
                "required": ["query"]
            }),
        )),
        ToolDeclaration::ComputerUsePreview(_) => Ok(hosted_tool(
            "computer_use_preview",
            "Perform an action on the caller's computer",
            json!({
                "type": "object",
                "properties": {"action": {"type": "object", "description": "Action to perform"}},
                "required": ["action"]
            }),
        )),
        ToolDeclaration::Unsupported => Err(ResponsesError::invalid("unsupported tool type")),
    }
}

fn hosted_tool(name: &str, description: &str, parameters: Value) -> ChatTool {
    function_tool(name, Some(description.to_owned()), Some(parameters), None)
}

fn function_tool(
    name: &str,
    description: Option<String>,
    parameters: Option<Value>,
    strict: Option<bool>,
) -> ChatTool {
    ChatTool {
        tool_type: "function".to_owned(),
        function: ChatFunction {
            name: name.to_owned(),
            description,
            parameters,
            strict,
        },
    }
}

fn convert_tool_choice(choice: &ToolChoice) -> Result<Value, ResponsesError> {
    match choice {
        ToolChoice::Mode(mode) => Ok(json!(match mode {
            ToolChoiceMode::None => "none",
            ToolChoiceMode::Auto => "auto",
            ToolChoiceMode::Required => "required",
        })),
        ToolChoice::Named(named) if named.choice_type == "function" => Ok(json!({
            "type": "function",
            "function": {"name": named.name},
        })),
        ToolChoice::Named(named) => Err(ResponsesError::invalid(format!(
            "unsupported tool_choice type: {}",
            named.choice_type
        ))),
        ToolChoice::Other(_) => Err(ResponsesError::invalid("unsupported tool_choice")),
    }
}

fn convert_text_format(format: &TextFormat) -> ResponseFormat {
    match format {
        TextFormat::Text => ResponseFormat::Text,
        TextFormat::JsonObject => ResponseFormat::JsonObject,
        TextFormat::JsonSchema {
            name,
            schema,
            description,
            strict,
        } => ResponseFormat::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: name.clone(),
                description: description.clone(),
                schema: schema.clone(),
                strict: *strict,
            },
        },
    }
}
