//! Mock chat-completion backend for integration tests
//!
//! Replies are scripted: each completion request takes the next reply from
//! the queue, and an empty queue falls back to a plain text answer. The same
//! reply is rendered as JSON or as an SSE stream depending on the request's
//! `stream` flag.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

const DEFAULT_CONTENT: &str = "Hello from mock LLM";

/// One scripted provider reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Assistant text, finished with `stop`
    Text(String),
    /// Assistant text cut off with `length`
    Truncated(String),
    /// Function calls as `(call_id, name, arguments)`, finished with `tool_calls`
    ToolCalls(Vec<(String, String, String)>),
    /// Non-2xx response with an `OpenAI` error body
    Error(StatusCode),
}

impl MockReply {
    pub fn text(content: &str) -> Self {
        Self::Text(content.to_owned())
    }

    pub fn tool_call(call_id: &str, name: &str, arguments: &str) -> Self {
        Self::ToolCalls(vec![(call_id.to_owned(), name.to_owned(), arguments.to_owned())])
    }
}

/// Mock backend serving `/v1/chat/completions`
pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockLlmState>,
}

struct MockLlmState {
    completion_count: AtomicU32,
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<serde_json::Value>>,
}

impl MockLlm {
    /// Start a mock that answers every request with the default text
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_scripted(Vec::new()).await
    }

    /// Start a mock that plays `replies` in order
    pub async fn start_scripted(replies: Vec<MockReply>) -> anyhow::Result<Self> {
        let state = Arc::new(MockLlmState {
            completion_count: AtomicU32::new(0),
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as the upstream
    ///
    /// Includes `/v1` since the provider appends `/chat/completions`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of completion requests received
    pub fn completion_count(&self) -> u32 {
        self.state.completion_count.load(Ordering::Relaxed)
    }

    /// Raw bodies of the completion requests received so far
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Wire types matching the chat completions format --

#[derive(Debug, Serialize)]
struct ChatCompletionResponse {
    id: &'static str,
    object: &'static str,
    created: u64,
    model: String,
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Debug, Serialize)]
struct Choice {
    index: u32,
    message: ResponseMessage,
    finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
struct ResponseMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallResponse>>,
}

#[derive(Debug, Serialize)]
struct ToolCallResponse {
    id: String,
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: FunctionCallResponse,
}

#[derive(Debug, Serialize)]
struct FunctionCallResponse {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

const USAGE: Usage = Usage {
    prompt_tokens: 10,
    completion_tokens: 5,
    total_tokens: 15,
};

// -- Stream chunk types --

#[derive(Debug, Serialize)]
struct StreamChunk {
    id: &'static str,
    object: &'static str,
    created: u64,
    model: String,
    choices: Vec<StreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<Usage>,
}

#[derive(Debug, Serialize)]
struct StreamChoice {
    index: u32,
    delta: StreamDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    finish_reason: Option<&'static str>,
}

#[derive(Debug, Default, Serialize)]
struct StreamDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Debug, Serialize)]
struct StreamToolCall {
    index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    tool_type: Option<&'static str>,
    function: StreamFunctionCall,
}

#[derive(Debug, Serialize)]
struct StreamFunctionCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    arguments: String,
}

// -- Handler --

async fn handle_chat_completions(
    State(state): State<Arc<MockLlmState>>,
    Json(request): Json<serde_json::Value>,
) -> Response {
    state.completion_count.fetch_add(1, Ordering::Relaxed);
    state.requests.lock().unwrap().push(request.clone());

    let reply = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| MockReply::text(DEFAULT_CONTENT));

    let model = request["model"].as_str().unwrap_or("mock-model").to_owned();
    let stream = request["stream"].as_bool().unwrap_or(false);

    if let MockReply::Error(status) = reply {
        return (
            status,
            Json(serde_json::json!({
                "error": {
                    "message": "mock server intentional failure",
                    "type": "server_error",
                    "code": "mock_failure"
                }
            })),
        )
            .into_response();
    }

    if stream {
        streaming_response(&reply, model).into_response()
    } else {
        Json(completion(reply, model)).into_response()
    }
}

fn completion(reply: MockReply, model: String) -> ChatCompletionResponse {
    let (content, tool_calls, finish_reason) = match reply {
        MockReply::Text(text) => (Some(text), None, "stop"),
        MockReply::Truncated(text) => (Some(text), None, "length"),
        MockReply::ToolCalls(calls) => (
            None,
            Some(
                calls
                    .into_iter()
                    .map(|(id, name, arguments)| ToolCallResponse {
                        id,
                        tool_type: "function",
                        function: FunctionCallResponse { name, arguments },
                    })
                    .collect(),
            ),
            "tool_calls",
        ),
        MockReply::Error(_) => unreachable!("errors are answered before rendering"),
    };

    ChatCompletionResponse {
        id: "chatcmpl-test-123",
        object: "chat.completion",
        created: 1_700_000_000,
        model,
        choices: vec![Choice {
            index: 0,
            message: ResponseMessage {
                role: "assistant",
                content,
                tool_calls,
            },
            finish_reason,
        }],
        usage: USAGE,
    }
}

/// Build an SSE streaming response body
fn streaming_response(reply: &MockReply, model: String) -> impl IntoResponse {
    let chunk = |delta: StreamDelta, finish_reason: Option<&'static str>| StreamChunk {
        id: "chatcmpl-test-stream",
        object: "chat.completion.chunk",
        created: 1_700_000_000,
        model: model.clone(),
        choices: vec![StreamChoice {
            index: 0,
            delta,
            finish_reason,
        }],
        usage: None,
    };

    let mut chunks = vec![chunk(
        StreamDelta {
            role: Some("assistant"),
            ..StreamDelta::default()
        },
        None,
    )];

    let finish_reason = match reply {
        MockReply::Text(text) | MockReply::Truncated(text) => {
            for word in text.split_inclusive(' ') {
                chunks.push(chunk(
                    StreamDelta {
                        content: Some(word.to_owned()),
                        ..StreamDelta::default()
                    },
                    None,
                ));
            }
            if matches!(reply, MockReply::Truncated(_)) { "length" } else { "stop" }
        }
        MockReply::ToolCalls(calls) => {
            for (index, (id, name, arguments)) in (0_u32..).zip(calls) {
                // Name first, then the arguments in two fragments
                let (head, tail) = arguments.split_at(arguments.len() / 2);
                chunks.push(chunk(
                    StreamDelta {
                        tool_calls: Some(vec![StreamToolCall {
                            index,
                            id: Some(id.clone()),
                            tool_type: Some("function"),
                            function: StreamFunctionCall {
                                name: Some(name.clone()),
                                arguments: head.to_owned(),
                            },
                        }]),
                        ..StreamDelta::default()
                    },
                    None,
                ));
                chunks.push(chunk(
                    StreamDelta {
                        tool_calls: Some(vec![StreamToolCall {
                            index,
                            id: None,
                            tool_type: None,
                            function: StreamFunctionCall {
                                name: None,
                                arguments: tail.to_owned(),
                            },
                        }]),
                        ..StreamDelta::default()
                    },
                    None,
                ));
            }
            "tool_calls"
        }
        MockReply::Error(_) => unreachable!("errors are answered before rendering"),
    };

    chunks.push(chunk(StreamDelta::default(), Some(finish_reason)));

    // Usage chunk
    chunks.push(StreamChunk {
        choices: Vec::new(),
        usage: Some(USAGE),
        ..chunk(StreamDelta::default(), None)
    });

    let mut body = String::new();
    for chunk in &chunks {
        let _ = write!(body, "data: {}\n\n", serde_json::to_string(chunk).unwrap());
    }
    body.push_str("data: [DONE]\n\n");

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
        body,
    )
}
