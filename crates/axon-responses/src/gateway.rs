//! The response loop
//!
//! [`Gateway`] turns one Responses request into one or more chat completion
//! calls. After each provider call the [`ToolOrchestrator`] runs the calls
//! the gateway can execute itself and decides whether another iteration is
//! needed. Both entry points share the same limits: a cap on function calls
//! in the conversation, a wall-clock budget for the whole loop and a
//! timeout on each synchronous provider call.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axon_config::{Config, GatewayConfig};
use axon_core::{HttpError, RequestContext};
use axon_llm::protocol::chat::{ChatCompletionChunk, ChatCompletionRequest};
use axon_llm::provider::openai::OpenAiProvider;
use axon_llm::{ChunkStream, LlmError, Provider};
use axon_telemetry::GatewayMetrics;
use axon_tools::ToolRegistry;
use futures_util::{Stream, StreamExt, stream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::aggregator::{IterationEnd, IterationResult, StreamAggregator};
use crate::convert::{advertise_tools, to_chat_request, to_envelope};
use crate::error::ResponsesError;
use crate::ids;
use crate::orchestrator::ToolOrchestrator;
use crate::protocol::{
    EventKind, IncompleteDetails, InputItem, OutputItem, ResponseInput, ResponseObject, ResponseStatus, ResponseUsage,
    ResponsesRequest, Role, StreamEvent,
};
use crate::store::{InMemoryStore, ResponseStore};

const EVENT_BUFFER: usize = 64;
const CHUNK_BUFFER: usize = 32;

/// Caller-facing events of one streamed response
pub type ResponseEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Limits shared by the synchronous and streaming loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayLimits {
    /// Maximum function calls in the conversation before the loop fails
    pub max_tool_calls: usize,
    /// Budget for the whole loop, checked before every iteration
    pub max_duration: Duration,
    /// Timeout for each synchronous provider call
    pub request_timeout: Duration,
}

impl Default for GatewayLimits {
    fn default() -> Self {
        Self {
            max_tool_calls: 10,
            max_duration: Duration::from_millis(60_000),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayLimits {
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        Ok(Self {
            max_tool_calls: config.max_tool_calls,
            max_duration: config.max_duration()?,
            request_timeout: config.request_timeout()?,
        })
    }
}

struct GatewayInner {
    provider: Arc<dyn Provider>,
    orchestrator: ToolOrchestrator,
    registry: Arc<dyn ToolRegistry>,
    limits: GatewayLimits,
    store: Option<Arc<dyn ResponseStore>>,
    metrics: GatewayMetrics,
    advertise: bool,
}

/// Responses gateway over one chat completion provider
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

/// Builder for [`Gateway`]
pub struct GatewayBuilder {
    provider: Arc<dyn Provider>,
    registry: Arc<dyn ToolRegistry>,
    limits: GatewayLimits,
    store: Option<Arc<dyn ResponseStore>>,
    advertise: bool,
}

impl GatewayBuilder {
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn ToolRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn limits(mut self, limits: GatewayLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn ResponseStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Declare registered tools to the provider when the caller did not
    #[must_use]
    pub fn advertise_tools(mut self, advertise: bool) -> Self {
        self.advertise = advertise;
        self
    }

    pub fn build(self) -> Gateway {
        let metrics = GatewayMetrics::new();

        Gateway {
            inner: Arc::new(GatewayInner {
                orchestrator: ToolOrchestrator::new(self.registry.clone(), self.limits.max_tool_calls, metrics.clone()),
                provider: self.provider,
                registry: self.registry,
                limits: self.limits,
                store: self.store,
                metrics,
                advertise: self.advertise,
            }),
        }
    }
}

impl Gateway {
    pub fn builder(provider: Arc<dyn Provider>) -> GatewayBuilder {
        GatewayBuilder {
            provider,
            registry: Arc::new(axon_tools::Registry::new()),
            limits: GatewayLimits::default(),
            store: None,
            advertise: false,
        }
    }

    /// Build a gateway for the configured upstream, executing `registry`'s tools
    pub fn from_config(config: &Config, registry: Arc<dyn ToolRegistry>) -> anyhow::Result<Self> {
        let provider = OpenAiProvider::new("openai", &config.upstream)?;

        let mut builder = Self::builder(Arc::new(provider))
            .registry(registry)
            .limits(GatewayLimits::from_config(&config.gateway)?)
            .advertise_tools(config.gateway.advertise_registered_tools);

        if config.store.enabled {
            builder = builder.store(Arc::new(InMemoryStore::new(config.store.max_entries)));
        }

        Ok(builder.build())
    }

    pub fn store(&self) -> Option<&Arc<dyn ResponseStore>> {
        self.inner.store.as_ref()
    }

    pub fn limits(&self) -> GatewayLimits {
        self.inner.limits
    }

    /// Run the loop to completion and return the final envelope
    pub async fn respond(
        &self,
        request: ResponsesRequest,
        context: &RequestContext,
    ) -> Result<ResponseObject, ResponsesError> {
        let start = Instant::now();
        let result = self.run(request, context, start).await;

        let status = match &result {
            Ok(response) => response.status.as_str(),
            Err(_) => "error",
        };
        self.inner.metrics.record_duration(start, status);

        result
    }

    async fn run(
        &self,
        request: ResponsesRequest,
        context: &RequestContext,
        start: Instant,
    ) -> Result<ResponseObject, ResponsesError> {
        let inner = &self.inner;
        let request = inner.prepare(request).await?;

        let response_id = ids::response_id();
        let created_at = ids::now();
        let mut current = request.clone();
        let mut carried: Vec<OutputItem> = Vec::new();
        let mut usage: Option<ResponseUsage> = None;

        loop {
            inner.check_budget(start)?;

            let chat = inner.chat_request(&current, false)?;
            inner.metrics.record_iteration(false);

            let completion = tokio::time::timeout(inner.limits.request_timeout, inner.provider.complete(&chat, context))
                .await
                .map_err(|_| ResponsesError::Timeout(inner.limits.request_timeout))??;

            let mut envelope = to_envelope(&completion, &request, &response_id, created_at);
            inner.add_usage(&mut usage, envelope.usage);

            let calls: Vec<_> = envelope.function_calls().cloned().collect();
            let resolution = if envelope.status == ResponseStatus::Completed && !calls.is_empty() {
                Some(inner.orchestrator.resolve(&calls, conversation(&current)?).await?)
            } else {
                None
            };

            match resolution {
                Some(resolution) if resolution.recurse => {
                    tracing::debug!(
                        response_id = %response_id,
                        executed = resolution.executed.len(),
                        "tool calls resolved, continuing"
                    );
                    carried.append(&mut envelope.output);
                    carried.extend(resolution.executed);
                    current.input = ResponseInput::Items(resolution.input);
                }
                resolution => {
                    carried.append(&mut envelope.output);
                    carried.extend(resolution.into_iter().flat_map(|r| r.executed));
                    envelope.output = carried;
                    envelope.usage = usage;

                    inner.save(&request, &envelope).await;
                    return Ok(envelope);
                }
            }
        }
    }

    /// Start a streamed response
    ///
    /// The request is validated before anything is sent, so conversion
    /// failures surface as errors rather than stream events. Dropping the
    /// returned stream cancels the provider stream.
    pub async fn respond_stream(
        &self,
        request: ResponsesRequest,
        context: RequestContext,
    ) -> Result<ResponseEventStream, ResponsesError> {
        let request = self.inner.prepare(request).await?;
        to_chat_request(&request, true)?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        let session = StreamSession {
            inner: self.inner.clone(),
            request,
            context,
            emitter: Emitter { tx, sequence: 0 },
            cancel: cancel.clone(),
        };
        tokio::spawn(session.run());

        let events = stream::unfold((rx, cancel.drop_guard()), |(mut rx, guard)| async move {
            rx.recv().await.map(|event| (event, (rx, guard)))
        });

        Ok(Box::pin(events))
    }
}

impl GatewayInner {
    /// Splice a stored conversation in front of the new input
    ///
    /// A leading system or developer message in the new input stays first
    /// and replaces the one the stored conversation opened with.
    async fn prepare(&self, mut request: ResponsesRequest) -> Result<ResponsesRequest, ResponsesError> {
        let Some(previous) = request.previous_response_id.clone() else {
            return Ok(request);
        };

        let store = self.store.as_ref().ok_or(ResponsesError::StoreDisabled)?;
        let (Some(mut history), Some(output)) = (store.input_items(&previous).await, store.output_items(&previous).await)
        else {
            return Err(ResponsesError::NotFound(previous));
        };
        history.extend(output.into_iter().map(InputItem::from));

        let mut input = conversation(&request)?;
        let mut items = Vec::with_capacity(history.len() + input.len());
        if input.first().is_some_and(is_instruction) {
            if history.first().is_some_and(is_instruction) {
                history.remove(0);
            }
            items.push(input.remove(0));
        }
        items.extend(history);
        items.extend(input);
        request.input = ResponseInput::Items(items);

        Ok(request)
    }

    fn check_budget(&self, start: Instant) -> Result<(), ResponsesError> {
        if start.elapsed() >= self.limits.max_duration {
            return Err(ResponsesError::Timeout(self.limits.max_duration));
        }
        Ok(())
    }

    fn chat_request(&self, request: &ResponsesRequest, stream: bool) -> Result<ChatCompletionRequest, ResponsesError> {
        let mut chat = to_chat_request(request, stream)?;
        if self.advertise {
            advertise_tools(&mut chat, &self.registry.handles());
        }
        Ok(chat)
    }

    fn add_usage(&self, total: &mut Option<ResponseUsage>, usage: Option<ResponseUsage>) {
        let Some(usage) = usage else { return };

        self.metrics
            .record_tokens(u64::from(usage.input_tokens), u64::from(usage.output_tokens));
        total.get_or_insert_with(ResponseUsage::default).accumulate(&usage);
    }

    async fn save(&self, request: &ResponsesRequest, response: &ResponseObject) {
        if !request.should_store() {
            return;
        }

        let Some(store) = &self.store else {
            tracing::debug!(response_id = %response.id, "store requested but no response store is configured");
            return;
        };

        let input = request.input.clone().into_items().unwrap_or_default();
        store.save(response, &input).await;
    }
}

fn conversation(request: &ResponsesRequest) -> Result<Vec<InputItem>, ResponsesError> {
    request
        .input
        .clone()
        .into_items()
        .ok_or_else(|| ResponsesError::invalid("input must be a string or an array of items"))
}

fn is_instruction(item: &InputItem) -> bool {
    item.role().is_some_and(Role::is_instruction)
}

struct Emitter {
    tx: mpsc::Sender<StreamEvent>,
    sequence: u64,
}

impl Emitter {
    async fn emit(&mut self, kind: EventKind) -> Result<(), ResponsesError> {
        let event = StreamEvent {
            sequence_number: self.sequence,
            kind,
        };
        self.sequence += 1;

        self.tx.send(event).await.map_err(|_| ResponsesError::Disconnected)
    }

    async fn emit_all(&mut self, kinds: Vec<EventKind>) -> Result<(), ResponsesError> {
        for kind in kinds {
            self.emit(kind).await?;
        }
        Ok(())
    }
}

struct StreamSession {
    inner: Arc<GatewayInner>,
    request: ResponsesRequest,
    context: RequestContext,
    emitter: Emitter,
    cancel: CancellationToken,
}

impl StreamSession {
    async fn run(mut self) {
        let start = Instant::now();
        let result = self.drive(start).await;

        let status = match &result {
            Ok(status) => status.as_str(),
            Err(_) => "error",
        };
        self.inner.metrics.record_duration(start, status);

        match result {
            Ok(_) | Err(ResponsesError::Disconnected) => {
                tracing::debug!("response stream ended");
            }
            Err(e) => {
                tracing::warn!(error = %e, "streamed response failed");

                let error = EventKind::Error {
                    code: e.event_code(),
                    message: e.client_message(),
                };
                if self.emitter.emit(error).await.is_err() {
                    tracing::debug!("client disconnected before the error event");
                }
            }
        }
    }

    async fn drive(&mut self, start: Instant) -> Result<ResponseStatus, ResponsesError> {
        let inner = self.inner.clone();
        let request = &self.request;

        let response_id = ids::response_id();
        let created_at = ids::now();
        let mut current = request.clone();
        let mut carried: Vec<OutputItem> = Vec::new();
        let mut usage: Option<ResponseUsage> = None;
        let mut next_index = 0;
        let mut first = true;

        loop {
            inner.check_budget(start)?;

            let chat = inner.chat_request(&current, true)?;
            inner.metrics.record_iteration(true);

            let envelope = ResponseObject::in_progress(&response_id, created_at, request);
            let mut aggregator = StreamAggregator::new(inner.registry.as_ref(), envelope.clone(), next_index);
            if first {
                first = false;
                self.emitter.emit(aggregator.created()).await?;
            }

            let upstream = inner.provider.complete_stream(&chat, &self.context).await?;
            let mut chunks = pump(upstream, self.cancel.child_token());

            while let Some(chunk) = chunks.recv().await {
                match chunk {
                    Ok(chunk) => self.emitter.emit_all(aggregator.ingest(&chunk)).await?,
                    Err(e) => {
                        self.emitter.emit_all(aggregator.abort()).await?;
                        return Err(e.into());
                    }
                }
            }

            let (events, result) = aggregator.finish();
            self.emitter.emit_all(events).await?;

            let IterationResult {
                mut output,
                usage: iteration_usage,
                next_index: after,
                end,
            } = result;
            inner.add_usage(&mut usage, iteration_usage);
            next_index = after;

            let mut envelope = envelope;
            match end {
                IterationEnd::Completed => envelope.status = ResponseStatus::Completed,
                IterationEnd::Incomplete(reason) => {
                    envelope.status = ResponseStatus::Incomplete;
                    envelope.incomplete_details = Some(IncompleteDetails { reason });
                }
                IterationEnd::ToolCalls(calls) => {
                    let resolution = inner.orchestrator.resolve(&calls, conversation(&current)?).await?;

                    for item in &resolution.executed {
                        self.emitter
                            .emit(EventKind::OutputItemAdded {
                                output_index: next_index,
                                item: item.clone(),
                            })
                            .await?;
                        self.emitter
                            .emit(EventKind::OutputItemDone {
                                output_index: next_index,
                                item: item.clone(),
                            })
                            .await?;
                        next_index += 1;
                    }

                    if resolution.recurse {
                        tracing::debug!(
                            response_id = %response_id,
                            executed = resolution.executed.len(),
                            "tool calls resolved, continuing stream"
                        );
                        carried.append(&mut output);
                        carried.extend(resolution.executed);
                        current.input = ResponseInput::Items(resolution.input);
                        continue;
                    }

                    output.extend(resolution.executed);
                    envelope.status = ResponseStatus::Completed;
                }
            }

            carried.append(&mut output);
            envelope.output = carried;
            envelope.usage = usage;

            let status = envelope.status;
            self.emitter.emit(EventKind::terminal(envelope.clone())).await?;
            inner.save(request, &envelope).await;

            return Ok(status);
        }
    }
}

/// Forward provider chunks into a bounded channel until the stream ends,
/// the consumer goes away or `cancel` fires
fn pump(
    mut upstream: ChunkStream,
    cancel: CancellationToken,
) -> mpsc::Receiver<Result<ChatCompletionChunk, LlmError>> {
    let (tx, rx) = mpsc::channel(CHUNK_BUFFER);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("provider stream cancelled");
                    break;
                }
                next = upstream.next() => {
                    let Some(chunk) = next else { break };
                    if tx.send(chunk).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    rx
}
