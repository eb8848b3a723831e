//! Tool-call resolution between gateway iterations

use std::sync::Arc;

use axon_telemetry::{GatewayMetrics, ToolCallOutcome};
use axon_tools::ToolRegistry;

use crate::error::ResponsesError;
use crate::ids;
use crate::protocol::{FunctionCallItem, FunctionCallOutputItem, InputItem, ItemStatus, OutputItem};

/// Result of resolving one iteration's function calls
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Conversation with resolved calls and outputs appended, parked calls last
    pub input: Vec<InputItem>,
    /// Outputs of the calls executed in this pass
    pub executed: Vec<OutputItem>,
    /// Whether another provider iteration should run
    pub recurse: bool,
}

/// Executes registered tools and parks the rest
pub struct ToolOrchestrator {
    registry: Arc<dyn ToolRegistry>,
    max_tool_calls: usize,
    metrics: GatewayMetrics,
}

impl ToolOrchestrator {
    pub fn new(registry: Arc<dyn ToolRegistry>, max_tool_calls: usize, metrics: GatewayMetrics) -> Self {
        Self {
            registry,
            max_tool_calls,
            metrics,
        }
    }

    pub fn registry(&self) -> &dyn ToolRegistry {
        self.registry.as_ref()
    }

    /// Resolve `calls` against the conversation in `input`
    ///
    /// Calls run one at a time in provider order. A failing tool yields an
    /// `execution failed` output instead of an error. Recursion stops when
    /// any call is left without an output; otherwise the conversation may
    /// not hold more function calls than the configured maximum.
    pub async fn resolve(
        &self,
        calls: &[FunctionCallItem],
        mut input: Vec<InputItem>,
    ) -> Result<Resolution, ResponsesError> {
        let mut parked = Vec::new();
        let mut executed = Vec::new();

        for call in calls {
            if self.registry.lookup(&call.name).is_none() {
                tracing::debug!(tool = %call.name, call_id = %call.call_id, "parking call to unregistered tool");
                self.metrics.record_tool_call(ToolCallOutcome::Parked);
                parked.push(InputItem::FunctionCall(completed(call)));
                continue;
            }

            let output = match self.registry.execute(&call.name, &call.arguments).await {
                Ok(output) => {
                    self.metrics.record_tool_call(ToolCallOutcome::Executed);
                    output
                }
                Err(e) => {
                    tracing::warn!(tool = %call.name, call_id = %call.call_id, error = %e, "tool execution failed");
                    self.metrics.record_tool_call(ToolCallOutcome::Failed);
                    format!("execution failed: {e}")
                }
            };

            let output = FunctionCallOutputItem {
                id: Some(ids::function_output_id()),
                call_id: call.call_id.clone(),
                output,
            };

            input.push(InputItem::FunctionCall(completed(call)));
            input.push(InputItem::FunctionCallOutput(output.clone()));
            executed.push(OutputItem::FunctionCallOutput(output));
        }

        input.extend(parked);

        let call_count = input.iter().filter(|item| item.is_function_call()).count();
        let output_count = input.iter().filter(|item| item.is_function_call_output()).count();

        if call_count > output_count {
            return Ok(Resolution {
                input,
                executed,
                recurse: false,
            });
        }

        if call_count > self.max_tool_calls {
            return Err(ResponsesError::TooManyToolCalls {
                limit: self.max_tool_calls,
                count: call_count,
            });
        }

        Ok(Resolution {
            input,
            executed,
            recurse: true,
        })
    }
}

fn completed(call: &FunctionCallItem) -> FunctionCallItem {
    FunctionCallItem {
        status: Some(ItemStatus::Completed),
        ..call.clone()
    }
}
