//! Gateway metric names and the instruments that record them
//!
//! Instruments come from the global meter, so they are no-ops until
//! [`crate::init`] installs an exporting meter provider.

use std::time::Instant;

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram};

pub const GATEWAY_REQUEST_DURATION: &str = "axon.gateway.request.duration";
pub const GATEWAY_ITERATIONS: &str = "axon.gateway.iterations";
pub const GATEWAY_TOOL_CALLS: &str = "axon.gateway.tool_calls";
pub const UPSTREAM_TOKEN_USAGE: &str = "axon.upstream.token.usage";

/// How a single tool call was resolved by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallOutcome {
    Executed,
    Failed,
    Parked,
}

impl ToolCallOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::Parked => "parked",
        }
    }
}

/// Instruments recorded by the response loop
#[derive(Clone)]
pub struct GatewayMetrics {
    duration: Histogram<f64>,
    iterations: Counter<u64>,
    tool_calls: Counter<u64>,
    tokens: Counter<u64>,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        let meter = opentelemetry::global::meter("axon");

        Self {
            duration: meter
                .f64_histogram(GATEWAY_REQUEST_DURATION)
                .with_unit("s")
                .with_description("Wall-clock time of one logical response, across iterations")
                .build(),
            iterations: meter
                .u64_counter(GATEWAY_ITERATIONS)
                .with_description("Provider round trips made by the tool loop")
                .build(),
            tool_calls: meter
                .u64_counter(GATEWAY_TOOL_CALLS)
                .with_description("Tool calls seen by the orchestrator")
                .build(),
            tokens: meter
                .u64_counter(UPSTREAM_TOKEN_USAGE)
                .with_description("Tokens reported by the upstream provider")
                .build(),
        }
    }

    pub fn record_iteration(&self, streaming: bool) {
        self.iterations.add(1, &[KeyValue::new("streaming", streaming)]);
    }

    pub fn record_tool_call(&self, outcome: ToolCallOutcome) {
        self.tool_calls.add(1, &[KeyValue::new("outcome", outcome.as_str())]);
    }

    pub fn record_tokens(&self, input: u64, output: u64) {
        self.tokens.add(input, &[KeyValue::new("direction", "input")]);
        self.tokens.add(output, &[KeyValue::new("direction", "output")]);
    }

    /// Record the duration of a finished response with its terminal status
    pub fn record_duration(&self, start: Instant, status: &'static str) {
        self.duration
            .record(start.elapsed().as_secs_f64(), &[KeyValue::new("status", status)]);
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
