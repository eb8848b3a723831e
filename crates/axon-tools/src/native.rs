//! In-process tools

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolError;

/// A tool implemented inside the gateway process
#[async_trait]
pub trait NativeTool: Send + Sync {
    /// Function name the model calls
    fn name(&self) -> &str;

    /// Description advertised to the model
    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    /// Run the tool with parsed arguments, returning its textual output
    async fn call(&self, arguments: Value) -> Result<String, ToolError>;
}

type BoxedCall = Box<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send>> + Send + Sync>;

/// Native tool backed by an async closure
pub struct FnTool {
    name: String,
    description: String,
    parameters: Value,
    call: BoxedCall,
}

impl FnTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, parameters: Value, call: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            call: Box::new(move |arguments| Box::pin(call(arguments))),
        }
    }
}

#[async_trait]
impl NativeTool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        (self.call)(arguments).await
    }
}
