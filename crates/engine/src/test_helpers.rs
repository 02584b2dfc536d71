//! Shared test helpers for engine tests.

use async_trait::async_trait;
use parlance_core::error::{FunctionError, ProviderError};
use parlance_core::function::{
    Function, FunctionConfig, FunctionDescriptor, FunctionResult, FunctionStore,
};
use parlance_core::message::{Message, ToolCall, Usage};
use parlance_core::model::ChatModel;
use serde_json::{Map, Value};
use std::sync::Mutex;

/// A model that returns a sequence of scripted replies.
///
/// Every request is recorded so tests can inspect what was sent.
/// Panics if more calls are made than replies provided.
pub struct ScriptedModel {
    replies: Mutex<Vec<Result<Message, ProviderError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<Message, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: Vec<Message>) -> Self {
        Self::new(replies.into_iter().map(Ok).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _functions: &[FunctionDescriptor],
    ) -> Result<Message, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(messages.to_vec());
            requests.len()
        };
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| panic!("ScriptedModel: no reply scripted for call #{call}"))
    }
}

/// An assistant text reply with usage attached, as the client returns it.
pub fn text_reply(text: &str) -> Message {
    let mut message = Message::assistant(text);
    message.usage = Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
    });
    message
}

/// An assistant reply that only requests tool calls.
pub fn tool_reply(calls: Vec<ToolCall>) -> Message {
    let mut message = Message::assistant("").with_tool_calls(calls);
    message.usage = Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 2,
    });
    message
}

pub fn tool_call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.to_string(),
    }
}

/// Records dishes into the store and asks the model to narrate the result.
pub struct AddDish;

#[async_trait]
impl Function for AddDish {
    fn name(&self) -> &str {
        "add-dish"
    }
    fn description(&self) -> &str {
        "Adds a dish"
    }
    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "dish": { "type": "string" } },
            "required": ["dish"]
        })
    }
    fn config(&self) -> FunctionConfig {
        FunctionConfig::interpreted()
    }
    async fn on_message(
        &self,
        arguments: Map<String, Value>,
        store: &FunctionStore,
    ) -> Result<FunctionResult, FunctionError> {
        let dish = arguments
            .get("dish")
            .and_then(Value::as_str)
            .ok_or_else(|| FunctionError::InvalidArguments {
                function_name: "add-dish".into(),
                reason: "missing dish".into(),
            })?
            .to_string();
        store.update("order", |order| {
            let mut dishes = order.as_array().cloned().unwrap_or_default();
            dishes.push(Value::String(dish.clone()));
            Value::Array(dishes)
        });
        Ok(FunctionResult::text(format!("{dish} added")))
    }
}

/// Returns a fixed menu and supplies its own follow-up messages.
pub struct Menu {
    pub follow_ups: Vec<FunctionResult>,
}

#[async_trait]
impl Function for Menu {
    fn name(&self) -> &str {
        "get-menu"
    }
    fn description(&self) -> &str {
        "Lists the menu"
    }
    fn parameters(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    async fn on_message(
        &self,
        _arguments: Map<String, Value>,
        _store: &FunctionStore,
    ) -> Result<FunctionResult, FunctionError> {
        Ok(FunctionResult::json(serde_json::json!(["chicken", "beef"])))
    }
    fn on_after_respond<'a>(
        &'a self,
        _store: &'a FunctionStore,
    ) -> futures::stream::BoxStream<'a, Result<FunctionResult, FunctionError>> {
        Box::pin(futures::stream::iter(self.follow_ups.clone().into_iter().map(Ok)))
    }
}

/// Always fails.
pub struct Faulty;

#[async_trait]
impl Function for Faulty {
    fn name(&self) -> &str {
        "faulty"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    async fn on_message(
        &self,
        _arguments: Map<String, Value>,
        _store: &FunctionStore,
    ) -> Result<FunctionResult, FunctionError> {
        Err(FunctionError::ExecutionFailed {
            function_name: "faulty".into(),
            reason: "kitchen closed".into(),
        })
    }
}
