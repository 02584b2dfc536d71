//! The turn engine: model invocation, function dispatch, and assembly.
//!
//! Everything here is a pull-based stream. Nothing runs until the caller
//! polls, each message is complete before it is yielded, and dropping a
//! stream stops all further model calls and function hooks.

use std::sync::Arc;

use async_stream::try_stream;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use parlance_core::error::{Error, FunctionError, ProviderError, Result};
use parlance_core::function::FunctionRegistry;
use parlance_core::message::{Message, Role, ToolCall, validate_history};
use parlance_core::model::ChatModel;
use parlance_core::plugin::Plugin;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::pipeline::{PluginPipeline, json_kind};
use crate::request::RequestBuilder;
use crate::response::{Produced, ResponseSource, TurnError, TurnResponse, TurnSnapshot};

/// Default bound on model re-invocations caused by interpreted function results.
pub const DEFAULT_MAX_DEPTH: u32 = 8;

/// Drives conversation turns against one model with one set of functions.
pub struct ChatEngine {
    /// The chat-completion endpoint
    model: Arc<dyn ChatModel>,

    /// Functions the model may call, plus their shared store
    functions: FunctionRegistry,

    /// System prompt and history assembly
    requests: RequestBuilder,

    /// Input and output converters, in registration order
    plugins: PluginPipeline,

    /// Maximum nested re-invocations per turn
    max_depth: u32,
}

impl ChatEngine {
    pub fn new(
        model: Arc<dyn ChatModel>,
        functions: FunctionRegistry,
        requests: RequestBuilder,
    ) -> Self {
        Self {
            model,
            functions,
            requests,
            plugins: PluginPipeline::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Append a plugin to the pipeline.
    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Set the maximum number of nested model re-invocations per turn.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn plugins(&self) -> &PluginPipeline {
        &self.plugins
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Call the model once with `messages`, then dispatch its tool calls.
    ///
    /// Yields the assistant reply and its plugin extras, followed by every
    /// message its tool calls produce. `depth` counts how many interpreted
    /// results led here.
    pub fn invoke(&self, messages: Vec<Message>, depth: u32) -> BoxStream<'_, Result<Produced>> {
        Box::pin(self.invoke_stream(messages, depth))
    }

    fn invoke_stream(
        &self,
        messages: Vec<Message>,
        depth: u32,
    ) -> impl Stream<Item = Result<Produced>> + Send + '_ {
        try_stream! {
            if depth > self.max_depth {
                warn!(depth, limit = self.max_depth, "Model re-invocation limit reached");
                Err::<(), Error>(Error::MaxDepthExceeded { limit: self.max_depth })?;
            }

            debug!(
                model = %self.model.name(),
                depth,
                messages = messages.len(),
                "Invoking model"
            );
            let reply = self
                .model
                .complete(&messages, &self.functions.descriptors())
                .await?;
            check_reply(&reply)?;

            let mut rolling = messages;
            let assistant = reply.clone();
            for produced in self.expand(reply).await? {
                if produced.persist {
                    rolling.push(produced.message.without_usage());
                }
                yield produced;
            }

            let mut dispatched = self.dispatch(assistant, rolling, depth);
            while let Some(produced) = dispatched.next().await {
                yield produced?;
            }
        }
    }

    /// Run the tool calls of `assistant` strictly in order.
    ///
    /// `history` is the rolling history up to and including `assistant`. A
    /// failure ends the stream; messages already yielded stay yielded.
    pub fn dispatch(
        &self,
        assistant: Message,
        history: Vec<Message>,
        depth: u32,
    ) -> BoxStream<'_, Result<Produced>> {
        Box::pin(self.dispatch_stream(assistant, history, depth))
    }

    fn dispatch_stream(
        &self,
        assistant: Message,
        history: Vec<Message>,
        depth: u32,
    ) -> impl Stream<Item = Result<Produced>> + Send + '_ {
        try_stream! {
            let mut history = history;

            for call in assistant.tool_calls {
                let function = self
                    .functions
                    .find(&call.name)
                    .ok_or_else(|| FunctionError::NotFound(call.name.clone()))?;
                let arguments = parse_arguments(&call)?;

                debug!(function = %call.name, call_id = %call.id, "Dispatching tool call");
                let result = function.on_message(arguments, self.functions.store()).await?;

                let tool_message =
                    Message::tool_result(call.id.as_str(), call.name.as_str(), result.content_text())
                        .with_history(result.history);
                for produced in self.expand(tool_message).await? {
                    if produced.persist {
                        history.push(produced.message.clone());
                    }
                    yield produced;
                }

                if function.config().use_model_to_interpret_response {
                    let mut interpreted = self.invoke(history.clone(), depth + 1);
                    while let Some(produced) = interpreted.next().await {
                        let produced = produced?;
                        if produced.persist {
                            history.push(produced.message.without_usage());
                        }
                        yield produced;
                    }
                } else {
                    let mut follow_ups = function.on_after_respond(self.functions.store());
                    while let Some(result) = follow_ups.next().await {
                        let result = result?;
                        let message = Message::assistant(result.content_text())
                            .with_history(result.history);
                        for produced in self.expand(message).await? {
                            if produced.persist {
                                history.push(produced.message.clone());
                            }
                            yield produced;
                        }
                    }
                }
            }
        }
    }

    /// A produced message followed by the extras plugins attach to it.
    async fn expand(&self, message: Message) -> Result<Vec<Produced>> {
        let extras = self.plugins.convert_output(&message).await?;

        let mut produced = Vec::with_capacity(extras.len() + 1);
        produced.push(Produced {
            persist: !message.is_excluded(),
            message,
            source: ResponseSource::Conversation,
        });
        produced.extend(extras.into_iter().map(|extra| Produced {
            message: extra.message,
            source: ResponseSource::Plugin {
                plugin: extra.plugin,
                action: extra.action,
            },
            persist: extra.add_to_history,
        }));
        Ok(produced)
    }

    /// Run one turn, yielding a snapshot for every produced message.
    ///
    /// When `input` is given, the first snapshot carries no new responses
    /// and a history ending with the new user message, so the caller can
    /// persist it before the model is called.
    pub fn generate_stream(
        &self,
        input: Option<Value>,
        history: Vec<Message>,
    ) -> BoxStream<'_, Result<TurnSnapshot>> {
        Box::pin(self.turn_stream(input, history))
    }

    fn turn_stream(
        &self,
        input: Option<Value>,
        history: Vec<Message>,
    ) -> impl Stream<Item = Result<TurnSnapshot>> + Send + '_ {
        try_stream! {
            validate_history(&history)?;

            let prompt = match input {
                Some(raw) => Some(self.plugins.convert_input(raw).await?),
                None => None,
            };
            let (user, messages) = self.requests.build(prompt.as_deref(), &history)?;

            info!(history = history.len(), prompt = user.is_some(), "Starting turn");
            let mut full_history = history;

            if let Some(user) = user {
                full_history.push(user);
                yield TurnSnapshot {
                    new_responses: Vec::new(),
                    full_history: full_history.clone(),
                    source: ResponseSource::Conversation,
                };
            }

            let mut produced = self.invoke(messages, 0);
            let mut count = 0usize;
            while let Some(item) = produced.next().await {
                let Produced { message, source, persist } = item?;
                count += 1;

                let new_responses = visible(&message);
                if persist {
                    full_history.push(message);
                }
                yield TurnSnapshot {
                    new_responses,
                    full_history: full_history.clone(),
                    source,
                };
            }

            info!(produced = count, history = full_history.len(), "Turn complete");
        }
    }

    /// Run one turn to completion.
    ///
    /// On failure the error carries everything produced before it.
    pub async fn generate(
        &self,
        input: Option<Value>,
        history: Vec<Message>,
    ) -> std::result::Result<TurnResponse, TurnError> {
        let mut response = TurnResponse {
            new_responses: Vec::new(),
            full_history: history.clone(),
        };

        let mut snapshots = self.generate_stream(input, history);
        while let Some(snapshot) = snapshots.next().await {
            match snapshot {
                Ok(snapshot) => response.absorb(snapshot),
                Err(source) => {
                    warn!(error = %source, "Turn failed");
                    return Err(TurnError {
                        source,
                        partial: response,
                    });
                }
            }
        }

        Ok(response)
    }

    /// Close every registered function.
    pub async fn close(&self) -> Result<()> {
        Ok(self.functions.close().await?)
    }
}

/// A model reply must be a well-formed assistant message before any of it
/// is yielded or dispatched.
fn check_reply(reply: &Message) -> std::result::Result<(), ProviderError> {
    let reason = if reply.role != Role::Assistant {
        Some(format!("expected an assistant reply, got a {} message", reply.role))
    } else {
        match reply.validate() {
            Ok(()) => None,
            Err(Error::InvalidMessage(reason)) => Some(reason),
            Err(other) => Some(other.to_string()),
        }
    };

    match reason {
        Some(reason) => {
            warn!(%reason, "Rejecting model reply");
            Err(ProviderError::MalformedResponse {
                reason,
                body: serde_json::to_string(reply).unwrap_or_default(),
            })
        }
        None => Ok(()),
    }
}

/// User messages are never reported as new responses.
fn visible(message: &Message) -> Vec<Message> {
    if message.role == Role::User {
        Vec::new()
    } else {
        vec![message.clone()]
    }
}

/// Parse tool-call arguments into a JSON object. Blank text means no arguments.
fn parse_arguments(call: &ToolCall) -> std::result::Result<Map<String, Value>, FunctionError> {
    let text = call.arguments.trim();
    if text.is_empty() {
        return Ok(Map::new());
    }

    let invalid = |reason: String| FunctionError::InvalidArguments {
        function_name: call.name.clone(),
        reason,
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(other) => Err(invalid(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(invalid(e.to_string())),
    }
}
