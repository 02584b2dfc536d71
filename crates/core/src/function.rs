//! Function trait: the abstraction over application-defined capabilities.
//!
//! Functions are what the model can ask the application to do: look up a
//! menu, add a dish to an order, complete a purchase. Each one advertises a
//! JSON schema for its arguments and decides whether the model should narrate
//! its result or whether it authors its own follow-up messages.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

use crate::error::FunctionError;
use crate::message::HistoryConfig;

/// A function definition advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the function's parameters
    pub parameters: Value,
}

/// How the engine treats a function's result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Send the result back to the model so it can interpret it. When false,
    /// the function's after-respond hook supplies the follow-up instead.
    #[serde(default)]
    pub use_model_to_interpret_response: bool,
}

impl FunctionConfig {
    pub fn interpreted() -> Self {
        Self {
            use_model_to_interpret_response: true,
        }
    }
}

/// The payload a function hands back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResult {
    pub content: Value,
    pub history: HistoryConfig,
}

impl FunctionResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self::json(Value::String(content.into()))
    }

    pub fn json(content: Value) -> Self {
        Self {
            content,
            history: HistoryConfig::default(),
        }
    }

    /// Surface this result to the caller without persisting it.
    pub fn excluded(mut self) -> Self {
        self.history = HistoryConfig::excluded();
        self
    }

    pub fn content_text(&self) -> String {
        coerce_content(&self.content)
    }
}

/// Turn a function payload into message content.
///
/// Strings pass through unchanged; every other value becomes its compact
/// JSON text (`null`, `123`, `{"a":1}`).
pub fn coerce_content(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Shared key/value state handed to every function hook.
///
/// One store belongs to one registry. It is meant for cross-call state within
/// a session (the current order, a chat room id) and is not designed for
/// concurrent turns.
#[derive(Debug, Default)]
pub struct FunctionStore {
    values: RwLock<HashMap<String, Value>>,
}

impl FunctionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Apply `f` to the value under `key` (null when absent) and store the result.
    pub fn update(&self, key: &str, f: impl FnOnce(Value) -> Value) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        let current = values.remove(key).unwrap_or(Value::Null);
        values.insert(key.to_string(), f(current));
    }
}

/// The core Function trait.
///
/// Lifecycle: `on_init` once when the registry is built, `on_message` for
/// every matching tool call, `on_after_respond` after a result that the model
/// does not interpret, and `on_close` when the registry shuts down.
#[async_trait]
pub trait Function: Send + Sync {
    /// The unique name of this function (matched against tool calls).
    fn name(&self) -> &str;

    /// A description of what this function does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this function's parameters.
    fn parameters(&self) -> Value;

    fn config(&self) -> FunctionConfig {
        FunctionConfig::default()
    }

    async fn on_init(&self, _store: &FunctionStore) -> Result<(), FunctionError> {
        Ok(())
    }

    /// Execute the function with the arguments the model supplied.
    async fn on_message(
        &self,
        arguments: serde_json::Map<String, Value>,
        store: &FunctionStore,
    ) -> Result<FunctionResult, FunctionError>;

    /// Follow-up messages authored by the function itself, produced lazily.
    fn on_after_respond<'a>(
        &'a self,
        _store: &'a FunctionStore,
    ) -> BoxStream<'a, Result<FunctionResult, FunctionError>> {
        futures::stream::empty().boxed()
    }

    async fn on_close(&self, _store: &FunctionStore) -> Result<(), FunctionError> {
        Ok(())
    }

    /// Convert this function into a descriptor for sending to the model.
    fn descriptor(&self) -> FunctionDescriptor {
        FunctionDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// An ordered registry of functions plus the store they share.
///
/// Lookup is a linear name match in registration order; registries are
/// expected to hold tens of functions at most.
pub struct FunctionRegistry {
    functions: Vec<Box<dyn Function>>,
    store: FunctionStore,
}

impl FunctionRegistry {
    /// A registry with no functions; the model is sent no tools.
    pub fn empty() -> Self {
        Self {
            functions: Vec::new(),
            store: FunctionStore::new(),
        }
    }

    /// Build a registry, running every `on_init` in registration order.
    ///
    /// Any init failure or a duplicated name aborts construction.
    pub async fn initialize(
        functions: Vec<Box<dyn Function>>,
        store: FunctionStore,
    ) -> Result<Self, FunctionError> {
        for (index, function) in functions.iter().enumerate() {
            if functions[..index].iter().any(|f| f.name() == function.name()) {
                return Err(FunctionError::Init {
                    function_name: function.name().to_string(),
                    reason: "a function with this name is already registered".into(),
                });
            }
            function.on_init(&store).await?;
            debug!(function = %function.name(), "Function initialized");
        }

        Ok(Self { functions, store })
    }

    /// Get a function by name.
    pub fn find(&self, name: &str) -> Option<&dyn Function> {
        self.functions
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }

    /// Get all descriptors (for sending to the model).
    pub fn descriptors(&self) -> Vec<FunctionDescriptor> {
        self.functions.iter().map(|f| f.descriptor()).collect()
    }

    pub fn store(&self) -> &FunctionStore {
        &self.store
    }

    /// List all registered function names.
    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Run every `on_close`. All functions are closed even when one fails;
    /// the first failure is returned.
    pub async fn close(&self) -> Result<(), FunctionError> {
        let mut first_error = None;
        for function in &self.functions {
            if let Err(e) = function.on_close(&self.store).await {
                warn!(function = %function.name(), error = %e, "Function failed to close");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
