//! Plugin pipeline: input folding and output conversion.
//!
//! Input runs through every plugin in registration order. A plugin that
//! returns text replaces the current input; one that returns `None` leaves
//! it untouched. Whatever remains must be text.
//!
//! Output never alters the produced message. Each plugin may attach one
//! extra message, which is emitted right after the original, in plugin
//! order, tagged with the plugin's name and requested action.

use parlance_core::error::PluginError;
use parlance_core::message::Message;
use parlance_core::plugin::{OutputAction, Plugin};
use serde_json::Value;
use tracing::debug;

/// An extra message a plugin attached to a produced message.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginOutput {
    pub plugin: String,
    pub action: OutputAction,
    pub message: Message,
    pub add_to_history: bool,
}

#[derive(Default)]
pub struct PluginPipeline {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Fold raw input into prompt text.
    pub async fn convert_input(&self, input: Value) -> Result<String, PluginError> {
        let mut current = input;

        for plugin in &self.plugins {
            if let Some(text) = plugin.convert_input(&current).await? {
                debug!(plugin = %plugin.name(), "Input converted");
                current = Value::String(text);
            }
        }

        match current {
            Value::String(text) => Ok(text),
            other => Err(PluginError::UnconvertedInput {
                kind: json_kind(&other).to_string(),
            }),
        }
    }

    /// Collect the extra messages plugins attach to `message`.
    pub async fn convert_output(&self, message: &Message) -> Result<Vec<PluginOutput>, PluginError> {
        let mut outputs = Vec::new();

        for plugin in &self.plugins {
            let Some(converted) = plugin.convert_output(message).await? else {
                continue;
            };
            if converted.action == OutputAction::Continue {
                continue;
            }
            if let Some(extra) = converted.message {
                debug!(plugin = %plugin.name(), action = ?converted.action, "Output converted");
                outputs.push(PluginOutput {
                    plugin: plugin.name().to_string(),
                    action: converted.action,
                    message: extra,
                    add_to_history: converted.add_to_history,
                });
            }
        }

        Ok(outputs)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
