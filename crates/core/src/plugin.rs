//! Plugin trait: converters around each turn.
//!
//! Input converters run before anything is sent (voice transcription, text
//! normalization). Output converters see every produced message and may emit
//! extra messages next to it (text-to-speech receipts, translations).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PluginError;
use crate::message::Message;

/// What a plugin wants done with the message it converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputAction {
    /// Leave the output unchanged; any attached message is ignored.
    #[default]
    Continue,
    /// The attached message stands in for the original.
    Replace,
    /// The attached message belongs before the original.
    AddBefore,
    /// The attached message belongs after the original.
    AddAfter,
}

/// A plugin's answer to a produced message.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedResponse {
    pub action: OutputAction,
    pub message: Option<Message>,
    /// Whether the attached message joins the returned history.
    pub add_to_history: bool,
}

impl ConvertedResponse {
    pub fn pass() -> Self {
        Self {
            action: OutputAction::Continue,
            message: None,
            add_to_history: false,
        }
    }

    pub fn emit(action: OutputAction, message: Message) -> Self {
        Self {
            action,
            message: Some(message),
            add_to_history: false,
        }
    }

    pub fn with_history(mut self, add_to_history: bool) -> Self {
        self.add_to_history = add_to_history;
        self
    }
}

/// The core Plugin trait.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Convert raw input into prompt text. `None` leaves the input as the
    /// previous plugin (or the caller) supplied it.
    async fn convert_input(&self, _input: &Value) -> Result<Option<String>, PluginError> {
        Ok(None)
    }

    /// Convert a produced message. `None` has no effect on the output.
    async fn convert_output(
        &self,
        _message: &Message,
    ) -> Result<Option<ConvertedResponse>, PluginError> {
        Ok(None)
    }
}

/// Default plugin: text input passes through, output continues unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPlugin;

#[async_trait]
impl Plugin for StandardPlugin {
    fn name(&self) -> &str {
        "standard"
    }

    fn description(&self) -> &str {
        "Default plugin. Will return the output as is."
    }

    async fn convert_input(&self, input: &Value) -> Result<Option<String>, PluginError> {
        Ok(input.as_str().map(str::to_string))
    }

    async fn convert_output(
        &self,
        _message: &Message,
    ) -> Result<Option<ConvertedResponse>, PluginError> {
        Ok(Some(ConvertedResponse::pass()))
    }
}
