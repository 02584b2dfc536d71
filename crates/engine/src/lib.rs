//! The conversation turn engine.
//!
//! One turn runs through these stages:
//!
//! 1. **Convert input** through the plugin pipeline into prompt text
//! 2. **Build the request**: rendered system prompt + history + user message
//! 3. **Invoke the model** through the configured [`ChatModel`]
//! 4. **Dispatch tool calls** one at a time, re-invoking the model for
//!    results it should interpret
//! 5. **Convert output** of every produced message through the plugins
//!
//! Each stage yields as soon as a message exists, so callers can render and
//! persist progress while the turn is still running.
//!
//! [`ChatModel`]: parlance_core::ChatModel

pub mod engine;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use engine::ChatEngine;
pub use pipeline::{PluginOutput, PluginPipeline};
pub use request::RequestBuilder;
pub use response::{Produced, ResponseSource, TurnError, TurnResponse, TurnSnapshot};
pub use template::HandlebarsTemplate;
