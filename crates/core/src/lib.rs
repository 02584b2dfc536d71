//! # Parlance Core
//!
//! Domain types, collaborator traits, and error definitions for the Parlance
//! conversation engine. This crate carries no HTTP or runtime dependencies; it
//! defines the model that the client, the engine, and application code all
//! build against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the engine talks to is a trait here:
//! - [`ChatModel`]: the remote chat-completion endpoint
//! - [`Function`]: an application-defined capability the model may call
//! - [`Plugin`]: an input/output converter around each turn
//! - [`TemplateEngine`]: renders the system prompt
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted stand-ins without touching the network.

pub mod error;
pub mod function;
pub mod message;
pub mod model;
pub mod plugin;
pub mod template;

// Re-export key types at crate root for ergonomics
pub use error::{
    Error, FailureKind, FunctionError, PluginError, ProviderError, Result, TemplateError,
};
pub use function::{
    Function, FunctionConfig, FunctionDescriptor, FunctionRegistry, FunctionResult, FunctionStore,
    coerce_content,
};
pub use message::{HistoryConfig, Message, Role, ToolCall, Usage, validate_history};
pub use model::ChatModel;
pub use plugin::{ConvertedResponse, OutputAction, Plugin, StandardPlugin};
pub use template::{PassthroughTemplate, TemplateEngine};
