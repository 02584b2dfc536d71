//! Chat-completion endpoint clients for Parlance.
//!
//! Every client implements the `parlance_core::ChatModel` trait. The engine
//! only ever sees the trait, so tests can substitute scripted models.

pub mod chat_client;

pub use chat_client::{ChatClient, EndpointKind};
