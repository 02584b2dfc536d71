//! ChatModel trait: the abstraction over the remote chat-completion endpoint.
//!
//! A ChatModel takes the full wire message list plus the advertised functions
//! and returns the single assistant message the endpoint chose, with token
//! usage attached. It never dispatches tool calls itself; that is the
//! engine's job.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::function::FunctionDescriptor;
use crate::message::Message;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// A human-readable name for this model client (e.g., "openai", "azure").
    fn name(&self) -> &str;

    /// Send one completion request and decode the first choice.
    async fn complete(
        &self,
        messages: &[Message],
        functions: &[FunctionDescriptor],
    ) -> Result<Message, ProviderError>;
}
