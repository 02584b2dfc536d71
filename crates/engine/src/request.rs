//! Assembles the message list sent to the model for a turn.

use std::sync::Arc;

use parlance_core::error::Result;
use parlance_core::message::Message;
use parlance_core::template::{PassthroughTemplate, TemplateEngine};

/// Builds wire message lists from a prompt template and history.
///
/// The output depends only on the inputs: messages carry no generated ids or
/// timestamps, so building twice yields identical lists.
#[derive(Clone)]
pub struct RequestBuilder {
    system_prompt: String,
    template: Arc<dyn TemplateEngine>,
}

impl RequestBuilder {
    pub fn new(system_prompt: impl Into<String>, template: Arc<dyn TemplateEngine>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            template,
        }
    }

    /// A builder that sends the system prompt verbatim.
    pub fn passthrough(system_prompt: impl Into<String>) -> Self {
        Self::new(system_prompt, Arc::new(PassthroughTemplate))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the messages for one request.
    ///
    /// Returns the new user message separately (when `prompt` is given) so the
    /// caller can record it before anything goes over the network.
    pub fn build(
        &self,
        prompt: Option<&str>,
        history: &[Message],
    ) -> Result<(Option<Message>, Vec<Message>)> {
        let system = Message::system(self.template.render(&self.system_prompt)?);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(system);
        messages.extend(history.iter().map(Message::without_usage));

        let user = prompt.map(Message::user);
        if let Some(user) = &user {
            messages.push(user.clone());
        }

        Ok((user, messages))
    }
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("system_prompt", &self.system_prompt)
            .finish_non_exhaustive()
    }
}
