//! What a turn hands back to the caller.

use parlance_core::error::Error;
use parlance_core::message::Message;
use parlance_core::plugin::OutputAction;

/// Where a snapshot's new message came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseSource {
    /// The model, a function, or the user's own message.
    Conversation,
    /// An extra message attached by an output plugin.
    Plugin { plugin: String, action: OutputAction },
}

/// A message produced during a turn, before it is applied to history.
#[derive(Debug, Clone, PartialEq)]
pub struct Produced {
    pub message: Message,
    pub source: ResponseSource,
    /// Whether the message joins the history.
    pub persist: bool,
}

/// One step of a streaming turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSnapshot {
    /// Zero or one message produced by this step.
    pub new_responses: Vec<Message>,
    /// The history as it stands after this step.
    pub full_history: Vec<Message>,
    pub source: ResponseSource,
}

/// The result of a completed turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnResponse {
    /// Every message produced this turn, in order. Never includes user messages.
    pub new_responses: Vec<Message>,
    /// The caller's history with this turn's persisted messages appended.
    pub full_history: Vec<Message>,
}

impl TurnResponse {
    /// Content of the last produced message, if any.
    pub fn reply(&self) -> Option<&str> {
        self.new_responses.last().map(|m| m.content.as_str())
    }

    pub(crate) fn absorb(&mut self, snapshot: TurnSnapshot) {
        self.new_responses.extend(snapshot.new_responses);
        self.full_history = snapshot.full_history;
    }
}

/// A failed turn, with everything produced before the failure.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct TurnError {
    #[source]
    pub source: Error,
    pub partial: TurnResponse,
}
