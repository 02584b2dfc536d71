//! Message and history domain types.
//!
//! These are the value objects that flow through the entire system:
//! the caller's history goes into a request, the model answers with an
//! assistant message, functions answer with tool messages, and everything
//! that is not excluded comes back to the caller as the updated history.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (rendered prompt template)
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Function result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage reported by the model for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }

    /// Sum the usage of every message in a history.
    pub fn accumulate<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Usage {
        messages
            .into_iter()
            .filter_map(|m| m.usage)
            .fold(Usage::default(), |acc, u| Usage {
                prompt_tokens: acc.prompt_tokens.saturating_add(u.prompt_tokens),
                completion_tokens: acc.completion_tokens.saturating_add(u.completion_tokens),
            })
    }
}

/// Controls whether a message is persisted into history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Surface the message to the caller but never append it to history.
    pub exclude_from_history: bool,
}

impl HistoryConfig {
    pub fn excluded() -> Self {
        Self {
            exclude_from_history: true,
        }
    }
}

/// A tool call requested by the model inside an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this call within one assistant response
    pub id: String,

    /// Name of the function to invoke
    pub name: String,

    /// Arguments as JSON text, exactly as the model produced them
    pub arguments: String,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content (may be empty when only tool calls are present)
    #[serde(default)]
    pub content: String,

    /// Function identity for tool messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Token usage, only on assistant messages returned by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Never serialized: history inclusion is decided at the time a message
    /// is produced, and persisted history only holds included messages.
    #[serde(skip)]
    pub history: HistoryConfig,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            usage: None,
            tool_calls: Vec::new(),
            history: HistoryConfig::default(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        function_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(function_name.into()),
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    pub fn is_excluded(&self) -> bool {
        self.history.exclude_from_history
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// A copy of this message with usage stripped, as it must be resent.
    pub fn without_usage(&self) -> Self {
        Self {
            usage: None,
            ..self.clone()
        }
    }

    /// Check the invariants a single message must satisfy on its own.
    pub fn validate(&self) -> Result<()> {
        match self.violation() {
            Some(reason) => Err(Error::InvalidMessage(reason)),
            None => Ok(()),
        }
    }

    fn violation(&self) -> Option<String> {
        if self.has_tool_calls() && self.role != Role::Assistant {
            return Some(format!(
                "{} message carries tool calls; only assistant messages may",
                self.role
            ));
        }
        if self.role == Role::Tool && self.tool_call_id.is_none() {
            return Some("tool message is missing its tool_call_id".into());
        }
        for (index, call) in self.tool_calls.iter().enumerate() {
            if self.tool_calls[..index].iter().any(|c| c.id == call.id) {
                return Some(format!("tool call id {} appears more than once", call.id));
            }
        }
        None
    }
}

/// Check history-level invariants: every tool message answers exactly one
/// tool call issued earlier in the same history.
pub fn validate_history(history: &[Message]) -> Result<()> {
    let mut issued: HashMap<&str, usize> = HashMap::new();

    for (index, message) in history.iter().enumerate() {
        if let Some(reason) = message.violation() {
            return Err(Error::InvalidMessage(format!("history[{index}]: {reason}")));
        }

        for call in &message.tool_calls {
            *issued.entry(call.id.as_str()).or_default() += 1;
        }

        if let Some(id) = message.tool_call_id.as_deref().filter(|_| message.role == Role::Tool) {
            match issued.get(id) {
                Some(1) => {}
                Some(n) => {
                    return Err(Error::InvalidMessage(format!(
                        "history[{index}]: tool_call_id {id} matches {n} earlier tool calls"
                    )));
                }
                None => {
                    return Err(Error::InvalidMessage(format!(
                        "history[{index}]: tool_call_id {id} has no earlier tool call"
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "get-menu".into(),
            arguments: "{}".into(),
        }
    }

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello!");
        assert!(msg.tool_calls.is_empty());
        assert!(!msg.is_excluded());
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn history_flag_is_not_serialized() {
        let msg = Message::assistant("note").with_history(HistoryConfig::excluded());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("exclude"));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert!(!back.is_excluded());
    }

    #[test]
    fn without_usage_strips_only_usage() {
        let mut msg = Message::assistant("answer");
        msg.usage = Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
        });
        let cleaned = msg.without_usage();
        assert!(cleaned.usage.is_none());
        assert_eq!(cleaned.content, "answer");
        assert!(msg.usage.is_some());
    }

    #[test]
    fn usage_accumulates_over_history() {
        let mut first = Message::assistant("a");
        first.usage = Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
        });
        let mut second = Message::assistant("b");
        second.usage = Some(Usage {
            prompt_tokens: 20,
            completion_tokens: 7,
        });
        let history = vec![Message::user("q"), first, second];

        let total = Usage::accumulate(&history);
        assert_eq!(total.prompt_tokens, 30);
        assert_eq!(total.completion_tokens, 12);
        assert_eq!(total.total(), 42);
    }

    #[test]
    fn tool_calls_on_user_message_are_invalid() {
        let msg = Message::user("hi").with_tool_calls(vec![call("call_1")]);
        assert!(matches!(msg.validate(), Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn valid_history_passes() {
        let history = vec![
            Message::user("menu?"),
            Message::assistant("").with_tool_calls(vec![call("call_1")]),
            Message::tool_result("call_1", "get-menu", "1. rice"),
            Message::assistant("We have rice."),
        ];
        assert!(validate_history(&history).is_ok());
    }

    #[test]
    fn orphan_tool_message_is_rejected() {
        let history = vec![
            Message::user("menu?"),
            Message::tool_result("call_9", "get-menu", "1. rice"),
        ];
        let err = validate_history(&history).unwrap_err();
        assert!(err.to_string().contains("call_9"));
    }

    #[test]
    fn ambiguous_tool_call_id_is_rejected() {
        let history = vec![
            Message::assistant("").with_tool_calls(vec![call("dup")]),
            Message::assistant("").with_tool_calls(vec![call("dup")]),
            Message::tool_result("dup", "get-menu", "x"),
        ];
        assert!(validate_history(&history).is_err());
    }

    #[test]
    fn usage_saturates_instead_of_overflowing() {
        let mut first = Message::assistant("a");
        first.usage = Some(Usage {
            prompt_tokens: u32::MAX,
            completion_tokens: 1,
        });
        let mut second = Message::assistant("b");
        second.usage = Some(Usage {
            prompt_tokens: 5,
            completion_tokens: 2,
        });

        let total = Usage::accumulate([&first, &second]);
        assert_eq!(total.prompt_tokens, u32::MAX);
        assert_eq!(total.completion_tokens, 3);
        assert_eq!(total.total(), u32::MAX);
    }

    #[test]
    fn repeated_call_id_in_one_message_is_invalid() {
        let msg = Message::assistant("").with_tool_calls(vec![call("dup"), call("dup")]);
        let err = msg.validate().unwrap_err();
        assert!(err.to_string().contains("dup appears more than once"));
    }

    #[test]
    fn history_errors_name_the_index_once() {
        let history = vec![
            Message::user("hi"),
            Message::user("again").with_tool_calls(vec![call("call_1")]),
        ];
        let err = validate_history(&history).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid message: history[1]: user message carries tool calls; only assistant messages may"
        );
    }
}
