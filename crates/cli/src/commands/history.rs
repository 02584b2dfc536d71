//! Conversation history persistence as a pretty-printed JSON array.

use std::error::Error;
use std::path::Path;

use parlance_core::message::{Message, validate_history};

/// Load a saved conversation. A missing file is an empty conversation.
pub fn load(path: &Path) -> Result<Vec<Message>, Box<dyn Error>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read history {}: {e}", path.display()))?;
    let history: Vec<Message> = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse history {}: {e}", path.display()))?;
    validate_history(&history)?;

    tracing::debug!(path = %path.display(), messages = history.len(), "History loaded");
    Ok(history)
}

pub fn save(path: &Path, history: &[Message]) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(history)?;
    std::fs::write(path, json)
        .map_err(|e| format!("Failed to write history {}: {e}", path.display()))?;
    Ok(())
}
