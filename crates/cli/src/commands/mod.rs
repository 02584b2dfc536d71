//! Subcommand implementations and the wiring they share.

pub mod ask;
pub mod chat;
pub mod config_cmd;
pub mod history;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use parlance_config::AppConfig;
use parlance_core::function::{FunctionRegistry, FunctionStore};
use parlance_core::message::{Message, Role};
use parlance_engine::{ChatEngine, HandlebarsTemplate, RequestBuilder};
use parlance_providers::ChatClient;

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path, |key| std::env::var(key).ok()),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(config)
}

/// Wire the HTTP client, the demo functions, and the prompt template together.
pub async fn build_engine(config: &AppConfig) -> Result<ChatEngine, Box<dyn Error>> {
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set PARLANCE_API_KEY or OPENAI_API_KEY, or add `api_key` to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let client = ChatClient::from_config(config)?;
    let functions =
        FunctionRegistry::initialize(parlance_functions::demo_functions(), FunctionStore::new())
            .await?;
    let template = HandlebarsTemplate::new(config.prompt_variables.clone());
    let requests = RequestBuilder::new(config.system_prompt.clone(), Arc::new(template));

    Ok(ChatEngine::new(Arc::new(client), functions, requests).with_max_depth(config.max_depth))
}

/// One display line for a produced message.
pub fn describe(message: &Message) -> String {
    match message.role {
        Role::Tool => format!(
            "function call {}: {}",
            message.name.as_deref().unwrap_or("?"),
            message.content
        ),
        _ if message.content.is_empty() && message.has_tool_calls() => {
            let names: Vec<&str> = message.tool_calls.iter().map(|c| c.name.as_str()).collect();
            format!("(calling {})", names.join(", "))
        }
        _ => message.content.clone(),
    }
}
