//! `parlance ask`: one message, one turn.

use std::error::Error;

use parlance_config::AppConfig;
use serde_json::Value;

use super::{build_engine, describe};

pub async fn run(config: AppConfig, message: String) -> Result<(), Box<dyn Error>> {
    let engine = build_engine(&config).await?;

    eprint!("  Thinking...");
    let result = engine.generate(Some(Value::String(message)), Vec::new()).await;
    eprint!("\r              \r");

    let response = result?;
    for message in &response.new_responses {
        println!("{}", describe(message));
    }

    engine.close().await?;
    Ok(())
}
