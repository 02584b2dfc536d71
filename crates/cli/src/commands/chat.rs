//! `parlance chat`: interactive ordering session.

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use futures::StreamExt;
use parlance_config::AppConfig;
use parlance_core::message::Usage;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_engine, describe, history};

pub async fn run(
    config: AppConfig,
    history_path: Option<PathBuf>,
    fresh: bool,
) -> Result<(), Box<dyn Error>> {
    let engine = build_engine(&config).await?;
    let path = history_path.unwrap_or_else(|| config.history_file.clone());
    let mut conversation = if fresh {
        Vec::new()
    } else {
        history::load(&path)?
    };

    println!();
    println!("  Parlance: interactive ordering");
    println!();
    println!("  Endpoint:  {}", config.endpoint);
    println!("  Model:     {}", config.model.as_deref().unwrap_or("(deployment default)"));
    println!("  Functions: {}", engine.functions().names().join(", "));
    println!("  History:   {} ({} messages)", path.display(), conversation.len());
    println!();
    println!("  Type your message and press Enter. Type 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if line == "exit" {
            break;
        }

        let mut snapshots =
            engine.generate_stream(Some(Value::String(line.to_string())), conversation.clone());
        while let Some(snapshot) = snapshots.next().await {
            match snapshot {
                Ok(snapshot) => {
                    for message in &snapshot.new_responses {
                        for text in describe(message).lines() {
                            println!("  Assistant > {text}");
                        }
                    }
                    conversation = snapshot.full_history;
                    history::save(&path, &conversation)?;
                }
                Err(e) => {
                    eprintln!("  [Error] {e}");
                    break;
                }
            }
        }

        let usage = Usage::accumulate(&conversation);
        println!(
            "  Usage: {} prompt + {} completion = {} tokens",
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total()
        );
        println!();
        prompt()?;
    }

    engine.close().await?;
    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
