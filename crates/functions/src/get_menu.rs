//! `get-menu`: lists every dish with its price.

use async_trait::async_trait;
use parlance_core::error::FunctionError;
use parlance_core::function::{Function, FunctionResult, FunctionStore};
use serde_json::{Map, Value};

use crate::MENU;

pub struct GetMenuFunction;

#[async_trait]
impl Function for GetMenuFunction {
    fn name(&self) -> &str {
        "get-menu"
    }

    fn description(&self) -> &str {
        "Get the menu of the restaurant."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "required": [],
            "properties": {}
        })
    }

    async fn on_message(
        &self,
        _arguments: Map<String, Value>,
        _store: &FunctionStore,
    ) -> Result<FunctionResult, FunctionError> {
        let items: Vec<String> = MENU
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{}. {} (${:.2})", i + 1, d.name, d.price))
            .collect();

        Ok(FunctionResult::text(format!(
            "Here is our menu: {}",
            items.join(", ")
        )))
    }
}
