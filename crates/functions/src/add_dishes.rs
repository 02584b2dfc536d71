//! `add-dishes`: adds a dish to, or removes one from, the current order.
//!
//! The result is plain text meant for the model to paraphrase, so the
//! function is registered as model-interpreted.

use async_trait::async_trait;
use parlance_core::error::FunctionError;
use parlance_core::function::{Function, FunctionConfig, FunctionResult, FunctionStore};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{ORDER_KEY, current_order, find_dish};

pub struct AddDishesFunction;

impl AddDishesFunction {
    fn invalid(reason: impl Into<String>) -> FunctionError {
        FunctionError::InvalidArguments {
            function_name: "add-dishes".into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Function for AddDishesFunction {
    fn name(&self) -> &str {
        "add-dishes"
    }

    fn description(&self) -> &str {
        "Add a dish to or remove a dish from the order. Reports when the dish is not on the menu."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "required": ["operation", "dish"],
            "properties": {
                "operation": {
                    "type": "string",
                    "description": "Operation type, add or remove",
                    "enum": ["add", "remove"]
                },
                "dish": {
                    "type": "string",
                    "description": "Dish name."
                }
            }
        })
    }

    fn config(&self) -> FunctionConfig {
        FunctionConfig::interpreted()
    }

    async fn on_init(&self, store: &FunctionStore) -> Result<(), FunctionError> {
        if !store.contains_key(ORDER_KEY) {
            store.insert(ORDER_KEY, Value::Array(Vec::new()));
        }
        Ok(())
    }

    async fn on_message(
        &self,
        arguments: Map<String, Value>,
        store: &FunctionStore,
    ) -> Result<FunctionResult, FunctionError> {
        let dish_name = arguments
            .get("dish")
            .and_then(Value::as_str)
            .ok_or_else(|| Self::invalid("missing 'dish' argument"))?;
        let operation = arguments
            .get("operation")
            .and_then(Value::as_str)
            .unwrap_or("add");

        let Some(dish) = find_dish(dish_name) else {
            return Ok(FunctionResult::text(format!(
                "Dish {dish_name} was not found on the menu."
            )));
        };

        let mut order = current_order(store);
        let reply = match operation {
            "add" => {
                order.push(dish.name.to_string());
                format!("Dish {} was added to the order.", dish.name)
            }
            "remove" => match order.iter().position(|d| d == dish.name) {
                Some(index) => {
                    order.remove(index);
                    format!("Dish {} was removed from the order.", dish.name)
                }
                None => format!("Dish {} is not in the order.", dish.name),
            },
            other => return Err(Self::invalid(format!("unknown operation '{other}'"))),
        };

        debug!(operation, dish = dish.name, items = order.len(), "Order updated");
        store.insert(ORDER_KEY, serde_json::json!(order));
        Ok(FunctionResult::text(reply))
    }
}
