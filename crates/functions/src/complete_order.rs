//! `complete-order`: totals the order and closes it.
//!
//! The tool message carries a JSON receipt. The closing words are written by
//! the function itself in `on_after_respond`, so the model is not asked to
//! interpret the receipt.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::Stream;
use futures::stream::BoxStream;
use parlance_core::error::FunctionError;
use parlance_core::function::{Function, FunctionResult, FunctionStore};
use serde_json::{Map, Value};
use tracing::info;

use crate::{ORDER_KEY, Receipt, current_order};

/// Store key for the receipt produced by the last completed order.
pub const RECEIPT_KEY: &str = "receipt";

pub struct CompleteOrderFunction;

#[async_trait]
impl Function for CompleteOrderFunction {
    fn name(&self) -> &str {
        "complete-order"
    }

    fn description(&self) -> &str {
        "Complete the order. Called when the user does not need anything else."
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
        store: &FunctionStore,
    ) -> Result<FunctionResult, FunctionError> {
        let receipt = Receipt::for_order(current_order(store)).to_value();
        store.insert(RECEIPT_KEY, receipt.clone());
        Ok(FunctionResult::json(receipt))
    }

    fn on_after_respond<'a>(
        &'a self,
        store: &'a FunctionStore,
    ) -> BoxStream<'a, Result<FunctionResult, FunctionError>> {
        Box::pin(closing_messages(store))
    }
}

fn closing_messages(
    store: &FunctionStore,
) -> impl Stream<Item = Result<FunctionResult, FunctionError>> + Send + '_ {
    try_stream! {
        let receipt = store
            .remove(RECEIPT_KEY)
            .map(serde_json::from_value::<Receipt>)
            .transpose()
            .map_err(|e| FunctionError::ExecutionFailed {
                function_name: "complete-order".into(),
                reason: format!("unreadable receipt: {e}"),
            })?
            .unwrap_or_else(|| Receipt::for_order(Vec::new()));

        if receipt.dishes.is_empty() {
            yield FunctionResult::text("Your order is empty, so there is nothing to complete.");
        } else {
            info!(items = receipt.dishes.len(), total = receipt.total, "Order completed");
            store.insert(ORDER_KEY, Value::Array(Vec::new()));

            yield FunctionResult::text(format!(
                "Thank you! Your order of {} comes to ${:.2}. It will be ready shortly.",
                receipt.dishes.join(", "),
                receipt.total
            ));
            yield FunctionResult::text("Order closed; a new order has been started.").excluded();
        }
    }
}
