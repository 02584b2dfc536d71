//! Restaurant ordering functions for the Parlance demo harness.
//!
//! Three functions share one order kept in the [`FunctionStore`]:
//! - `get-menu` lists the dishes (its result is shown as-is)
//! - `add-dishes` adds or removes a dish (the model narrates the result)
//! - `complete-order` totals the order and writes its own closing messages

pub mod add_dishes;
pub mod complete_order;
pub mod get_menu;

use parlance_core::function::{Function, FunctionStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use add_dishes::AddDishesFunction;
pub use complete_order::CompleteOrderFunction;
pub use get_menu::GetMenuFunction;

/// Store key holding the current order as a JSON array of dish names.
pub const ORDER_KEY: &str = "order";

/// A dish on the menu.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dish {
    pub name: &'static str,
    pub price: f64,
}

pub const MENU: &[Dish] = &[
    Dish { name: "chicken rice", price: 8.5 },
    Dish { name: "beef noodles", price: 9.0 },
    Dish { name: "deck rice", price: 11.0 },
    Dish { name: "vegetable soup", price: 5.5 },
    Dish { name: "milk tea", price: 3.0 },
];

/// Find a dish by name, ignoring case and surrounding whitespace.
pub fn find_dish(name: &str) -> Option<&'static Dish> {
    let name = name.trim();
    MENU.iter().find(|d| d.name.eq_ignore_ascii_case(name))
}

/// The dishes currently in the order.
pub fn current_order(store: &FunctionStore) -> Vec<String> {
    store
        .get(ORDER_KEY)
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct Receipt {
    pub dishes: Vec<String>,
    pub total: f64,
}

impl Receipt {
    pub(crate) fn for_order(dishes: Vec<String>) -> Self {
        let total: f64 = dishes
            .iter()
            .filter_map(|d| find_dish(d))
            .map(|d| d.price)
            .sum();
        Self { dishes, total }
    }

    pub(crate) fn to_value(&self) -> Value {
        serde_json::json!({ "dishes": self.dishes, "total": self.total })
    }
}

/// All demo functions in registration order.
pub fn demo_functions() -> Vec<Box<dyn Function>> {
    vec![
        Box::new(GetMenuFunction),
        Box::new(AddDishesFunction),
        Box::new(CompleteOrderFunction),
    ]
}
