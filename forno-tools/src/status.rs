//! Order status tool.
//!
//! Looks up an order by id, or lists the user's recent orders when no id
//! is given. The dispatcher injects `user_id` into the arguments.

use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use forno_store::{OrderRecord, SqliteStore};
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

const RECENT_ORDERS: usize = 3;

/// Order status tool.
pub struct OrderStatusTool {
    store: Arc<SqliteStore>,
}

impl OrderStatusTool {
    /// Create a new order status tool.
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    fn format_order(order: &OrderRecord) -> String {
        let mut output = format!(
            "📦 **Order Status**\n\nOrder ID: `{}`\nStatus: **{}**\nTotal: ${:.2}\n",
            order.order_id,
            order.status.to_uppercase(),
            order.total
        );

        if !order.tracking.is_empty() {
            output.push_str("\n**Timeline:**\n");
            for event in &order.tracking {
                let _ = writeln!(output, "• {}", capitalize(&event.status));
            }
        }

        output
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[async_trait]
impl Tool for OrderStatusTool {
    fn name(&self) -> &str {
        "order_status"
    }

    fn description(&self) -> &str {
        "Look up the status and tracking timeline of an order. Give an \
        order_id when the user mentions one; otherwise their recent orders \
        are shown."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "order_id": {
                    "type": "string",
                    "description": "Order id like ORD-20250115-1234. Omit to show the user's recent orders"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        if let Some(order_id) = args.get("order_id").and_then(|v| v.as_str()) {
            return match self.store.get_order(order_id).await? {
                Some(order) => Ok(ToolResult::success(Self::format_order(&order))),
                None => Ok(ToolResult::success(format!(
                    "❌ I couldn't find an order with ID `{order_id}`. \
                    Please double-check the ID."
                ))),
            };
        }

        let Some(user_id) = args.get("user_id").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::failure("Missing 'order_id' parameter"));
        };

        let orders = self.store.orders_for_user(user_id, RECENT_ORDERS).await?;
        if orders.is_empty() {
            return Ok(ToolResult::success(
                "You don't have any orders yet. Would you like to see our menu?",
            ));
        }

        let mut output = String::from("📦 **Your recent orders:**\n\n");
        for order in &orders {
            let _ = writeln!(
                output,
                "• `{}` - {} (${:.2})",
                order.order_id,
                capitalize(&order.status),
                order.total
            );
        }
        Ok(ToolResult::success(output))
    }
}
