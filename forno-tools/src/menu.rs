//! Menu search tool.
//!
//! Lets the agent browse the menu or search it by keyword or category.

use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use forno_store::{MenuItem, SqliteStore};
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

const SHOWN_LIMIT: usize = 5;

/// Menu search tool.
pub struct MenuSearchTool {
    store: Arc<SqliteStore>,
}

impl MenuSearchTool {
    /// Create a new menu search tool.
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    fn format_items(items: &[MenuItem]) -> String {
        let mut output = format!("🍕 **Found {} pizza(s):**\n\n", items.len());

        for (idx, item) in items.iter().take(SHOWN_LIMIT).enumerate() {
            let description: String = item.description.chars().take(100).collect();
            let _ = writeln!(
                output,
                "{}. **{}** - ${:.2} ({})",
                idx + 1,
                item.name,
                item.price,
                item.category
            );
            let _ = writeln!(output, "   {description}\n");
        }

        if items.len() > SHOWN_LIMIT {
            let _ = write!(
                output,
                "...and {} more! Would you like to see more options?",
                items.len() - SHOWN_LIMIT
            );
        }

        output
    }
}

#[async_trait]
impl Tool for MenuSearchTool {
    fn name(&self) -> &str {
        "search_menu"
    }

    fn description(&self) -> &str {
        "Search the pizza menu by keyword or category, or browse the full menu. \
        Returns names, prices, and descriptions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keyword to search for (name, ingredient, tag). Omit to list the full menu"
                },
                "category": {
                    "type": "string",
                    "description": "Filter by category, e.g. 'veg' or 'non-veg'"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("");
        let category = args.get("category").and_then(|v| v.as_str());

        let items = if let Some(category) = category {
            self.store.menu_by_category(category).await?
        } else if !query.trim().is_empty() {
            self.store.search_menu(query).await?
        } else {
            self.store.all_menu_items(20).await?
        };

        if items.is_empty() {
            return Ok(ToolResult::success(
                "I couldn't find any pizzas matching that description. \
                Would you like to see our full menu or try a different search?",
            ));
        }

        Ok(ToolResult::success(Self::format_items(&items)))
    }
}
