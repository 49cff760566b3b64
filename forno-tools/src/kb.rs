//! Knowledge-base search tool.
//!
//! Answers questions about hours, delivery, refunds, allergens, and other
//! store policies from the indexed knowledge base.

use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use forno_store::SqliteStore;
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

/// Knowledge-base search tool.
pub struct KbSearchTool {
    store: Arc<SqliteStore>,
}

impl KbSearchTool {
    /// Create a new knowledge-base search tool.
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for KbSearchTool {
    fn name(&self) -> &str {
        "search_kb"
    }

    fn description(&self) -> &str {
        "Search the store knowledge base for hours, delivery times, refund \
        policy, payment options, and allergen information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Question or keywords to look up"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Max results to return (default: 3)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' parameter"))?;

        #[allow(clippy::cast_possible_truncation)]
        let top_k = args
            .get("top_k")
            .and_then(serde_json::Value::as_u64)
            .map_or(3, |v| v as usize);

        let hits = self.store.search_kb(query, top_k).await?;

        let Some(top) = hits.first() else {
            return Ok(ToolResult::success(
                "I couldn't find specific information about that in our knowledge base. \
                Is there anything else I can help you with?",
            ));
        };

        let mut output = format!("📚 **{}**\n\n{}", top.category, top.body);
        if hits.len() > 1 {
            output.push_str("\n\n**Related Information:**");
            for hit in &hits[1..] {
                let _ = write!(output, "\n• {}", hit.title);
            }
        }

        Ok(ToolResult::success(output))
    }
}
