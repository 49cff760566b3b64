//! Pizza recommendation tool.
//!
//! Suggests pizzas from the user's order history when there is one, then
//! from a stated preference, then from the top of the menu.

use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use forno_store::{MenuItem, SqliteStore};
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

const MAX_SUGGESTIONS: usize = 3;

/// Recommendation tool.
pub struct RecommendTool {
    store: Arc<SqliteStore>,
}

impl RecommendTool {
    /// Create a new recommendation tool.
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    async fn from_favorites(&self, user_id: &str) -> anyhow::Result<Vec<(MenuItem, &'static str)>> {
        let Some(profile) = self.store.get_user(user_id).await? else {
            return Ok(Vec::new());
        };

        let mut picks = Vec::new();
        for favorite in profile.favorites.iter().take(MAX_SUGGESTIONS) {
            if let Some(item) = self.store.search_menu(favorite).await?.into_iter().next() {
                picks.push((item, "You've ordered this before!"));
            }
        }
        Ok(picks)
    }

    fn format(picks: &[(MenuItem, &str)]) -> String {
        let mut output = String::from("🎯 **Recommended Pizzas for You:**\n\n");
        for (idx, (item, reason)) in picks.iter().enumerate() {
            let _ = writeln!(output, "{}. **{}** - ${:.2}", idx + 1, item.name, item.price);
            let _ = writeln!(output, "   _{reason}_\n");
        }
        output.push_str("Would you like to order any of these?");
        output
    }
}

#[async_trait]
impl Tool for RecommendTool {
    fn name(&self) -> &str {
        "recommend_pizza"
    }

    fn description(&self) -> &str {
        "Recommend pizzas based on the user's past orders or a stated \
        preference like 'spicy' or 'vegetarian'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "preference": {
                    "type": "string",
                    "description": "Taste or diet preference to match, e.g. 'spicy', 'veg'"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let mut picks = match args.get("user_id").and_then(|v| v.as_str()) {
            Some(user_id) => self.from_favorites(user_id).await?,
            None => Vec::new(),
        };

        if picks.is_empty() {
            if let Some(preference) = args.get("preference").and_then(|v| v.as_str()) {
                picks = self
                    .store
                    .search_menu(preference)
                    .await?
                    .into_iter()
                    .take(MAX_SUGGESTIONS)
                    .map(|item| (item, "Matches your taste!"))
                    .collect();
            }
        }

        if picks.is_empty() {
            picks = self
                .store
                .all_menu_items(MAX_SUGGESTIONS)
                .await?
                .into_iter()
                .map(|item| (item, "A customer favorite!"))
                .collect();
        }

        if picks.is_empty() {
            return Ok(ToolResult::success(
                "I couldn't generate recommendations right now. \
                Would you like to browse our menu instead?",
            ));
        }

        Ok(ToolResult::success(Self::format(&picks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded_store() -> (TempDir, Arc<SqliteStore>) {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open(&tmp.path().join("forno.db")).unwrap());

        for (id, name, price, tags) in [
            ("p1", "Pepperoni", 12.5, vec!["bestseller"]),
            ("p2", "Peri Peri", 13.0, vec!["spicy"]),
            ("p3", "Margherita", 9.0, vec!["classic"]),
        ] {
            store
                .insert_menu_item(&MenuItem {
                    id: id.into(),
                    name: name.into(),
                    description: format!("{name} pizza"),
                    category: "pizza".into(),
                    price,
                    tags: tags.into_iter().map(String::from).collect(),
                    available: true,
                })
                .await
                .unwrap();
        }

        (tmp, store)
    }

    #[tokio::test]
    async fn prefers_order_history() {
        let (_tmp, store) = seeded_store().await;
        store
            .record_order_for_user("u1", &["Peri Peri".into()])
            .await
            .unwrap();

        let tool = RecommendTool::new(store);
        let result = tool.execute(json!({"user_id": "u1"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("Peri Peri"));
        assert!(result.output.contains("ordered this before"));
    }

    #[tokio::test]
    async fn matches_stated_preference() {
        let (_tmp, store) = seeded_store().await;
        let tool = RecommendTool::new(store);

        let result = tool.execute(json!({"preference": "spicy"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("Peri Peri"));
        assert!(result.output.contains("Matches your taste"));
    }

    #[tokio::test]
    async fn falls_back_to_menu_top() {
        let (_tmp, store) = seeded_store().await;
        let tool = RecommendTool::new(store);

        let result = tool.execute(json!({})).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("customer favorite"));
    }
}
