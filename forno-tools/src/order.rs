//! Order backend.
//!
//! The one state-changing operation in the tool layer. It is a typed trait
//! rather than a [`Tool`] so the dispatcher can require an explicit user
//! confirmation before anything is committed, and so tests can swap in a
//! failing backend.

use async_trait::async_trait;
use chrono::Utc;
use forno_session::OrderDraft;
use forno_store::{OrderRecord, SqliteStore, TrackingEvent};
use rand::Rng;
use std::sync::Arc;

/// Receipt for a committed order.
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub order_id: String,
    pub total: f64,
}

/// Error from the order backend.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order has no items")]
    EmptyDraft,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Commits confirmed order drafts.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    /// Create an order from a confirmed draft. Returns the receipt on
    /// success; on failure nothing has been committed.
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, OrderError>;
}

/// Order backend writing to the Forno database.
pub struct SqliteOrderBackend {
    store: Arc<SqliteStore>,
}

impl SqliteOrderBackend {
    /// Create a new order backend.
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    fn new_order_id() -> String {
        let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
        format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), suffix)
    }
}

#[async_trait]
impl OrderBackend for SqliteOrderBackend {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, OrderError> {
        if draft.items.is_empty() {
            return Err(OrderError::EmptyDraft);
        }

        let total: f64 = draft
            .items
            .iter()
            .map(|item| item.unit_price * f64::from(item.qty))
            .sum();
        let total = (total * 100.0).round() / 100.0;

        let now = Utc::now();
        let order = OrderRecord {
            order_id: Self::new_order_id(),
            user_id: draft.user_id.clone(),
            items: draft.items.clone(),
            total,
            status: "created".to_string(),
            tracking: vec![TrackingEvent::now("created", Some("Order received".into()))],
            created_at: now,
            updated_at: now,
        };

        self.store.insert_order(&order).await?;

        // Profile bookkeeping is best effort; the order is already in.
        let item_names: Vec<String> = order.items.iter().map(|i| i.name.clone()).collect();
        if let Err(e) = self
            .store
            .record_order_for_user(&order.user_id, &item_names)
            .await
        {
            tracing::warn!(user_id = %order.user_id, "Failed to update user profile: {e}");
        }

        tracing::info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            total = order.total,
            "Order created"
        );

        Ok(OrderReceipt {
            order_id: order.order_id,
            total: order.total,
        })
    }
}
