//! Pending-order tracker: the staging area of the confirmation flow.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::OrderDraft;

/// At most one proposed order per user, held until the user confirms or
/// rejects it.
///
/// This layer does no validation - an empty-items draft is stored as-is.
/// The dispatcher checks the draft at confirmation time so the failure
/// surfaces where it can be turned into a reply (fail-fast, not fail-early).
#[derive(Debug, Default)]
pub struct PendingOrders {
    inner: RwLock<HashMap<String, OrderDraft>>,
}

impl PendingOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a draft for the user. Overwrites any existing draft - the last
    /// proposal wins, there is no merging.
    pub async fn set(&self, user_id: &str, draft: OrderDraft) {
        let mut inner = self.inner.write().await;
        if inner.insert(user_id.to_string(), draft).is_some() {
            tracing::debug!(user_id = %user_id, "Replaced pending order draft");
        }
    }

    /// Current draft for the user, if any.
    pub async fn get(&self, user_id: &str) -> Option<OrderDraft> {
        self.inner.read().await.get(user_id).cloned()
    }

    /// Remove and return the user's draft.
    pub async fn clear(&self, user_id: &str) -> Option<OrderDraft> {
        self.inner.write().await.remove(user_id)
    }

    /// Number of users with a staged draft.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
